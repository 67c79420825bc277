//! In-process procedural engine
//!
//! Stands in for the native library when it is not linked. Scenes are simple
//! analytic images (sky gradient, shaded spheres) so the server produces
//! recognisable output without any external dependency.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{Channel, HandleKind, NativeError, NativeRenderer, RawHandle};
use crate::scene::SceneId;

/// Default output width, matching the native library
pub const DEFAULT_WIDTH: u32 = 200;
/// Default output height, matching the native library
pub const DEFAULT_HEIGHT: u32 = 133;

const SKY_TOP: [f32; 3] = [0.5, 0.7, 1.0];
const SKY_BOTTOM: [f32; 3] = [1.0, 1.0, 1.0];

/// What a scene id draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// Vertical sky gradient only
    Sky,
    /// One sphere shaded by its surface normal
    NormalSphere,
    /// A red and a green sphere, flat colour
    TwoSpheres,
}

impl Layout {
    const fn for_scene(scene: SceneId) -> Self {
        match scene.get() {
            0 => Self::Sky,
            2 => Self::TwoSpheres,
            _ => Self::NormalSphere,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Canvas {
    scene: SceneId,
    layout: Layout,
    width: u32,
    height: u32,
}

impl Canvas {
    fn draw(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                let [r, g, b] = self.shade(x, y);
                data.extend_from_slice(&[to_byte(r), to_byte(g), to_byte(b), 255]);
            }
        }
        data
    }

    fn shade(&self, x: u32, y: u32) -> [f32; 3] {
        let w = self.width as f32;
        let h = self.height as f32;
        let px = x as f32 + 0.5;
        let py = y as f32 + 0.5;

        match self.layout {
            Layout::Sky => sky(py / h),
            Layout::NormalSphere => {
                let radius = h * 0.35;
                sphere_normal(px, py, w * 0.5, h * 0.5, radius)
                    .map_or_else(|| sky(py / h), |n| [0.5 * (n[0] + 1.0), 0.5 * (n[1] + 1.0), 0.5 * (n[2] + 1.0)])
            }
            Layout::TwoSpheres => {
                let radius = h * 0.25;
                if sphere_normal(px, py, w * 0.35, h * 0.5, radius).is_some() {
                    [1.0, 0.0, 0.0]
                } else if sphere_normal(px, py, w * 0.72, h * 0.4, radius * 0.6).is_some() {
                    [0.0, 0.5, 0.0]
                } else {
                    sky(py / h)
                }
            }
        }
    }
}

fn sky(t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        SKY_TOP[0] * (1.0 - t) + SKY_BOTTOM[0] * t,
        SKY_TOP[1] * (1.0 - t) + SKY_BOTTOM[1] * t,
        SKY_TOP[2] * (1.0 - t) + SKY_BOTTOM[2] * t,
    ]
}

/// Unit normal of a screen-space sphere at `(px, py)`, if the pixel hits it
fn sphere_normal(px: f32, py: f32, cx: f32, cy: f32, radius: f32) -> Option<[f32; 3]> {
    let nx = (px - cx) / radius;
    let ny = (cy - py) / radius;
    let d2 = nx.mul_add(nx, ny * ny);
    (d2 <= 1.0).then(|| [nx, ny, (1.0 - d2).sqrt()])
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.99) as u8
}

#[derive(Debug)]
enum Resource {
    Renderer(Canvas),
    Frame { width: u32, height: u32, data: Vec<u8> },
}

/// Procedural [`NativeRenderer`] that runs inside the process
#[derive(Debug)]
pub struct SoftwareEngine {
    width: u32,
    height: u32,
    resources: Mutex<HashMap<RawHandle, Resource>>,
    next_token: AtomicUsize,
}

impl SoftwareEngine {
    /// Engine producing frames of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            resources: Mutex::new(HashMap::new()),
            next_token: AtomicUsize::new(1),
        }
    }

    /// Number of renderers and frames not yet released
    pub fn live_resources(&self) -> usize {
        self.resources.lock().len()
    }

    fn insert(&self, resource: Resource) -> RawHandle {
        let index = self.next_token.fetch_add(1, Ordering::Relaxed);
        let handle = RawHandle::new(NonZeroUsize::MIN.saturating_add(index << 4));
        self.resources.lock().insert(handle, resource);
        handle
    }

    fn with_frame<T>(&self, frame: RawHandle, f: impl FnOnce(u32, u32, &[u8]) -> T) -> Option<T> {
        match self.resources.lock().get(&frame) {
            Some(Resource::Frame { width, height, data }) => Some(f(*width, *height, data)),
            _ => None,
        }
    }

    const fn unknown_frame(frame: RawHandle) -> NativeError {
        NativeError::UnknownHandle {
            kind: HandleKind::Frame,
            handle: frame,
        }
    }
}

impl Default for SoftwareEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl NativeRenderer for SoftwareEngine {
    fn create_renderer(&self, scene: SceneId) -> Result<RawHandle, NativeError> {
        let canvas = Canvas {
            scene,
            layout: Layout::for_scene(scene),
            width: self.width,
            height: self.height,
        };
        log::debug!(
            "Software engine building {:?} canvas {}x{} for scene {}",
            canvas.layout,
            canvas.width,
            canvas.height,
            scene
        );
        Ok(self.insert(Resource::Renderer(canvas)))
    }

    fn render(&self, renderer: RawHandle) -> Result<RawHandle, NativeError> {
        // Draw outside the table lock so other scenes are not blocked
        let canvas = {
            let resources = self.resources.lock();
            match resources.get(&renderer) {
                Some(Resource::Renderer(canvas)) => *canvas,
                _ => {
                    return Err(NativeError::UnknownHandle {
                        kind: HandleKind::Renderer,
                        handle: renderer,
                    })
                }
            }
        };
        log::trace!("Software engine rendering scene {}", canvas.scene);
        let data = canvas.draw();
        Ok(self.insert(Resource::Frame {
            width: canvas.width,
            height: canvas.height,
            data,
        }))
    }

    fn frame_width(&self, frame: RawHandle) -> u32 {
        self.with_frame(frame, |w, _, _| w).unwrap_or(0)
    }

    fn frame_height(&self, frame: RawHandle) -> u32 {
        self.with_frame(frame, |_, h, _| h).unwrap_or(0)
    }

    fn frame_channel(
        &self,
        frame: RawHandle,
        x: u32,
        y: u32,
        channel: Channel,
    ) -> Result<u8, NativeError> {
        self.with_frame(frame, |width, height, data| {
            if x >= width || y >= height {
                return None;
            }
            let offset = (y as usize * width as usize + x as usize) * 4 + channel.index() as usize;
            data.get(offset).copied()
        })
        .ok_or_else(|| Self::unknown_frame(frame))?
        .ok_or_else(|| NativeError::ChannelQuery {
            x,
            y,
            channel,
            reason: "coordinate outside frame".to_string(),
        })
    }

    fn copy_frame(&self, frame: RawHandle, dst: &mut [u8]) -> Result<bool, NativeError> {
        self.with_frame(frame, |_, _, data| {
            if data.len() == dst.len() {
                dst.copy_from_slice(data);
                Ok(true)
            } else {
                Err(NativeError::RenderFailed(format!(
                    "bulk copy of {} bytes into {} byte buffer",
                    data.len(),
                    dst.len()
                )))
            }
        })
        .ok_or_else(|| Self::unknown_frame(frame))?
    }

    fn release(&self, handle: RawHandle) {
        if self.resources.lock().remove(&handle).is_none() {
            log::warn!("Software engine asked to release unknown handle {}", handle);
        }
    }
}
