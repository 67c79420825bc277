//! Scripted engine for tests and local experiments
//!
//! Every render returns the same [`StubFrame`]. The engine counts each native
//! call and tracks live handles, so callers can check the release contract,
//! and it can be told to fail at specific points.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Channel, HandleKind, NativeError, NativeRenderer, RawHandle};
use crate::scene::SceneId;

/// Pixel content returned by every [`StubEngine`] render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubFrame {
    width: u32,
    height: u32,
    /// Row-major RGBA8, empty when the reported size is bogus
    data: Vec<u8>,
}

impl StubFrame {
    /// Frame filled with one colour
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_fn(width, height, |_, _| rgba)
    }

    /// Frame whose pixel at `(x, y)` is `f(x, y)`
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Frame that reports the given size but holds no pixels
    ///
    /// Useful for exercising the dimension checks.
    pub const fn reporting(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: Vec::new(),
        }
    }

    fn value(&self, x: u32, y: u32, channel: Channel) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4 + channel.index() as usize;
        self.data.get(offset).copied()
    }
}

#[derive(Debug)]
enum Resource {
    Renderer(SceneId),
    Frame(Arc<StubFrame>),
}

/// Counting, failure-injecting [`NativeRenderer`]
#[derive(Debug)]
pub struct StubEngine {
    frame: Arc<StubFrame>,
    live: Mutex<HashMap<RawHandle, Resource>>,
    next_token: AtomicUsize,

    creates: AtomicUsize,
    renders: AtomicUsize,
    releases: AtomicUsize,
    invalid_releases: AtomicUsize,
    channel_queries: AtomicUsize,
    bulk_copies: AtomicUsize,
    created_scenes: Mutex<Vec<SceneId>>,

    fail_create: bool,
    fail_render: bool,
    fail_channel_at: Option<(u32, u32)>,
    bulk_access: bool,
    create_delay: Option<Duration>,
}

impl StubEngine {
    /// Engine that renders `frame` on every pass
    pub fn new(frame: StubFrame) -> Self {
        Self {
            frame: Arc::new(frame),
            live: Mutex::new(HashMap::new()),
            next_token: AtomicUsize::new(1),
            creates: AtomicUsize::new(0),
            renders: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            invalid_releases: AtomicUsize::new(0),
            channel_queries: AtomicUsize::new(0),
            bulk_copies: AtomicUsize::new(0),
            created_scenes: Mutex::new(Vec::new()),
            fail_create: false,
            fail_render: false,
            fail_channel_at: None,
            bulk_access: false,
            create_delay: None,
        }
    }

    /// Every `create_renderer` call fails
    #[must_use]
    pub const fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Every `render` call fails
    #[must_use]
    pub const fn failing_render(mut self) -> Self {
        self.fail_render = true;
        self
    }

    /// Channel queries for pixel `(x, y)` fail
    #[must_use]
    pub const fn failing_channel_at(mut self, x: u32, y: u32) -> Self {
        self.fail_channel_at = Some((x, y));
        self
    }

    /// Answer `copy_frame` instead of reporting it unsupported
    #[must_use]
    pub const fn with_bulk_access(mut self) -> Self {
        self.bulk_access = true;
        self
    }

    /// Sleep inside `create_renderer`, widening any check-then-create race
    #[must_use]
    pub const fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Number of `create_renderer` calls
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of `render` calls
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Number of successful releases
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Releases of handles that were not live (double or foreign releases)
    pub fn invalid_releases(&self) -> usize {
        self.invalid_releases.load(Ordering::SeqCst)
    }

    /// Number of `frame_channel` calls
    pub fn channel_queries(&self) -> usize {
        self.channel_queries.load(Ordering::SeqCst)
    }

    /// Number of answered `copy_frame` calls
    pub fn bulk_copies(&self) -> usize {
        self.bulk_copies.load(Ordering::SeqCst)
    }

    /// Handles handed out and not yet released
    pub fn live_handles(&self) -> usize {
        self.live.lock().len()
    }

    /// Scenes passed to `create_renderer`, in call order
    pub fn created_scenes(&self) -> Vec<SceneId> {
        self.created_scenes.lock().clone()
    }

    fn issue(&self, resource: Resource) -> RawHandle {
        let index = self.next_token.fetch_add(1, Ordering::SeqCst);
        let handle = RawHandle::new(NonZeroUsize::MIN.saturating_add(index << 4));
        self.live.lock().insert(handle, resource);
        handle
    }

    fn frame(&self, handle: RawHandle) -> Option<Arc<StubFrame>> {
        match self.live.lock().get(&handle) {
            Some(Resource::Frame(frame)) => Some(Arc::clone(frame)),
            _ => None,
        }
    }
}

impl NativeRenderer for StubEngine {
    fn create_renderer(&self, scene: SceneId) -> Result<RawHandle, NativeError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.created_scenes.lock().push(scene);
        if let Some(delay) = self.create_delay {
            std::thread::sleep(delay);
        }
        if self.fail_create {
            return Err(NativeError::CreateFailed {
                scene,
                reason: "stub configured to fail".to_string(),
            });
        }
        Ok(self.issue(Resource::Renderer(scene)))
    }

    fn render(&self, renderer: RawHandle) -> Result<RawHandle, NativeError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let scene = match self.live.lock().get(&renderer) {
            Some(Resource::Renderer(scene)) => *scene,
            _ => {
                return Err(NativeError::UnknownHandle {
                    kind: HandleKind::Renderer,
                    handle: renderer,
                })
            }
        };
        log::trace!("Stub engine rendering scene {}", scene);
        if self.fail_render {
            return Err(NativeError::RenderFailed("stub configured to fail".to_string()));
        }
        Ok(self.issue(Resource::Frame(Arc::clone(&self.frame))))
    }

    fn frame_width(&self, frame: RawHandle) -> u32 {
        self.frame(frame).map_or(0, |f| f.width)
    }

    fn frame_height(&self, frame: RawHandle) -> u32 {
        self.frame(frame).map_or(0, |f| f.height)
    }

    fn frame_channel(
        &self,
        frame: RawHandle,
        x: u32,
        y: u32,
        channel: Channel,
    ) -> Result<u8, NativeError> {
        self.channel_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_channel_at == Some((x, y)) {
            return Err(NativeError::ChannelQuery {
                x,
                y,
                channel,
                reason: "stub configured to fail".to_string(),
            });
        }
        let pixels = self.frame(frame).ok_or(NativeError::UnknownHandle {
            kind: HandleKind::Frame,
            handle: frame,
        })?;
        pixels.value(x, y, channel).ok_or_else(|| NativeError::ChannelQuery {
            x,
            y,
            channel,
            reason: "coordinate outside frame".to_string(),
        })
    }

    fn copy_frame(&self, frame: RawHandle, dst: &mut [u8]) -> Result<bool, NativeError> {
        if !self.bulk_access {
            return Ok(false);
        }
        let pixels = self.frame(frame).ok_or(NativeError::UnknownHandle {
            kind: HandleKind::Frame,
            handle: frame,
        })?;
        if pixels.data.len() != dst.len() {
            return Err(NativeError::RenderFailed(format!(
                "bulk copy of {} bytes into {} byte buffer",
                pixels.data.len(),
                dst.len()
            )));
        }
        dst.copy_from_slice(&pixels.data);
        self.bulk_copies.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn release(&self, handle: RawHandle) {
        if self.live.lock().remove(&handle).is_some() {
            self.releases.fetch_add(1, Ordering::SeqCst);
        } else {
            log::warn!("Stub engine asked to release unknown handle {}", handle);
            self.invalid_releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}
