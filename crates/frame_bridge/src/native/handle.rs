//! Owning guards for native handles
//!
//! A [`RawHandle`] is just a token; these guards are what own the resource.
//! Neither guard is `Clone`, and both release their handle in `Drop`, so each
//! handle is released exactly once no matter which path the caller takes out.

use std::sync::Arc;

use super::{Channel, NativeError, NativeRenderer, RawHandle};
use crate::scene::SceneId;

/// Long-lived render context for one scene
///
/// Owned by the renderer cache. Rendering takes `&mut self`, so a single
/// handle can never be driven by two callers at once.
pub struct RendererHandle<E: NativeRenderer + ?Sized> {
    engine: Arc<E>,
    raw: RawHandle,
    scene: SceneId,
    frames_rendered: u64,
}

impl<E: NativeRenderer + ?Sized> RendererHandle<E> {
    /// Ask the engine for a new renderer
    pub fn create(engine: &Arc<E>, scene: SceneId) -> Result<Self, NativeError> {
        let raw = engine.create_renderer(scene)?;
        log::debug!("Created renderer {} for scene {}", raw, scene);
        Ok(Self {
            engine: Arc::clone(engine),
            raw,
            scene,
            frames_rendered: 0,
        })
    }

    /// Run one render pass
    ///
    /// The returned frame borrows this renderer and is released when dropped.
    pub fn render(&mut self) -> Result<FrameHandle<'_, E>, NativeError> {
        let frame = self.engine.render(self.raw)?;
        self.frames_rendered += 1;
        log::trace!(
            "Renderer {} produced frame {} (#{})",
            self.raw,
            frame,
            self.frames_rendered
        );
        Ok(FrameHandle::adopt(&*self.engine, frame))
    }

    /// Underlying token
    pub const fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Scene this renderer was created for
    pub const fn scene(&self) -> SceneId {
        self.scene
    }

    /// Number of successful render passes
    pub const fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl<E: NativeRenderer + ?Sized> Drop for RendererHandle<E> {
    fn drop(&mut self) {
        log::debug!(
            "Releasing renderer {} for scene {} after {} frame(s)",
            self.raw,
            self.scene,
            self.frames_rendered
        );
        self.engine.release(self.raw);
    }
}

/// One rendered frame, valid until dropped
pub struct FrameHandle<'e, E: NativeRenderer + ?Sized> {
    engine: &'e E,
    raw: RawHandle,
}

impl<'e, E: NativeRenderer + ?Sized> FrameHandle<'e, E> {
    /// Take ownership of a frame token returned by `engine`
    ///
    /// The token is released when the guard drops; do not release it by hand.
    pub const fn adopt(engine: &'e E, raw: RawHandle) -> Self {
        Self { engine, raw }
    }

    /// Underlying token
    pub const fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Width in pixels as reported by the engine
    pub fn width(&self) -> u32 {
        self.engine.frame_width(self.raw)
    }

    /// Height in pixels as reported by the engine
    pub fn height(&self) -> u32 {
        self.engine.frame_height(self.raw)
    }

    /// One channel of one pixel
    pub fn channel(&self, x: u32, y: u32, channel: Channel) -> Result<u8, NativeError> {
        self.engine.frame_channel(self.raw, x, y, channel)
    }

    /// Bulk copy into `dst`; `Ok(false)` if the engine cannot
    pub fn copy_into(&self, dst: &mut [u8]) -> Result<bool, NativeError> {
        self.engine.copy_frame(self.raw, dst)
    }
}

impl<E: NativeRenderer + ?Sized> Drop for FrameHandle<'_, E> {
    fn drop(&mut self) {
        log::trace!("Releasing frame {}", self.raw);
        self.engine.release(self.raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{StubEngine, StubFrame};

    fn scene(id: u64) -> SceneId {
        SceneId::new(id).unwrap()
    }

    #[test]
    fn test_renderer_released_on_drop() {
        let engine = Arc::new(StubEngine::new(StubFrame::solid(1, 1, [0, 0, 0, 255])));
        let renderer = RendererHandle::create(&engine, scene(2)).unwrap();
        assert_eq!(renderer.scene(), scene(2));
        assert_eq!(engine.live_handles(), 1);

        drop(renderer);
        assert_eq!(engine.live_handles(), 0);
        assert_eq!(engine.releases(), 1);
    }

    #[test]
    fn test_frame_released_on_drop() {
        let engine = Arc::new(StubEngine::new(StubFrame::solid(2, 3, [1, 2, 3, 4])));
        let mut renderer = RendererHandle::create(&engine, scene(0)).unwrap();

        {
            let frame = renderer.render().unwrap();
            assert_eq!(frame.width(), 2);
            assert_eq!(frame.height(), 3);
            assert_eq!(frame.channel(1, 2, Channel::Blue).unwrap(), 3);
            assert_eq!(engine.live_handles(), 2);
        }

        assert_eq!(engine.live_handles(), 1);
        assert_eq!(renderer.frames_rendered(), 1);
    }

    #[test]
    fn test_failed_render_does_not_count() {
        let engine = Arc::new(StubEngine::new(StubFrame::solid(1, 1, [0; 4])).failing_render());
        let mut renderer = RendererHandle::create(&engine, scene(1)).unwrap();

        assert!(renderer.render().is_err());
        assert_eq!(renderer.frames_rendered(), 0);
        assert_eq!(engine.live_handles(), 1);
    }
}
