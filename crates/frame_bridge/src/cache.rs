//! Renderer cache
//!
//! One slot per scene id, each behind its own lock. The first request for a
//! scene creates its renderer while holding that slot's lock, so concurrent
//! first requests cannot both create one. The lock stays held for as long as
//! the caller keeps the returned lease, which serializes all use of a single
//! renderer while leaving other scenes free to render in parallel.
//!
//! Renderers are never evicted. [`RendererCache::shutdown`] releases them all
//! and closes the cache; dropping the cache does the same.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::{BridgeError, BridgeResult};
use crate::native::{NativeRenderer, RendererHandle};
use crate::scene::{SceneId, CACHE_CAPACITY};

/// Exclusive access to one cached renderer
///
/// Other requests for the same scene wait until the lease is dropped.
pub type RendererLease<'a, E> = MappedMutexGuard<'a, RendererHandle<E>>;

type Slot<E> = Mutex<Option<RendererHandle<E>>>;

/// Fixed table of lazily created renderers, one per scene id
pub struct RendererCache<E: NativeRenderer + ?Sized> {
    engine: Arc<E>,
    slots: [Slot<E>; CACHE_CAPACITY],
    closed: AtomicBool,
}

impl<E: NativeRenderer + ?Sized> RendererCache<E> {
    /// Empty cache over `engine`
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            slots: std::array::from_fn(|_| Mutex::new(None)),
            closed: AtomicBool::new(false),
        }
    }

    /// Engine behind this cache
    pub const fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Renderer for `scene`, created on first use
    ///
    /// Creation happens at most once per scene for the life of the cache. A
    /// failed creation leaves the slot empty so a later request may retry.
    pub fn get_or_create(&self, scene: SceneId) -> BridgeResult<RendererLease<'_, E>> {
        let mut slot = self.slots[scene.index()].lock();

        // Checked under the slot lock: shutdown empties each slot while holding
        // it, so nothing can be created behind its back
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ShutDown);
        }

        if slot.is_none() {
            let renderer = RendererHandle::create(&self.engine, scene)?;
            log::info!("Cached renderer {} for scene {}", renderer.raw(), scene);
            *slot = Some(renderer);
        }

        MutexGuard::try_map(slot, Option::as_mut).map_err(|_| BridgeError::ShutDown)
    }

    /// Whether `scene` already has a renderer
    pub fn is_cached(&self, scene: SceneId) -> bool {
        self.slots[scene.index()].lock().is_some()
    }

    /// Number of renderers currently held
    pub fn cached_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.lock().is_some()).count()
    }

    /// Whether [`shutdown`](Self::shutdown) has run
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Release every cached renderer and refuse further requests
    ///
    /// Waits for in-flight leases on each slot before releasing it. Safe to
    /// call more than once; later calls find nothing to release. Returns the
    /// number of renderers released by this call.
    pub fn shutdown(&self) -> usize {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            log::info!("Shutting down renderer cache");
        }

        let mut released = 0;
        for slot in &self.slots {
            let renderer = slot.lock().take();
            if let Some(renderer) = renderer {
                drop(renderer);
                released += 1;
            }
        }

        if first || released > 0 {
            log::info!("Renderer cache released {} renderer(s)", released);
        }
        released
    }
}

impl<E: NativeRenderer + ?Sized> Drop for RendererCache<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{StubEngine, StubFrame};
    use std::time::Duration;

    fn stub() -> Arc<StubEngine> {
        Arc::new(StubEngine::new(StubFrame::solid(2, 2, [255, 0, 0, 255])))
    }

    fn scene(id: u64) -> SceneId {
        SceneId::new(id).unwrap()
    }

    #[test]
    fn test_renderer_created_once_per_scene() {
        let engine = stub();
        let cache = RendererCache::new(Arc::clone(&engine));

        let first = cache.get_or_create(scene(3)).unwrap().raw();
        for _ in 0..5 {
            assert_eq!(cache.get_or_create(scene(3)).unwrap().raw(), first);
        }

        assert_eq!(engine.creates(), 1);
        assert!(cache.is_cached(scene(3)));
        assert!(!cache.is_cached(scene(4)));
    }

    #[test]
    fn test_scenes_get_distinct_renderers() {
        let engine = stub();
        let cache = RendererCache::new(Arc::clone(&engine));

        let a = cache.get_or_create(scene(0)).unwrap().raw();
        let b = cache.get_or_create(scene(9)).unwrap().raw();
        assert_ne!(a, b);
        assert_eq!(cache.cached_count(), 2);
        assert_eq!(engine.created_scenes(), vec![scene(0), scene(9)]);
    }

    #[test]
    fn test_failed_create_leaves_slot_empty() {
        let engine = Arc::new(StubEngine::new(StubFrame::solid(1, 1, [0; 4])).failing_create());
        let cache = RendererCache::new(Arc::clone(&engine));

        assert!(matches!(cache.get_or_create(scene(1)), Err(BridgeError::Native(_))));
        assert!(!cache.is_cached(scene(1)));
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let engine = stub();
        let cache = RendererCache::new(Arc::clone(&engine));
        for id in [0, 4, 7] {
            cache.get_or_create(scene(id)).unwrap();
        }

        assert_eq!(cache.shutdown(), 3);
        assert_eq!(cache.shutdown(), 0);
        assert_eq!(engine.releases(), 3);
        assert_eq!(engine.invalid_releases(), 0);
        assert_eq!(cache.cached_count(), 0);
        assert!(cache.is_shut_down());
    }

    #[test]
    fn test_no_creation_after_shutdown() {
        let engine = stub();
        let cache = RendererCache::new(Arc::clone(&engine));
        cache.shutdown();

        assert!(matches!(cache.get_or_create(scene(2)), Err(BridgeError::ShutDown)));
        assert_eq!(engine.creates(), 0);
    }

    #[test]
    fn test_drop_releases_renderers() {
        let engine = stub();
        {
            let cache = RendererCache::new(Arc::clone(&engine));
            cache.get_or_create(scene(5)).unwrap();
            cache.get_or_create(scene(6)).unwrap();
        }
        assert_eq!(engine.live_handles(), 0);
        assert_eq!(engine.releases(), 2);
    }

    #[test]
    fn test_concurrent_first_requests_create_once() {
        let engine = Arc::new(
            StubEngine::new(StubFrame::solid(1, 1, [0; 4])).with_create_delay(Duration::from_millis(20)),
        );
        let cache = RendererCache::new(Arc::clone(&engine));

        let cache = &cache;
        let handles: Vec<_> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| s.spawn(move || cache.get_or_create(scene(8)).map(|lease| lease.raw())))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap().unwrap()).collect()
        });

        assert_eq!(engine.creates(), 1);
        assert!(handles.iter().all(|&h| h == handles[0]));
    }

    #[test]
    fn test_shutdown_waits_for_lease() {
        let engine = stub();
        let cache = RendererCache::new(Arc::clone(&engine));

        std::thread::scope(|s| {
            let mut lease = cache.get_or_create(scene(2)).unwrap();
            let shutdown = s.spawn(|| cache.shutdown());

            // Renderer stays usable while the lease is held
            std::thread::sleep(Duration::from_millis(20));
            drop(lease.render().unwrap());
            assert_eq!(engine.releases(), 1);
            drop(lease);

            assert_eq!(shutdown.join().unwrap(), 1);
        });
        assert_eq!(engine.live_handles(), 0);
    }
}
