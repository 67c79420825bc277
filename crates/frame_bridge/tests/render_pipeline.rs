//! End-to-end tests of the render path against the scripted and software engines
//!
//! Every test ends by checking that each handle the engine handed out was
//! released exactly once.

use std::sync::Arc;
use std::time::Duration;

use frame_bridge::native::{SoftwareEngine, StubEngine, StubFrame};
use frame_bridge::{
    RenderConfig, RenderEndpoint, RenderQuery, RenderStatus, SceneId, TransferStrategy,
    CACHE_CAPACITY,
};

fn stub_endpoint(engine: &Arc<StubEngine>) -> RenderEndpoint<StubEngine> {
    RenderEndpoint::new(Arc::clone(engine), &RenderConfig::default())
}

fn assert_balanced(engine: &StubEngine) {
    assert_eq!(engine.live_handles(), 0, "handles still live");
    assert_eq!(engine.invalid_releases(), 0, "double or foreign release");
    assert_eq!(engine.releases(), engine.creates() + engine.renders());
}

#[test]
fn test_every_scene_once_then_shutdown() {
    let engine = Arc::new(StubEngine::new(StubFrame::solid(3, 3, [0, 128, 255, 255])));
    let endpoint = stub_endpoint(&engine);

    for round in 0..3 {
        for scene in SceneId::all() {
            let response = endpoint.handle(&RenderQuery::with_scene(scene.to_string()));
            assert!(response.is_success(), "round {round} scene {scene}");
        }
    }

    assert_eq!(engine.creates(), CACHE_CAPACITY);
    assert_eq!(engine.renders(), CACHE_CAPACITY * 3);
    assert_eq!(endpoint.cache().cached_count(), CACHE_CAPACITY);

    assert_eq!(endpoint.shutdown(), CACHE_CAPACITY);
    assert_eq!(endpoint.shutdown(), 0);
    assert_balanced(&engine);
}

#[test]
fn test_invalid_ids_never_reach_engine() {
    let engine = Arc::new(StubEngine::new(StubFrame::solid(1, 1, [0; 4])));
    let endpoint = stub_endpoint(&engine);

    let cases = [
        (None, 404),
        (Some("x"), 404),
        (Some("-3"), 404),
        (Some("10"), 400),
        (Some("4294967306"), 400),
    ];
    for (raw, code) in cases {
        let query = RenderQuery {
            scene_id: raw.map(str::to_string),
        };
        assert_eq!(endpoint.handle(&query).status.code(), code, "{raw:?}");
    }

    assert_eq!(engine.creates(), 0);
    assert_eq!(engine.renders(), 0);
}

#[test]
fn test_failures_do_not_leak() {
    let engine = Arc::new(StubEngine::new(StubFrame::solid(4, 4, [9; 4])).failing_channel_at(3, 3));
    let endpoint = stub_endpoint(&engine);

    for scene in ["0", "1", "0", "2"] {
        let response = endpoint.handle(&RenderQuery::with_scene(scene));
        assert_eq!(response.status, RenderStatus::InternalError);
    }
    assert_eq!(engine.creates(), 3);
    assert_eq!(engine.renders(), 4);

    endpoint.shutdown();
    assert_balanced(&engine);
}

#[test]
fn test_concurrent_requests_share_one_renderer() {
    let engine = Arc::new(
        StubEngine::new(StubFrame::solid(2, 2, [255, 0, 0, 255]))
            .with_create_delay(Duration::from_millis(25)),
    );
    let endpoint = stub_endpoint(&engine);
    let endpoint = &endpoint;

    let statuses: Vec<RenderStatus> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..16)
            .map(|_| s.spawn(move || endpoint.handle(&RenderQuery::with_scene("7")).status))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert!(statuses.iter().all(|s| *s == RenderStatus::Ok));
    assert_eq!(engine.creates(), 1);
    assert_eq!(engine.renders(), 16);

    endpoint.shutdown();
    assert_balanced(&engine);
}

#[test]
fn test_concurrent_scenes_and_shutdown() {
    let engine = Arc::new(StubEngine::new(StubFrame::solid(8, 8, [1, 2, 3, 4])));
    let endpoint = stub_endpoint(&engine);
    let endpoint = &endpoint;

    std::thread::scope(|s| {
        for worker in 0..CACHE_CAPACITY {
            s.spawn(move || {
                for _ in 0..20 {
                    let status = endpoint.handle(&RenderQuery::with_scene(worker.to_string())).status;
                    assert!(matches!(status, RenderStatus::Ok | RenderStatus::ServiceUnavailable));
                }
            });
        }
        s.spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            endpoint.shutdown();
        });
    });

    // Nothing may be created once shutdown has run
    assert!(endpoint.cache().is_shut_down());
    assert_eq!(endpoint.shutdown(), 0);
    assert_balanced(&engine);
}

#[test]
fn test_software_engine_transfers_agree() {
    let per_channel = RenderEndpoint::new(Arc::new(SoftwareEngine::new(32, 21)), &RenderConfig::default());
    let bulk_config = RenderConfig {
        transfer: TransferStrategy::PreferBulk,
        ..RenderConfig::default()
    };
    let bulk_engine = Arc::new(SoftwareEngine::new(32, 21));
    let bulk = RenderEndpoint::new(Arc::clone(&bulk_engine), &bulk_config);

    for scene in SceneId::all() {
        let a = per_channel.render_scene(scene).unwrap();
        let b = bulk.render_scene(scene).unwrap();
        let a = image::load_from_memory(&a).unwrap().to_rgba8();
        let b = image::load_from_memory(&b).unwrap().to_rgba8();
        assert_eq!(a.dimensions(), (32, 21));
        assert_eq!(a, b, "scene {scene}");
    }

    bulk.shutdown();
    assert_eq!(bulk_engine.live_resources(), 0);
}
