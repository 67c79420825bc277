//! HTTP routes
//!
//! `GET /api/v1/render?sceneId=<n>` and `GET /api/health`. Rendering blocks on
//! native calls, so it runs on actix's blocking pool.

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use frame_bridge::endpoint::TEXT_CONTENT_TYPE;
use frame_bridge::{NativeRenderer, RenderEndpoint, RenderQuery, RenderResponse};

/// Register all routes for an endpoint over engine `E`
///
/// The app must carry `web::Data<RenderEndpoint<E>>`.
pub fn configure<E: NativeRenderer + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .route("/v1/render", web::get().to(render::<E>)),
    );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().content_type(TEXT_CONTENT_TYPE).body("Ok")
}

async fn render<E: NativeRenderer + 'static>(
    endpoint: web::Data<RenderEndpoint<E>>,
    req: HttpRequest,
) -> actix_web::Result<HttpResponse> {
    // Unparseable query strings are treated like a missing sceneId
    let query = web::Query::<RenderQuery>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_default();

    let response = web::block(move || endpoint.handle(&query)).await?;
    Ok(into_http(response))
}

fn into_http(response: RenderResponse) -> HttpResponse {
    let status =
        StatusCode::from_u16(response.status.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status)
        .content_type(response.content_type)
        .body(response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header;
    use actix_web::{test, App};
    use frame_bridge::native::{StubEngine, StubFrame};
    use frame_bridge::RenderConfig;
    use std::sync::Arc;

    fn red_engine() -> Arc<StubEngine> {
        Arc::new(StubEngine::new(StubFrame::solid(2, 2, [255, 0, 0, 255])))
    }

    async fn get(
        endpoint: &web::Data<RenderEndpoint<StubEngine>>,
        uri: &str,
    ) -> actix_web::dev::ServiceResponse {
        let app = test::init_service(
            App::new()
                .app_data(endpoint.clone())
                .configure(configure::<StubEngine>),
        )
        .await;
        test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await
    }

    fn data(engine: &Arc<StubEngine>) -> web::Data<RenderEndpoint<StubEngine>> {
        web::Data::new(RenderEndpoint::new(Arc::clone(engine), &RenderConfig::default()))
    }

    #[actix_web::test]
    async fn test_render_returns_png() {
        let engine = red_engine();
        let endpoint = data(&engine);

        let resp = get(&endpoint, "/api/v1/render?sceneId=3").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");

        let body = test::read_body(resp).await;
        let image = image::load_from_memory(&body).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (2, 2));
        assert!(image.pixels().all(|p| p.0 == [255, 0, 0, 255]));
        assert_eq!(engine.creates(), 1);
    }

    #[actix_web::test]
    async fn test_missing_scene_id() {
        let engine = red_engine();
        let endpoint = data(&engine);

        assert_eq!(get(&endpoint, "/api/v1/render").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            get(&endpoint, "/api/v1/render?sceneId=three").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(engine.creates(), 0);
    }

    #[actix_web::test]
    async fn test_out_of_range_scene() {
        let engine = red_engine();
        let endpoint = data(&engine);

        let resp = get(&endpoint, "/api/v1/render?sceneId=10").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(engine.creates(), 0);
    }

    #[actix_web::test]
    async fn test_render_failure() {
        let engine = Arc::new(StubEngine::new(StubFrame::solid(1, 1, [0; 4])).failing_render());
        let endpoint = data(&engine);

        let resp = get(&endpoint, "/api/v1/render?sceneId=1").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_after_shutdown() {
        let engine = red_engine();
        let endpoint = data(&engine);
        endpoint.shutdown();

        let resp = get(&endpoint, "/api/v1/render?sceneId=1").await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(engine.creates(), 0);
    }

    #[actix_web::test]
    async fn test_health() {
        let endpoint = data(&red_engine());
        let resp = get(&endpoint, "/api/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(&test::read_body(resp).await[..], b"Ok");
    }
}
