use crate::infra::{AppState, ServiceLifecycle};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use hiring_pipeline::workflows::hiring::hiring_router;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_hiring_routes(lifecycle: Arc<ServiceLifecycle>) -> axum::Router {
    hiring_router(lifecycle)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::build_lifecycle;
    use axum::body::Body;
    use axum::http::Request;
    use hiring_pipeline::config::HiringConfig;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_hiring_routes(build_lifecycle(&HiringConfig::default())).layer(Extension(state))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn readiness_tracks_the_flag() {
        let initializing = app(false).oneshot(get("/ready")).await.expect("response");
        assert_eq!(initializing.status(), StatusCode::SERVICE_UNAVAILABLE);

        let ready = app(true).oneshot(get("/ready")).await.expect("response");
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn service_routes_share_the_router_with_hiring_endpoints() {
        let router = app(true);

        let health = router.clone().oneshot(get("/health")).await.expect("response");
        assert_eq!(health.status(), StatusCode::OK);

        let metrics = router.clone().oneshot(get("/metrics")).await.expect("response");
        assert_eq!(metrics.status(), StatusCode::OK);

        let steps = router.oneshot(get("/api/v1/steps")).await.expect("response");
        assert_eq!(steps.status(), StatusCode::OK);
    }
}
