//! HTTP surface of the scoring service

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};
pub use handlers::AppState;

use crate::config::ServerConfig;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the router with all routes
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/api/risk/score/:address", get(handlers::risk_score))
        .route("/api/anomaly/detect", post(handlers::detect_anomaly))
        .route("/api/user/risk", post(handlers::user_risk))
        .route("/api/transactions/observe", post(handlers::observe_transactions))
        .route("/api/features/basic", post(handlers::basic_features))
        .route("/api/features/temporal", post(handlers::temporal_features))
        .route("/api/features/network", post(handlers::network_features))
        .route("/api/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http());

    let router = if server.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::metrics::ServiceMetrics;
    use crate::scoring::{RiskScoreStore, ScoringService};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let mut config = AppConfig::default();
        config.scoring.seed = Some(7);
        let store = Arc::new(RiskScoreStore::new(&config.scoring));
        let service = ScoringService::new(&config, store, None, Arc::new(ServiceMetrics::new())).unwrap();
        create_router(Arc::new(service), &config.server)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_home_and_health() {
        let (status, body) = send(app(), get_request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["models_loaded"]["anomaly_detector"], false);
        assert_eq!(body["mock_mode"], true);

        let (status, body) = send(app(), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_risk_score_known_protocol() {
        let (status, body) = send(
            app(),
            get_request("/api/risk/score/0x7FC66500C84A76AD7E9C93437BFC5AC33E2DDAE9"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], "0x7fc66500c84a76ad7e9c93437bfc5ac33e2ddae9");
        assert_eq!(body["risk_score"], 25);
        assert_eq!(body["confidence"], 0.85);
    }

    #[tokio::test]
    async fn test_detect_requires_address() {
        let (status, body) = send(app(), post_json("/api/anomaly/detect", json!({"features": {}}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Protocol address is required");
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn test_detect_returns_report() {
        let (status, body) = send(app(), post_json("/api/anomaly/detect", json!({"address": "0xabc"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], "0xabc");
        assert_eq!(body["source"], "mock");
        assert!(body["anomaly_detected"].is_boolean());
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/user/risk")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();

        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request format");
    }

    #[tokio::test]
    async fn test_user_risk() {
        let (status, body) = send(
            app(),
            post_json(
                "/api/user/risk",
                json!({
                    "user_address": "0xuser",
                    "exposures": [
                        {"protocol_address": "0x6b175474e89094c44da98b954eedeac495271d0f", "amount": 100},
                        {"protocol_address": "0x514910771af9ca656af840dff83e8264ecf986ca", "amount": 100}
                    ]
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["risk_score"], 46.0);
        assert_eq!(body["exposure_count"], 2);
        assert_eq!(body["high_risk_exposure_count"], 1);

        let (status, body) = send(app(), post_json("/api/user/risk", json!({"exposures": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User address is required");
    }

    #[tokio::test]
    async fn test_feature_endpoints() {
        let batch = json!({
            "transactions": [
                {"from": "0xa", "to": "0xb", "value": 1, "gasPrice": 10, "gasUsed": 21000, "timestamp": 0},
                {"from": "0xa", "to": "0xc", "value": 3, "gasPrice": 20, "gasUsed": 21000, "timestamp": 3600}
            ]
        });

        let (status, body) = send(app(), post_json("/api/features/temporal", batch.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["address"], "0xa");
        assert_eq!(body[0]["mean_value"], 2.0);

        let (status, body) = send(app(), post_json("/api/features/network", batch.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["out_degree"], 2);

        let (status, body) = send(app(), post_json("/api/transactions/observe", batch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["observed"], 2);
        assert_eq!(body["tracked_addresses"], 3);
    }

    #[tokio::test]
    async fn test_basic_features_missing_field() {
        let (status, body) = send(
            app(),
            post_json("/api/features/basic", json!({"from": "0xa", "to": "0xb", "value": 1})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("gasPrice"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = app();
        send(app.clone(), get_request("/api/risk/score/0xabc")).await;
        let (status, body) = send(app, get_request("/api/metrics")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["risk_lookups"], 1);
    }
}
