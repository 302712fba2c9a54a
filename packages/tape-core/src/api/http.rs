//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to services for business logic.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::error::RelayResult;
use crate::protocol_constants::SERVICE_ID;

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .route("/api/timeline", get(get_timeline))
        .route("/api/state", get(get_state))
        .route("/api/refresh", post(handle_refresh))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": SERVICE_ID }))
}

async fn get_timeline(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.timeline.snapshot().summary())
}

async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    let timeline = state.timeline.snapshot();
    Json(json!({
        "albums": timeline.len(),
        "photos": timeline.photo_count(),
        "refreshing": state.timeline.is_refreshing(),
        "sessions": {
            "open": state.hub.open_count(),
            "connecting": state.hub.connecting_count(),
        },
        "lastSentHash": state.bridge.last_sent_hash(),
    }))
}

/// Starts a background timeline rebuild.
async fn handle_refresh(State(state): State<AppState>) -> RelayResult<impl IntoResponse> {
    state.timeline.spawn_refresh(&state.spawner)?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "started": true }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::api::BroadcastHub;
    use crate::bus::{BusResult, LedPublisher};
    use crate::catalog::{CatalogClient, CatalogResult, ImageUrlBuilder, RawAlbum, RawPhoto};
    use crate::color::Rgb;
    use crate::runtime::TokioSpawner;
    use crate::services::{RetryPolicy, SensorBridge, TimelineService};
    use crate::state::Config;
    use crate::timeline::test_support::album;
    use crate::timeline::{Timeline, TimelineStore};
    use async_trait::async_trait;

    struct EmptyCatalog;

    #[async_trait]
    impl CatalogClient for EmptyCatalog {
        async fn list_albums(&self, _count: u32) -> CatalogResult<Vec<RawAlbum>> {
            Ok(Vec::new())
        }

        async fn list_photos(&self, _uid: &str, _count: u32) -> CatalogResult<Vec<RawPhoto>> {
            Ok(Vec::new())
        }
    }

    struct NoopLed;

    #[async_trait]
    impl LedPublisher for NoopLed {
        async fn publish_led(&self, _color: Rgb) -> BusResult<()> {
            Ok(())
        }
    }

    async fn serve_test_app() -> (String, AppState) {
        let store = Arc::new(TimelineStore::new());
        store.install(Timeline::new(vec![album("a", 0, 3), album("b", 5, 2)]));
        let hub = Arc::new(BroadcastHub::new(4));
        let bridge = Arc::new(SensorBridge::new(
            Arc::clone(&store),
            Arc::clone(&hub),
            Arc::new(NoopLed),
            ImageUrlBuilder::new("http://photos.local/api/v1", "fit_1920"),
            RetryPolicy::none(),
        ));
        let timeline = Arc::new(TimelineService::new(Arc::new(EmptyCatalog), store, 100, 200));
        let state = AppState {
            hub,
            timeline,
            bridge,
            spawner: TokioSpawner::current(),
            config: Arc::new(Config::default()),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), state)
    }

    #[tokio::test]
    async fn health_reports_service() {
        let (base, _) = serve_test_app().await;
        let body: serde_json::Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({"status": "ok", "service": "tape-relay"}));
    }

    #[tokio::test]
    async fn timeline_lists_albums_in_order() {
        let (base, _) = serve_test_app().await;
        let body: serde_json::Value = reqwest::get(format!("{base}/api/timeline"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body[0]["id"], "a");
        assert_eq!(body[0]["endIndex"], 2);
        assert_eq!(body[1]["startIndex"], 5);
    }

    #[tokio::test]
    async fn state_includes_last_sent_hash() {
        let (base, state) = serve_test_app().await;
        state.bridge.handle_sample(6).await;

        let body: serde_json::Value = reqwest::get(format!("{base}/api/state"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["albums"], 2);
        assert_eq!(body["lastSentHash"], "b-1");
        assert_eq!(body["sessions"]["open"], 0);
    }

    #[tokio::test]
    async fn refresh_is_accepted() {
        let (base, _) = serve_test_app().await;
        let res = reqwest::Client::new()
            .post(format!("{base}/api/refresh"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 202);
    }

    #[tokio::test]
    async fn plain_get_on_push_channel_is_rejected() {
        let (base, state) = serve_test_app().await;
        let res = reqwest::get(format!("{base}/ws")).await.unwrap();
        assert!(res.status().is_client_error());
        assert_eq!(state.hub.session_count(), 0);
    }
}
