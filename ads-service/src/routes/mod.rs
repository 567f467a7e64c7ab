use std::sync::Arc;

use axum::{
    extract::Request,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use adflow_shared::auth::auth_middleware;
use adflow_shared::fb::{GatewayFactory, GraphApiFactory};
use adflow_shared::store::dynamo::DynamoKvStore;
use adflow_shared::store::KvStore;

use crate::handlers::ad_handlers::{
    account_ads, create_video_ad, creative_preview, import_ad_handler, remove_ad_from_campaign,
    update_ad_status, update_campaign_ad_status,
};

pub struct AppState<S> {
    pub store: Arc<S>,
    pub gateways: Arc<dyn GatewayFactory>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateways: self.gateways.clone(),
        }
    }
}

/// Creates a router with the production store and gateway.
pub async fn create_router() -> Router {
    info!("Creating router with DynamoDB store");

    let state = AppState {
        store: Arc::new(DynamoKvStore::new().await),
        gateways: Arc::new(GraphApiFactory::new()) as Arc<dyn GatewayFactory>,
    };

    create_router_with_state(state)
}

/// Creates a router over the given state.
pub fn create_router_with_state<S>(state: AppState<S>) -> Router
where
    S: KvStore,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    async fn logging_middleware(
        req: Request,
        next: axum::middleware::Next,
    ) -> impl axum::response::IntoResponse {
        info!(
            "Router received request: method={}, uri={}",
            req.method(),
            req.uri()
        );
        next.run(req).await
    }

    let router = Router::new()
        .route("/ads", get(account_ads::<S>))
        .route("/ads/import", post(import_ad_handler::<S>))
        .route("/ads/:id/status", patch(update_ad_status::<S>))
        .route("/ads/preview", post(creative_preview::<S>))
        .route("/ads/video", post(create_video_ad::<S>))
        .route(
            "/campaigns/:id/ads/status",
            patch(update_campaign_ad_status::<S>),
        )
        .route(
            "/campaigns/:id/ads/:creative_id",
            delete(remove_ad_from_campaign::<S>),
        )
        .layer(middleware::from_fn(auth_middleware))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(logging_middleware));

    router.fallback(|req: Request| async move {
        warn!("No route matched for: {} {}", req.method(), req.uri());
        (
            axum::http::StatusCode::NOT_FOUND,
            "The requested resource was not found".to_string(),
        )
    })
}
