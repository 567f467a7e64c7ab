use std::sync::Arc;

use axum::{
    extract::Request,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use adflow_shared::auth::auth_middleware;
use adflow_shared::fb::{GatewayFactory, GraphApiFactory};
use adflow_shared::queue::{SqsTaskQueue, TaskQueue};
use adflow_shared::store::dynamo::DynamoKvStore;
use adflow_shared::store::KvStore;

use crate::handlers::campaign_handlers::{
    campaign_list, delete_campaign, get_campaign, selectable_events, task_status, update_campaign,
};
use crate::handlers::account_handlers::{
    account_audiences, account_mobile_apps, account_pixels, make_lookalikes,
};

/// Everything a handler needs, injected so tests can substitute fakes.
pub struct AppState<S> {
    pub store: Arc<S>,
    pub gateways: Arc<dyn GatewayFactory>,
    pub queue: Arc<dyn TaskQueue>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateways: self.gateways.clone(),
            queue: self.queue.clone(),
        }
    }
}

/// Creates a router with the production store, gateway, and queue.
pub async fn create_router() -> Router {
    info!("Creating router with DynamoDB store");

    let state = AppState {
        store: Arc::new(DynamoKvStore::new().await),
        gateways: Arc::new(GraphApiFactory::new()) as Arc<dyn GatewayFactory>,
        queue: Arc::new(
            SqsTaskQueue::new()
                .await
                .expect("SQS_URL must be configured"),
        ) as Arc<dyn TaskQueue>,
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
        .route("/campaigns", get(campaign_list::<S>))
        .route(
            "/campaigns/:id",
            get(get_campaign::<S>)
                .patch(update_campaign::<S>)
                .delete(delete_campaign::<S>),
        )
        .route(
            "/campaigns/:id/selectable-events",
            get(selectable_events::<S>),
        )
        .route("/tasks/:task_id", get(task_status::<S>))
        .route("/account/pixels", get(account_pixels::<S>))
        .route("/account/apps", get(account_mobile_apps::<S>))
        .route("/account/audiences", get(account_audiences::<S>))
        .route("/account/lookalikes", post(make_lookalikes::<S>))
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
