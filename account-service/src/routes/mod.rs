use std::sync::Arc;

use axum::{
    extract::Request,
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use adflow_shared::auth::auth_middleware;
use adflow_shared::billing::{Billing, StripeClient};
use adflow_shared::fb::{GatewayFactory, GraphApiFactory};
use adflow_shared::store::dynamo::DynamoKvStore;
use adflow_shared::store::KvStore;

use crate::handlers::{
    account_list, billing_plans, insights_with_data, update_account_conversion_event,
    update_account_status,
};

pub struct AppState<S> {
    pub store: Arc<S>,
    pub gateways: Arc<dyn GatewayFactory>,
    pub billing: Arc<dyn Billing>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateways: self.gateways.clone(),
            billing: self.billing.clone(),
        }
    }
}

/// Creates a router with the production store, gateway, and payments client.
pub async fn create_router() -> Router {
    info!("Creating router with DynamoDB store");

    let state = AppState {
        store: Arc::new(DynamoKvStore::new().await),
        gateways: Arc::new(GraphApiFactory::new()) as Arc<dyn GatewayFactory>,
        billing: Arc::new(StripeClient::new().expect("STRIPE_SECRET_KEY must be configured"))
            as Arc<dyn Billing>,
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
        .route("/accounts/list", post(account_list::<S>))
        .route("/accounts/:id/status", patch(update_account_status::<S>))
        .route(
            "/accounts/:id/conversion-event",
            patch(update_account_conversion_event::<S>),
        )
        .route("/accounts/:id/insights", post(insights_with_data::<S>))
        .route("/billing/plans", get(billing_plans::<S>))
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
