use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use vikord_core::config::VikordConfig;
use vikord_events::SignatureValidator;
use vikord_notify::{Delivery, PayloadBuilder};
use vikord_reminders::{BindingStore, ReminderEngine};
use vikord_users::IdentityStore;

/// Central shared state, passed as `Arc<AppState>` to all Axum handlers.
pub struct AppState {
    pub config: VikordConfig,
    /// `None` only when unsigned webhooks are explicitly allowed.
    pub validator: Option<SignatureValidator>,
    pub builder: Arc<PayloadBuilder>,
    pub identities: Arc<IdentityStore>,
    pub bindings: Arc<BindingStore>,
    pub delivery: Arc<dyn Delivery>,
    pub engine: Arc<ReminderEngine>,
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/webhook", post(crate::http::webhooks::webhook_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
