pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::hub::handlers as hub_handlers;
use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions
        .route("/api/v1/sessions", post(handlers::handle_start_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:id/messages",
            post(handlers::handle_send_message),
        )
        .route(
            "/api/v1/sessions/:id/context",
            patch(handlers::handle_update_context),
        )
        .route(
            "/api/v1/sessions/:id/system-prompt",
            get(handlers::handle_system_prompt),
        )
        // Reports
        .route("/api/v1/sessions/:id/report", post(handlers::handle_report))
        .route(
            "/api/v1/sessions/:id/report.md",
            get(handlers::handle_report_markdown),
        )
        // Extension hub
        .route("/api/hub/push", post(hub_handlers::handle_push))
        .with_state(state)
}
