// libs/notification-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn notification_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/unread", get(handlers::list_unread_notifications))
        .route("/count-unread", get(handlers::count_unread_notifications))
        .route("/mark-all-read", put(handlers::mark_all_notifications_read))
        .route("/{notification_id}", get(handlers::get_notification))
        .route("/{notification_id}/mark-read", put(handlers::mark_notification_read))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
