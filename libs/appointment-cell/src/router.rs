// libs/appointment-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_utils::extractor::{auth_middleware, optional_auth_middleware};
use shared_utils::AppState;

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/",
            get(handlers::list_appointments).post(handlers::create_appointment),
        )
        // Listings
        .route("/date-range", get(handlers::appointments_by_date_range))
        .route("/my-appointments", get(handlers::my_appointments))
        .route("/my-upcoming-appointments", get(handlers::my_upcoming_appointments))
        .route("/doctor/{doctor_id}", get(handlers::doctor_appointments))
        // Single appointment
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/confirm", put(handlers::confirm_appointment))
        .route("/{appointment_id}/reject", put(handlers::reject_appointment))
        .route("/{appointment_id}/complete", put(handlers::complete_appointment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    let simple_routes = Router::new()
        .route("/simple", post(handlers::create_simple_appointment))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            optional_auth_middleware,
        ));

    Router::new()
        .merge(simple_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Mounted under `/api/public/appointments`; no authentication.
pub fn public_appointment_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(handlers::create_public_appointment))
        .with_state(state)
}
