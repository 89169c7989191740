use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/toggle/:id", post(handlers::toggle_form))
        .route("/progress/:id", post(handlers::progress_form))
        .route("/lock", post(handlers::lock_form))
        .route("/unlock", post(handlers::unlock_form))
        .route("/api/today", get(handlers::get_today))
        .route("/api/day/lock", post(handlers::lock_day))
        .route("/api/day/unlock", post(handlers::unlock_day))
        .route(
            "/api/activities",
            get(handlers::list_activities).post(handlers::create_activity),
        )
        .route(
            "/api/activities/:id",
            patch(handlers::update_activity).delete(handlers::delete_activity),
        )
        .route("/api/activities/:id/toggle", post(handlers::toggle))
        .route(
            "/api/activities/:id/progress/propose",
            post(handlers::propose_progress),
        )
        .route(
            "/api/activities/:id/progress/commit",
            post(handlers::commit_progress),
        )
        .route("/api/history", get(handlers::get_history))
        .route(
            "/api/lists",
            get(handlers::list_lists).post(handlers::create_list),
        )
        .route(
            "/api/lists/:id",
            get(handlers::get_list).delete(handlers::delete_list),
        )
        .route("/api/lists/:id/items", post(handlers::add_item))
        .route("/api/items/:id/validate", post(handlers::validate_item))
        .route("/api/items/:id", delete(handlers::delete_item))
        .with_state(state)
}
