//! Route definitions for the Practice Journal API

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::{
    handlers::{self, auth, director, parent, settings, student},
    middleware::{auth_middleware, require_director, require_parent, require_student},
    AppState,
};

/// Multipart framing allowance on top of the logo size limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (register/login public, profile protected)
        .nest("/auth", auth_routes(state.clone()))
        // SMS gateway replies (public, HMAC-signed)
        .route("/webhooks/sms", post(handlers::handle_sms_webhook))
        .nest("/student", student_routes(state.clone()))
        .nest("/parent", parent_routes(state.clone()))
        .nest("/director", director_routes(state.clone()))
        .nest("/settings", settings_routes(state))
}

fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/profile", get(auth::profile))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(protected)
}

/// Student routes (student role)
fn student_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/current-week", get(student::current_week))
        .route("/records", get(student::list_records))
        .route("/records/:record_id", get(student::get_record))
        .route("/records/:record_id/practice", patch(student::update_practice))
        .route("/parents", get(student::list_parents))
        .route("/send-verification", post(student::send_verification))
        .route("/verify-practice", post(student::verify_practice))
        .route_layer(middleware::from_fn(require_student))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Parent routes (parent role)
fn parent_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/children", get(parent::list_children))
        .route("/children/:child_id/records", get(parent::child_records))
        .route(
            "/children/:child_id/records/:record_id",
            get(parent::child_record),
        )
        .route(
            "/children/:child_id/records/:record_id/sign",
            post(parent::sign_record),
        )
        .route_layer(middleware::from_fn(require_parent))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Director routes (director role)
fn director_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/students", get(director::list_students))
        .route("/parents", get(director::list_parents))
        .route("/records/week/:week_start_date", get(director::week_records))
        .route("/students/:student_id/records", get(director::student_records))
        .route("/students/:student_id/parents", post(director::link_parent))
        .route(
            "/students/:student_id/parents/:parent_id",
            delete(director::unlink_parent),
        )
        .route("/statistics", get(director::statistics))
        .route("/statistics/weekly", get(director::weekly_statistics))
        .route_layer(middleware::from_fn(require_director))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Settings routes: any signed-in user may read, only directors may change
fn settings_routes(state: AppState) -> Router<AppState> {
    let body_limit = state.config.uploads.max_logo_bytes + MULTIPART_OVERHEAD_BYTES;

    let director_only = Router::new()
        .route("/", put(settings::update_settings))
        .route(
            "/logo",
            post(settings::upload_logo)
                .delete(settings::delete_logo)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route_layer(middleware::from_fn(require_director));

    Router::new()
        .route("/", get(settings::get_settings))
        .merge(director_only)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
