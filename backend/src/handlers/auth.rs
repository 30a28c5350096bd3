//! HTTP handlers for authentication

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    extract::AppJson,
    middleware::CurrentUser,
    services::auth::{AuthService, AuthSession, RegisterInput},
    AppState,
};
use shared::{User, UserRole};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: String,
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,
    pub role: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
}

impl AuthResponse {
    fn new(message: &'static str, session: AuthSession) -> Self {
        Self {
            message,
            token: session.token,
            user: session.user,
        }
    }
}

/// Parse the requested role and apply the self-registration policy
pub fn registration_role(role: &str, allow_director: bool) -> AppResult<UserRole> {
    let role = role.parse::<UserRole>().map_err(|_| AppError::Validation {
        field: "role".to_string(),
        message: "Invalid role".to_string(),
    })?;

    if role == UserRole::Director && !allow_director {
        return Err(AppError::Forbidden(
            "Director accounts cannot be self-registered".to_string(),
        ));
    }
    Ok(role)
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    request.validate()?;
    let role = registration_role(&request.role, state.config.auth.allow_director_registration)?;

    let service = AuthService::new(state.db, &state.config);
    let session = service
        .register(RegisterInput {
            username: request.username,
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
            role,
            phone_number: request.phone_number,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("User registered successfully", session)),
    ))
}

/// Log in with username and password
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    request.validate()?;

    let service = AuthService::new(state.db, &state.config);
    let session = service.login(&request.username, &request.password).await?;
    tracing::info!(user_id = %session.user.id, "User logged in");

    Ok(Json(AuthResponse::new("Login successful", session)))
}

/// Profile of the authenticated user
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ProfileResponse>> {
    let service = AuthService::new(state.db, &state.config);
    let user = service.get_profile(user.user_id).await?;
    Ok(Json(ProfileResponse { user }))
}
