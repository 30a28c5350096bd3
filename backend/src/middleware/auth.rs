//! Authentication middleware
//!
//! JWT authentication and role-based access control middleware

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{error::AppError, services::auth::decode_token, AppState};
use shared::UserRole;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl AuthUser {
    /// Check if user holds one of the given roles
    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let auth_user = match bearer_token(header)
        .and_then(|token| decode_token(token, &state.config.jwt.secret))
        .and_then(|claims| {
            let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
            Ok(AuthUser {
                user_id,
                username: claims.username,
                role: claims.role,
            })
        }) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// Pull the token out of an `Authorization: Bearer <token>` header
pub fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    let header = header.ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        (Some(_), Some(_), None) => Err(AppError::Unauthorized("Token malformatted".to_string())),
        _ => Err(AppError::Unauthorized("Token error".to_string())),
    }
}

async fn require_roles(roles: &[UserRole], request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.has_role(roles) => next.run(request).await,
        Some(user) => {
            tracing::debug!(user_id = %user.user_id, role = %user.role, "Role gate rejected request");
            AppError::InsufficientPermissions.into_response()
        }
        None => AppError::Unauthorized("Authentication required".to_string()).into_response(),
    }
}

pub async fn require_student(request: Request, next: Next) -> Response {
    require_roles(&[UserRole::Student], request, next).await
}

pub async fn require_parent(request: Request, next: Next) -> Response {
    require_roles(&[UserRole::Parent], request, next).await
}

pub async fn require_director(request: Request, next: Next) -> Response {
    require_roles(&[UserRole::Director], request, next).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: AppError) -> String {
        err.status_and_detail().1.message
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(Some("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_bearer_token_errors() {
        assert_eq!(message(bearer_token(None).unwrap_err()), "No token provided");
        assert_eq!(message(bearer_token(Some("Basic abc")).unwrap_err()), "Token malformatted");
        assert_eq!(message(bearer_token(Some("abc")).unwrap_err()), "Token error");
        assert_eq!(message(bearer_token(Some("Bearer a b")).unwrap_err()), "Token error");
    }

    #[test]
    fn test_has_role() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            username: "director".to_string(),
            role: UserRole::Director,
        };
        assert!(user.has_role(&[UserRole::Director]));
        assert!(!user.has_role(&[UserRole::Student, UserRole::Parent]));
    }
}
