//! Authentication service for account registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::{validate_email, validate_password, validate_phone_number, validate_username, User, UserRole};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    token_expiry: i64,
}

/// Input for creating an account
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub phone_number: Option<String>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub username: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

/// Token plus the account it was issued for
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// User row from database
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<UserRole>()
            .map_err(|e| AppError::Internal(format!("Corrupt user row {}: {}", row.id, e)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role,
            phone_number: row.phone_number,
            created_at: row.created_at,
        })
    }
}

/// Column width of `users.first_name` and `users.last_name`
const MAX_NAME_LEN: usize = 100;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, role, phone_number, created_at";

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            token_expiry: config.jwt.token_expiry,
        }
    }

    /// Create an account and sign it in
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthSession> {
        let user = self.create_user(input).await?;
        let token = self.generate_token(&user)?;
        Ok(AuthSession { token, user })
    }

    /// Insert a user after validating the input and checking uniqueness
    pub async fn create_user(&self, input: RegisterInput) -> AppResult<User> {
        Self::validate_registration(&input)?;

        let existing = sqlx::query_as::<_, (String, String)>(
            "SELECT username, email FROM users WHERE username = $1 OR lower(email) = lower($2) LIMIT 1",
        )
        .bind(&input.username)
        .bind(&input.email)
        .fetch_optional(&self.db)
        .await?;

        if let Some((username, _)) = existing {
            let field = if username == input.username { "username" } else { "email" };
            return Err(AppError::DuplicateEntry(field.to_string()));
        }

        let password_hash = Self::hash_password(&input.password)?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, role, phone_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&input.username)
        .bind(input.email.trim())
        .bind(&password_hash)
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(input.role.as_str())
        .bind(input.phone_number.as_deref().map(shared::canonical_phone_number))
        .fetch_one(&self.db)
        .await
        .map_err(duplicate_user_error)?;

        let user = User::try_from(row)?;
        tracing::info!(user_id = %user.id, role = %user.role, "Account created");
        Ok(user)
    }

    /// Authenticate with username and password
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthSession> {
        let row = self
            .find_by_username(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let user = User::try_from(row)?;
        let token = self.generate_token(&user)?;
        Ok(AuthSession { token, user })
    }

    /// Load the profile of an authenticated user
    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        User::try_from(row)
    }

    /// Replace a user's password
    pub async fn reset_password(&self, username: &str, password: &str) -> AppResult<()> {
        validate_password(password).map_err(|e| AppError::Validation {
            field: "password".to_string(),
            message: e.to_string(),
        })?;
        let password_hash = Self::hash_password(password)?;

        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE username = $2",
        )
        .bind(&password_hash)
        .bind(username)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }
        Ok(())
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode_token(token, &self.jwt_secret)
    }

    /// Sign a token for `user`
    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        encode_token(user, &self.jwt_secret, self.token_expiry, Utc::now())
    }

    fn hash_password(password: &str) -> AppResult<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn validate_registration(input: &RegisterInput) -> AppResult<()> {
        let field_error = |field: &str, message: &str| AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        };

        validate_username(&input.username).map_err(|e| field_error("username", e))?;
        validate_email(input.email.trim()).map_err(|e| field_error("email", e))?;
        validate_password(&input.password).map_err(|e| field_error("password", e))?;
        for (field, value) in [("first_name", &input.first_name), ("last_name", &input.last_name)] {
            let len = value.trim().chars().count();
            if len == 0 || len > MAX_NAME_LEN {
                return Err(field_error(field, "Names must be 1-100 characters"));
            }
        }
        if let Some(phone) = &input.phone_number {
            validate_phone_number(phone).map_err(|e| field_error("phone_number", e))?;
        }
        Ok(())
    }
}

/// A concurrent registration can slip past the pre-check; report the unique
/// index it tripped as a duplicate field.
fn duplicate_user_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let field = match db.constraint() {
                Some(constraint) if constraint.contains("email") => "email",
                _ => "username",
            };
            return AppError::DuplicateEntry(field.to_string());
        }
    }
    AppError::from(err)
}

/// Sign a JWT for `user` valid for `expiry_secs` from `now`
pub fn encode_token(
    user: &User,
    secret: &str,
    expiry_secs: i64,
    now: DateTime<Utc>,
) -> AppResult<String> {
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role,
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Decode and validate a JWT
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: "student".to_string(),
            email: "student@example.com".to_string(),
            first_name: "Test".to_string(),
            last_name: "Student".to_string(),
            role,
            phone_number: None,
            created_at: Utc::now(),
        }
    }

    fn input() -> RegisterInput {
        RegisterInput {
            username: "student".to_string(),
            email: "student@example.com".to_string(),
            password: "test123".to_string(),
            first_name: "Test".to_string(),
            last_name: "Student".to_string(),
            role: UserRole::Student,
            phone_number: None,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let user = user(UserRole::Parent);
        let token = encode_token(&user, "secret", 3600, Utc::now()).unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, UserRole::Parent);
        assert_eq!(claims.username, "student");
    }

    #[test]
    fn test_token_wrong_secret() {
        let token = encode_token(&user(UserRole::Student), "secret", 3600, Utc::now()).unwrap();
        assert!(matches!(decode_token(&token, "other"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_token_expired() {
        let issued = Utc::now() - Duration::days(2);
        let token = encode_token(&user(UserRole::Student), "secret", 3600, issued).unwrap();
        assert!(matches!(decode_token(&token, "secret"), Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_validate_registration() {
        assert!(AuthService::validate_registration(&input()).is_ok());

        let mut bad = input();
        bad.email = "not-an-email".to_string();
        assert!(AuthService::validate_registration(&bad).is_err());

        let mut bad = input();
        bad.first_name = "  ".to_string();
        assert!(AuthService::validate_registration(&bad).is_err());

        let mut bad = input();
        bad.last_name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            AuthService::validate_registration(&bad),
            Err(AppError::Validation { field, .. }) if field == "last_name"
        ));

        let mut bad = input();
        bad.phone_number = Some("012".to_string());
        assert!(AuthService::validate_registration(&bad).is_err());
    }

    #[derive(Debug)]
    struct UniqueViolation(&'static str);

    impl std::fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
        }
    }

    impl std::error::Error for UniqueViolation {}

    impl sqlx::error::DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some("23505".into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn test_racing_insert_maps_to_conflict() {
        let err = duplicate_user_error(sqlx::Error::Database(Box::new(UniqueViolation(
            "users_email_lower_idx",
        ))));
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, axum::http::StatusCode::CONFLICT);
        assert_eq!(detail.field.as_deref(), Some("email"));

        let err = duplicate_user_error(sqlx::Error::Database(Box::new(UniqueViolation(
            "users_username_key",
        ))));
        assert!(matches!(err, AppError::DuplicateEntry(field) if field == "username"));
    }

    #[test]
    fn test_other_database_errors_pass_through() {
        let err = duplicate_user_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::DatabaseError(sqlx::Error::RowNotFound)));
    }
}
