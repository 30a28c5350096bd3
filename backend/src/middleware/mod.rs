//! Request middleware

pub mod auth;

pub use auth::{
    auth_middleware, require_director, require_parent, require_student, AuthUser, CurrentUser,
};
