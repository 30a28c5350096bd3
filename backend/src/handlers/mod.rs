//! HTTP handlers

pub mod auth;
pub mod director;
pub mod health;
pub mod parent;
pub mod settings;
pub mod sms_webhook;
pub mod student;

pub use health::health_check;
pub use sms_webhook::handle_sms_webhook;
