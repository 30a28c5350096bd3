//! Third-party service clients

pub mod sms;

pub use sms::{InboundSms, SmsClient};
