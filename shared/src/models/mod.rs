//! Domain models for the Practice Journal

mod practice;
mod settings;
mod statistics;
mod user;

pub use practice::*;
pub use settings::*;
pub use statistics::*;
pub use user::*;
