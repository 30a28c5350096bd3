//! Shared types and models for the Practice Journal
//!
//! This crate contains the domain rules shared between the backend, the
//! browser (via WASM), and the admin tooling: practice scoring, the parent
//! approval state machine, school settings rules, and statistics.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
