//! Business logic services for the Practice Journal

pub mod accounts;
pub mod auth;
pub mod director;
pub mod family;
pub mod practice;
pub mod settings;

pub use accounts::AccountService;
pub use auth::AuthService;
pub use director::DirectorService;
pub use family::FamilyService;
pub use practice::PracticeService;
pub use settings::{LogoStore, SettingsService};
