//! Database models for the Practice Journal
//!
//! Re-exports models from the shared crate and adds the row types that map
//! query results onto them

use uuid::Uuid;

pub use shared::models::*;

/// Listing projection of a user row
#[derive(Debug, sqlx::FromRow)]
pub struct UserSummaryRow {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<UserSummaryRow> for UserSummary {
    fn from(row: UserSummaryRow) -> Self {
        UserSummary {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct StudentNameRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl From<StudentNameRow> for StudentName {
    fn from(row: StudentNameRow) -> Self {
        StudentName {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}
