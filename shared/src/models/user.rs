//! User and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles a user can hold. Each account has exactly one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Parent,
    Director,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Student, UserRole::Parent, UserRole::Director];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Parent => "parent",
            UserRole::Director => "director",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            "parent" => Ok(UserRole::Parent),
            "director" => Ok(UserRole::Director),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

/// A user account as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Listing projection for students, parents and children
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Student name attached to records in director views
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudentName {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("student".parse::<UserRole>().unwrap(), UserRole::Student);
        assert_eq!(" Parent ".parse::<UserRole>().unwrap(), UserRole::Parent);
        assert_eq!("DIRECTOR".parse::<UserRole>().unwrap(), UserRole::Director);
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&UserRole::Director).unwrap(), "\"director\"");
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
    }
}
