//! Account provisioning used by the admin subcommands

use sqlx::PgPool;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::auth::{AuthService, RegisterInput};
use crate::services::family::FamilyService;
use shared::{User, UserRole};

pub const TEST_ACCOUNT_PASSWORD: &str = "test123";

/// A seeded account and whether it already existed
#[derive(Debug)]
pub struct SeededAccount {
    pub user: User,
    pub created: bool,
}

pub struct AccountService {
    auth: AuthService,
    family: FamilyService,
}

impl AccountService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            auth: AuthService::new(db.clone(), config),
            family: FamilyService::new(db),
        }
    }

    /// Create a director account
    pub async fn create_director(&self, input: RegisterInput) -> AppResult<User> {
        self.auth
            .create_user(RegisterInput {
                role: UserRole::Director,
                ..input
            })
            .await
    }

    /// Reset a password by username
    pub async fn reset_password(&self, username: &str, password: &str) -> AppResult<()> {
        self.auth.reset_password(username, password).await
    }

    /// Ensure the director, student and parent test accounts exist with the
    /// shared test password, and that the student is linked to the parent
    pub async fn seed_test_accounts(&self) -> AppResult<Vec<SeededAccount>> {
        let director = self
            .ensure_account(test_account("director", "School", "Director", UserRole::Director))
            .await?;
        let student = self
            .ensure_account(test_account("student", "Test", "Student", UserRole::Student))
            .await?;
        let parent = self
            .ensure_account(test_account("parent", "Test", "Parent", UserRole::Parent))
            .await?;

        match self.family.link(student.user.id, parent.user.id).await {
            Ok(()) | Err(AppError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }

        Ok(vec![director, student, parent])
    }

    async fn ensure_account(&self, input: RegisterInput) -> AppResult<SeededAccount> {
        match self.auth.find_by_username(&input.username).await? {
            Some(row) => {
                self.auth
                    .reset_password(&input.username, &input.password)
                    .await?;
                Ok(SeededAccount {
                    user: User::try_from(row)?,
                    created: false,
                })
            }
            None => Ok(SeededAccount {
                user: self.auth.create_user(input).await?,
                created: true,
            }),
        }
    }
}

fn test_account(username: &str, first_name: &str, last_name: &str, role: UserRole) -> RegisterInput {
    RegisterInput {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: TEST_ACCOUNT_PASSWORD.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        role,
        phone_number: None,
    }
}
