//! Student/parent links

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::UserSummaryRow;
use shared::{UserRole, UserSummary};

#[derive(Clone)]
pub struct FamilyService {
    db: PgPool,
}

impl FamilyService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Parents linked to a student
    pub async fn parents_of(&self, student_id: Uuid) -> AppResult<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummaryRow>(
            r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.email
            FROM users u
            JOIN student_parents sp ON sp.parent_id = u.id
            WHERE sp.student_id = $1
            ORDER BY u.last_name, u.first_name
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    /// Students linked to a parent
    pub async fn children_of(&self, parent_id: Uuid) -> AppResult<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummaryRow>(
            r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.email
            FROM users u
            JOIN student_parents sp ON sp.student_id = u.id
            WHERE sp.parent_id = $1
            ORDER BY u.last_name, u.first_name
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    pub async fn is_linked(&self, parent_id: Uuid, student_id: Uuid) -> AppResult<bool> {
        let linked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM student_parents WHERE parent_id = $1 AND student_id = $2)",
        )
        .bind(parent_id)
        .bind(student_id)
        .fetch_one(&self.db)
        .await?;

        Ok(linked)
    }

    /// Fail with 403 unless the parent is linked to the student.
    /// `action` names what was attempted ("view", "sign").
    pub async fn ensure_linked(
        &self,
        parent_id: Uuid,
        student_id: Uuid,
        action: &str,
    ) -> AppResult<()> {
        if self.is_linked(parent_id, student_id).await? {
            Ok(())
        } else {
            Err(not_linked(action))
        }
    }

    /// Link a parent to a student. Linking twice is a conflict.
    pub async fn link(&self, student_id: Uuid, parent_id: Uuid) -> AppResult<()> {
        self.ensure_role(student_id, UserRole::Student, "Student").await?;
        self.ensure_role(parent_id, UserRole::Parent, "Parent").await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO student_parents (student_id, parent_id)
            VALUES ($1, $2)
            ON CONFLICT (student_id, parent_id) DO NOTHING
            "#,
        )
        .bind(student_id)
        .bind(parent_id)
        .execute(&self.db)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Parent is already linked to this student".to_string(),
            ));
        }

        tracing::info!(student_id = %student_id, parent_id = %parent_id, "Parent linked");
        Ok(())
    }

    pub async fn unlink(&self, student_id: Uuid, parent_id: Uuid) -> AppResult<()> {
        let deleted = sqlx::query(
            "DELETE FROM student_parents WHERE student_id = $1 AND parent_id = $2",
        )
        .bind(student_id)
        .bind(parent_id)
        .execute(&self.db)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Parent link".to_string()));
        }

        tracing::info!(student_id = %student_id, parent_id = %parent_id, "Parent unlinked");
        Ok(())
    }

    async fn ensure_role(&self, user_id: Uuid, role: UserRole, label: &str) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND role = $2)",
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(&self.db)
        .await?;

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound(label.to_string()))
        }
    }
}

fn not_linked(action: &str) -> AppError {
    AppError::Forbidden(format!("Not authorized to {} this student's records", action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_not_linked_names_action() {
        let (status, detail) = not_linked("sign").status_and_detail();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(detail.message, "Not authorized to sign this student's records");
        assert_eq!(
            not_linked("view").status_and_detail().1.message,
            "Not authorized to view this student's records"
        );
    }
}
