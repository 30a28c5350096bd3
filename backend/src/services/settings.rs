//! School settings service and logo storage

use std::path::{Path, PathBuf};

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{ProgramType, SchoolLevel, SchoolSettings, SettingsUpdate};

/// Public URL prefix the upload directory is served under
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Settings service for the single school settings row
#[derive(Clone)]
pub struct SettingsService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    primary_color: String,
    secondary_color: String,
    logo_url: Option<String>,
    week_start_day: i16,
    school_name: String,
    school_level: String,
    program_type: String,
    custom_school_level: Option<String>,
    custom_program_type: Option<String>,
}

impl TryFrom<SettingsRow> for SchoolSettings {
    type Error = AppError;

    fn try_from(row: SettingsRow) -> Result<Self, Self::Error> {
        Ok(SchoolSettings {
            primary_color: row.primary_color,
            secondary_color: row.secondary_color,
            logo_url: row.logo_url,
            week_start_day: row.week_start_day,
            school_name: row.school_name,
            school_level: row
                .school_level
                .parse::<SchoolLevel>()
                .map_err(AppError::Internal)?,
            program_type: row
                .program_type
                .parse::<ProgramType>()
                .map_err(AppError::Internal)?,
            custom_school_level: row.custom_school_level,
            custom_program_type: row.custom_program_type,
        })
    }
}

const SETTINGS_COLUMNS: &str = r#"
    primary_color, secondary_color, logo_url, week_start_day, school_name,
    school_level, program_type, custom_school_level, custom_program_type
"#;

impl SettingsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Current settings, creating the row with defaults on first use
    pub async fn get(&self) -> AppResult<SchoolSettings> {
        let mut conn = self.db.acquire().await?;
        Self::load(&mut conn, false).await
    }

    /// Apply a partial update
    pub async fn update(&self, update: SettingsUpdate) -> AppResult<SchoolSettings> {
        let (settings, ()) = self
            .modify(|settings| settings.apply(update).map_err(AppError::from))
            .await?;
        tracing::info!(school_name = %settings.school_name, "School settings updated");
        Ok(settings)
    }

    /// Point the logo at a newly stored file. Returns the previous logo URL.
    pub async fn set_logo(&self, logo_url: String) -> AppResult<(SchoolSettings, Option<String>)> {
        self.modify(|settings| Ok(settings.logo_url.replace(logo_url)))
            .await
    }

    /// Remove the logo. Returns the URL that was cleared.
    pub async fn clear_logo(&self) -> AppResult<(SchoolSettings, String)> {
        self.modify(|settings| {
            settings
                .logo_url
                .take()
                .ok_or_else(|| AppError::ValidationError("No logo to delete".to_string()))
        })
        .await
    }

    async fn modify<T, F>(&self, change: F) -> AppResult<(SchoolSettings, T)>
    where
        F: FnOnce(&mut SchoolSettings) -> AppResult<T>,
    {
        let mut tx = self.db.begin().await?;
        let mut settings = Self::load(&mut tx, true).await?;
        let output = change(&mut settings)?;
        Self::save(&mut tx, &settings).await?;
        tx.commit().await?;
        Ok((settings, output))
    }

    async fn load(conn: &mut PgConnection, for_update: bool) -> AppResult<SchoolSettings> {
        let defaults = SchoolSettings::default();
        sqlx::query(
            r#"
            INSERT INTO school_settings (
                id, primary_color, secondary_color, week_start_day, school_name,
                school_level, program_type
            )
            VALUES (1, $1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&defaults.primary_color)
        .bind(&defaults.secondary_color)
        .bind(defaults.week_start_day)
        .bind(&defaults.school_name)
        .bind(defaults.school_level.as_str())
        .bind(defaults.program_type.as_str())
        .execute(&mut *conn)
        .await?;

        let lock = if for_update { " FOR UPDATE" } else { "" };
        let row = sqlx::query_as::<_, SettingsRow>(&format!(
            "SELECT {} FROM school_settings WHERE id = 1{}",
            SETTINGS_COLUMNS, lock
        ))
        .fetch_one(&mut *conn)
        .await?;

        SchoolSettings::try_from(row)
    }

    async fn save(conn: &mut PgConnection, settings: &SchoolSettings) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE school_settings SET
                primary_color = $1, secondary_color = $2, logo_url = $3,
                week_start_day = $4, school_name = $5, school_level = $6,
                program_type = $7, custom_school_level = $8, custom_program_type = $9,
                updated_at = NOW()
            WHERE id = 1
            "#,
        )
        .bind(&settings.primary_color)
        .bind(&settings.secondary_color)
        .bind(&settings.logo_url)
        .bind(settings.week_start_day)
        .bind(&settings.school_name)
        .bind(settings.school_level.as_str())
        .bind(settings.program_type.as_str())
        .bind(&settings.custom_school_level)
        .bind(&settings.custom_program_type)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Logo files on local disk, served under [`UPLOADS_URL_PREFIX`]
#[derive(Debug, Clone)]
pub struct LogoStore {
    dir: PathBuf,
}

impl LogoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `logo-<millis>-<random>` plus the upload's extension, if it has a sane one
    pub fn file_name_for(original: Option<&str>) -> String {
        let millis = Utc::now().timestamp_millis();
        let random = Uuid::new_v4().simple().to_string();
        let extension = original
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();

        format!("logo-{}-{}{}", millis, &random[..9], extension)
    }

    /// Write the upload and return its public URL
    pub async fn save(&self, original: Option<&str>, bytes: &[u8]) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::StorageError(format!("Cannot create upload dir: {}", e)))?;

        let file_name = Self::file_name_for(original);
        tokio::fs::write(self.dir.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("Cannot write logo: {}", e)))?;

        Ok(format!("{}/{}", UPLOADS_URL_PREFIX, file_name))
    }

    /// Delete the file behind a logo URL. Missing files are ignored.
    pub async fn remove(&self, url: &str) {
        let Some(path) = self.path_for(url) else {
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed logo file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove logo file"),
        }
    }

    /// Local path for a URL under the uploads prefix
    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(UPLOADS_URL_PREFIX)?.trim_start_matches('/');
        let file_name = Path::new(name).file_name()?;
        if file_name != name {
            return None;
        }
        Some(self.dir.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_keeps_extension() {
        let name = LogoStore::file_name_for(Some("Crest.PNG"));
        assert!(name.starts_with("logo-"));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn test_file_name_drops_odd_extension() {
        let name = LogoStore::file_name_for(Some("crest.p/ng"));
        assert!(!name.contains('/'));
        let name = LogoStore::file_name_for(None);
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_path_for_rejects_traversal() {
        let store = LogoStore::new("uploads");
        assert_eq!(
            store.path_for("/uploads/logo-1-abc.png"),
            Some(PathBuf::from("uploads/logo-1-abc.png"))
        );
        assert_eq!(store.path_for("/uploads/../secret"), None);
        assert_eq!(store.path_for("/elsewhere/logo.png"), None);
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = std::env::temp_dir().join(format!("pj-logo-test-{}", Uuid::new_v4()));
        let store = LogoStore::new(&dir);

        let url = store.save(Some("logo.svg"), b"<svg/>").await.unwrap();
        let path = store.path_for(&url).unwrap();
        assert!(path.exists());

        store.remove(&url).await;
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }
}
