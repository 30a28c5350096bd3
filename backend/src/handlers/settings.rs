//! HTTP handlers for school settings and the logo

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    extract::AppJson,
    services::{LogoStore, SettingsService},
    AppState,
};
use shared::{SchoolSettings, SettingsUpdate};

/// Multipart field carrying the logo file
pub const LOGO_FIELD: &str = "logo";

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub settings: SchoolSettings,
}

pub async fn get_settings(State(state): State<AppState>) -> AppResult<Json<SettingsResponse>> {
    let settings = SettingsService::new(state.db).get().await?;
    Ok(Json(SettingsResponse {
        message: None,
        settings,
    }))
}

pub async fn update_settings(
    State(state): State<AppState>,
    AppJson(update): AppJson<SettingsUpdate>,
) -> AppResult<Json<SettingsResponse>> {
    let settings = SettingsService::new(state.db).update(update).await?;
    Ok(Json(SettingsResponse {
        message: Some("Settings updated successfully"),
        settings,
    }))
}

/// Replace the logo with an uploaded image
pub async fn upload_logo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<SettingsResponse>> {
    let max_bytes = state.config.uploads.max_logo_bytes;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some(LOGO_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        check_image_type(&content_type)?;
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::ValidationError(format!("Invalid upload: {}", e)))?;
        check_size(bytes.len(), max_bytes)?;

        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::ValidationError("No file uploaded".to_string()))?;

    let store = LogoStore::new(&state.config.uploads.dir);
    let logo_url = store.save(file_name.as_deref(), &bytes).await?;

    let (settings, previous) = match SettingsService::new(state.db).set_logo(logo_url.clone()).await {
        Ok(result) => result,
        Err(e) => {
            store.remove(&logo_url).await;
            return Err(e);
        }
    };
    if let Some(previous) = previous {
        store.remove(&previous).await;
    }

    tracing::info!(logo_url = %logo_url, size = bytes.len(), "School logo uploaded");
    Ok(Json(SettingsResponse {
        message: Some("Logo uploaded successfully"),
        settings,
    }))
}

pub async fn delete_logo(State(state): State<AppState>) -> AppResult<Json<SettingsResponse>> {
    let (settings, removed) = SettingsService::new(state.db).clear_logo().await?;
    LogoStore::new(&state.config.uploads.dir).remove(&removed).await;

    tracing::info!("School logo removed");
    Ok(Json(SettingsResponse {
        message: Some("Logo deleted successfully"),
        settings,
    }))
}

fn check_image_type(content_type: &str) -> AppResult<()> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(AppError::ValidationError(
            "Only image files are allowed".to_string(),
        ))
    }
}

fn check_size(len: usize, max_bytes: usize) -> AppResult<()> {
    if len == 0 {
        return Err(AppError::ValidationError("Uploaded file is empty".to_string()));
    }
    if len > max_bytes {
        return Err(AppError::ValidationError(format!(
            "File too large; limit is {} bytes",
            max_bytes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_image_type() {
        assert!(check_image_type("image/png").is_ok());
        assert!(check_image_type("image/svg+xml").is_ok());
        assert!(check_image_type("application/pdf").is_err());
        assert!(check_image_type("").is_err());
    }

    #[test]
    fn test_check_size() {
        let limit = 5 * 1024 * 1024;
        assert!(check_size(1024, limit).is_ok());
        assert!(check_size(limit, limit).is_ok());
        assert!(check_size(limit + 1, limit).is_err());
        assert!(check_size(0, limit).is_err());
    }
}
