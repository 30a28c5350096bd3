//! Request extractors whose rejections use the API error envelope

use axum::extract::{rejection::JsonRejection, FromRequest};

use crate::error::AppError;

/// `axum::Json` that rejects bad bodies with a 400 `VALIDATION_ERROR`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(format!("Invalid request body: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Minutes {
        minutes: i32,
    }

    async fn extract(body: &'static str) -> Result<AppJson<Minutes>, AppError> {
        let request = Request::builder()
            .method("PATCH")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        AppJson::<Minutes>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn test_valid_body() {
        let AppJson(body) = extract(r#"{"minutes": 30}"#).await.unwrap();
        assert_eq!(body.minutes, 30);
    }

    #[tokio::test]
    async fn test_wrong_types_are_bad_requests() {
        for body in [r#"{"minutes": 30.5}"#, r#"{"minutes": "30"}"#, "{", "{}"] {
            let err = extract(body).await.unwrap_err();
            let (status, detail) = err.status_and_detail();
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(detail.code, "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"minutes": 30}"#))
            .unwrap();
        let err = AppJson::<Minutes>::from_request(request, &())
            .await
            .unwrap_err();
        assert_eq!(err.status_and_detail().0, StatusCode::BAD_REQUEST);
    }
}
