//! HTTP handler for inbound SMS replies from the gateway

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::external::InboundSms;
use crate::services::PracticeService;
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "x-sms-signature";

/// Response for webhook processing
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
}

impl WebhookResponse {
    fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
        }
    }
}

/// Handle a parent's text reply
/// POST /webhooks/sms
///
/// Once the signature checks out the gateway always gets a 200 so it does not
/// redeliver.
pub async fn handle_sms_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<WebhookResponse>)> {
    let Some(secret) = state.config.sms.webhook_secret.as_deref() else {
        tracing::warn!("SMS webhook called but no webhook secret is configured");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(WebhookResponse::new(false, "SMS webhook is not configured")),
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = verify_signature(secret, signature, &body) {
        tracing::warn!("SMS webhook signature verification failed: {}", e);
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(WebhookResponse::new(false, "Invalid signature")),
        ));
    }

    let inbound: InboundSms = match serde_json::from_slice(&body) {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::warn!("Failed to parse SMS webhook: {}", e);
            return Ok(Json(WebhookResponse::new(
                false,
                format!("Invalid request body: {}", e),
            )));
        }
    };

    let service = PracticeService::new(state.db);
    let response = match service.resolve_sms_reply(&inbound.from, &inbound.body).await {
        Ok(Some(outcome)) => WebhookResponse::new(true, outcome.response.outcome_message()),
        Ok(None) => WebhookResponse::new(false, "No pending approval for this number"),
        Err(e) => {
            tracing::error!("Failed to process SMS reply: {}", e);
            WebhookResponse::new(false, e.status_and_detail().1.message)
        }
    };

    Ok(Json(response))
}

/// Check `signature` is base64(HMAC-SHA256(secret, body))
pub fn verify_signature(secret: &str, signature: Option<&str>, body: &[u8]) -> Result<(), String> {
    let signature = signature.ok_or("Missing x-sms-signature header")?;
    let signature = BASE64
        .decode(signature)
        .map_err(|_| "Signature is not valid base64")?;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "Failed to create HMAC")?;
    mac.update(body);
    mac.verify_slice(&signature)
        .map_err(|_| "Signature mismatch".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"from": "+1 555 123 4567", "body": "Y"}"#;

    fn sign_body(secret: &str, body: &[u8]) -> Result<String, String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|e| e.to_string())?;
        mac.update(body);
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature() {
        let signature = sign_body("shh", BODY).unwrap();
        assert!(verify_signature("shh", Some(&signature), BODY).is_ok());
    }

    #[test]
    fn test_rejects_tampered_body() {
        let signature = sign_body("shh", BODY).unwrap();
        assert!(verify_signature("shh", Some(&signature), b"{}").is_err());
        assert!(verify_signature("other", Some(&signature), BODY).is_err());
    }

    #[test]
    fn test_rejects_missing_or_garbled_header() {
        assert!(verify_signature("shh", None, BODY).is_err());
        assert!(verify_signature("shh", Some("not base64!"), BODY).is_err());
    }

    #[test]
    fn test_inbound_payload() {
        let inbound: InboundSms = serde_json::from_slice(BODY).unwrap();
        assert_eq!(shared::normalize_phone_number(&inbound.from), "+15551234567");
        assert_eq!(inbound.body, "Y");
    }
}
