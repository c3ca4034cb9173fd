/// Inbound webhooks (public, signature-checked)
///
/// - `GET /api/webhooks/meta` - Subscription handshake, echoes `hub.challenge`
/// - `POST /api/webhooks/meta` - Ad spend events (`X-Hub-Signature-256`)
/// - `POST /api/webhooks/shopify` - Order events (`X-Shopify-Hmac-Sha256`)
///
/// Signatures are computed over the raw request body and only checked when
/// both the secret is configured and the header is sent.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tallybook_shared::webhooks::{
    meta, shopify,
    signature::{verify_meta as meta_signature_ok, verify_shopify as shopify_signature_ok},
    WebhookAck, WebhookError,
};

const META_SIGNATURE_HEADER: &str = "x-hub-signature-256";
const SHOPIFY_SIGNATURE_HEADER: &str = "x-shopify-hmac-sha256";
const SHOPIFY_TOPIC_HEADER: &str = "x-shopify-topic";

/// Meta subscription handshake query
#[derive(Debug, Default, Deserialize)]
pub struct MetaVerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,

    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,

    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn configured(secret: &Option<String>) -> Option<&str> {
    secret.as_deref().filter(|s| !s.is_empty())
}

fn parse_payload(body: &Bytes) -> ApiResult<JsonValue> {
    serde_json::from_slice(body)
        .map_err(|_| ApiError::BadRequest("Payload do webhook invalido".to_string()))
}

pub async fn verify_meta(
    State(state): State<AppState>,
    Query(query): Query<MetaVerifyQuery>,
) -> ApiResult<String> {
    let expected = configured(&state.config.webhooks.meta_verify_token);

    match (query.mode.as_deref(), expected, query.verify_token.as_deref()) {
        (Some("subscribe"), Some(expected), Some(token)) if token == expected => {
            tracing::info!("Meta webhook subscription verified");
            Ok(query.challenge.unwrap_or_default())
        }
        _ => Err(ApiError::BadRequest(
            "Verificação do webhook Meta falhou".to_string(),
        )),
    }
}

pub async fn receive_meta(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    if let (Some(secret), Some(signature)) = (
        configured(&state.config.webhooks.meta_app_secret),
        header_str(&headers, META_SIGNATURE_HEADER),
    ) {
        if !meta_signature_ok(secret, signature, &body) {
            tracing::warn!("Meta webhook rejected: signature mismatch");
            return Err(WebhookError::InvalidSignature("Assinatura Meta inválida").into());
        }
    }

    let payload = parse_payload(&body)?;
    let ack = meta::ingest(&state.db, &payload, &state.meta_accounts)
        .await
        .map_err(WebhookError::from)?;

    Ok(Json(ack))
}

pub async fn receive_shopify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    if let (Some(secret), Some(signature)) = (
        configured(&state.config.webhooks.shopify_secret),
        header_str(&headers, SHOPIFY_SIGNATURE_HEADER),
    ) {
        if !shopify_signature_ok(secret, signature, &body) {
            tracing::warn!("Shopify webhook rejected: signature mismatch");
            return Err(WebhookError::InvalidSignature("Assinatura Shopify inválida").into());
        }
    }

    let payload = parse_payload(&body)?;
    let topic = header_str(&headers, SHOPIFY_TOPIC_HEADER);
    let ack = shopify::ingest(&state.db, topic, &payload)
        .await
        .map_err(WebhookError::from)?;

    Ok(Json(ack))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_str_ignores_blank_values() {
        let mut headers = HeaderMap::new();
        headers.insert(SHOPIFY_TOPIC_HEADER, HeaderValue::from_static(" orders/create "));
        headers.insert(META_SIGNATURE_HEADER, HeaderValue::from_static("  "));

        assert_eq!(header_str(&headers, SHOPIFY_TOPIC_HEADER), Some("orders/create"));
        assert_eq!(header_str(&headers, META_SIGNATURE_HEADER), None);
        assert_eq!(header_str(&headers, SHOPIFY_SIGNATURE_HEADER), None);
    }

    #[test]
    fn test_parse_payload_rejects_invalid_json() {
        assert!(parse_payload(&Bytes::from_static(b"{\"object\":\"ad_account\"}")).is_ok());
        assert!(parse_payload(&Bytes::from_static(b"not json")).is_err());
    }

    #[test]
    fn test_blank_secret_counts_as_unset() {
        assert_eq!(configured(&Some(String::new())), None);
        assert_eq!(configured(&Some("s3cret".to_string())), Some("s3cret"));
        assert_eq!(configured(&None), None);
    }
}
