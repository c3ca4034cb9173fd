/// Inbound webhook ingestion
///
/// Each platform module turns a verified JSON payload into records to insert
/// and an acknowledgement for the caller. Unresolvable events are still
/// acknowledged, marked `skipped`, so the platform does not retry them.
///
/// # Modules
///
/// - [`signature`]: HMAC-SHA256 verification
/// - [`meta`]: Meta Ads spend events
/// - [`shopify`]: Shopify order events

pub mod meta;
pub mod shopify;
pub mod signature;

use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Error type for webhook ingestion
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Signature header present but wrong
    #[error("{0}")]
    InvalidSignature(&'static str),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Response body for an accepted webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    pub received: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl WebhookAck {
    pub fn synced() -> Self {
        Self {
            received: true,
            synced: Some(true),
            skipped: None,
            topic: None,
        }
    }

    pub fn skipped(reason: &str) -> Self {
        Self {
            received: true,
            synced: None,
            skipped: Some(reason.to_string()),
            topic: None,
        }
    }

    /// Event of a topic that is not ingested
    pub fn ignored(topic: &str) -> Self {
        Self {
            received: true,
            synced: None,
            skipped: None,
            topic: Some(topic.to_string()),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.synced == Some(true)
    }
}

/// Reads an amount sent either as a decimal string or a number
///
/// Unparseable values become `0.0`.
pub(crate) fn parse_amount(value: Option<&JsonValue>) -> f64 {
    let amount = match value {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };

    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

/// Parses a company id string, ignoring surrounding whitespace
pub(crate) fn parse_company_id(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ack_serialization() {
        assert_eq!(
            serde_json::to_value(WebhookAck::synced()).unwrap(),
            json!({"received": true, "synced": true})
        );
        assert_eq!(
            serde_json::to_value(WebhookAck::skipped("Sem changes")).unwrap(),
            json!({"received": true, "skipped": "Sem changes"})
        );
        assert_eq!(
            serde_json::to_value(WebhookAck::ignored("products/create")).unwrap(),
            json!({"received": true, "topic": "products/create"})
        );
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(Some(&json!("12.50"))), 12.5);
        assert_eq!(parse_amount(Some(&json!(7))), 7.0);
        assert_eq!(parse_amount(Some(&json!("abc"))), 0.0);
        assert_eq!(parse_amount(Some(&json!(null))), 0.0);
        assert_eq!(parse_amount(None), 0.0);
    }
}
