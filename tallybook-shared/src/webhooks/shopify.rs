/// Shopify order events
///
/// `orders/create` and `orders/updated` (or events without a topic) become a
/// [`Sale`] on the `shopify` channel. The company comes from the order's
/// `note_attributes` entry named `company_id`.

use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::info;

use super::{parse_amount, parse_company_id, WebhookAck};
use crate::domain::period::parse_instant;
use crate::models::sale::{CreateSale, Sale, SaleChannel};

pub const SKIP_NO_COMPANY: &str = "company_id não encontrado no pedido";

/// Product name for orders without line items
pub const DEFAULT_PRODUCT: &str = "Pedido Shopify";

const SYNCED_TOPICS: [&str; 2] = ["orders/create", "orders/updated"];

/// What to do with a Shopify payload
#[derive(Debug, Clone)]
pub enum ShopifyPlan {
    Insert(CreateSale),
    Skip(WebhookAck),
}

/// Topic from the `X-Shopify-Topic` header, else from the payload
pub fn resolve_topic(header: Option<&str>, payload: &JsonValue) -> Option<String> {
    header
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| {
            payload
                .get("topic")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
        })
}

/// Decides how to ingest a Shopify payload
pub fn plan(topic: Option<&str>, payload: &JsonValue) -> ShopifyPlan {
    if let Some(topic) = topic {
        if !SYNCED_TOPICS.contains(&topic) {
            return ShopifyPlan::Skip(WebhookAck::ignored(topic));
        }
    }

    let order = payload.get("order").filter(|o| o.is_object()).unwrap_or(payload);

    let company_id = order
        .get("note_attributes")
        .and_then(JsonValue::as_array)
        .and_then(|attrs| {
            attrs
                .iter()
                .find(|a| a.get("name").and_then(JsonValue::as_str) == Some("company_id"))
        })
        .and_then(|a| a.get("value"))
        .and_then(JsonValue::as_str)
        .and_then(parse_company_id);

    let Some(company_id) = company_id else {
        return ShopifyPlan::Skip(WebhookAck::skipped(SKIP_NO_COMPANY));
    };

    let product_name = order
        .get("line_items")
        .and_then(JsonValue::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("title"))
        .and_then(JsonValue::as_str)
        .unwrap_or(DEFAULT_PRODUCT)
        .to_string();

    let occurred_at = order
        .get("created_at")
        .and_then(JsonValue::as_str)
        .and_then(parse_instant)
        .unwrap_or_else(Utc::now);

    ShopifyPlan::Insert(CreateSale {
        company_id,
        user_id: None,
        amount: parse_amount(order.get("total_price")),
        product_name: Some(product_name),
        category: None,
        channel: SaleChannel::Shopify,
        occurred_at,
    })
}

/// Plans and persists a Shopify payload
pub async fn ingest(
    pool: &PgPool,
    topic: Option<&str>,
    payload: &JsonValue,
) -> Result<WebhookAck, sqlx::Error> {
    match plan(topic, payload) {
        ShopifyPlan::Skip(ack) => {
            info!(topic = ?topic, reason = ?ack.skipped, "Shopify webhook not synced");
            Ok(ack)
        }
        ShopifyPlan::Insert(sale) => {
            let sale = Sale::create(pool, sale).await?;
            info!(sale_id = %sale.id, company_id = %sale.company_id, "Shopify order synced");
            Ok(WebhookAck::synced())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use uuid::Uuid;

    const COMPANY: &str = "5b0e8f7c-3a9f-4c35-9d0a-0c1b2a3d4e5f";

    fn order() -> JsonValue {
        json!({
            "id": 1001,
            "total_price": "249.90",
            "created_at": "2025-03-01T10:00:00-03:00",
            "line_items": [{"title": "Camiseta", "quantity": 2}, {"title": "Bone"}],
            "note_attributes": [
                {"name": "gift", "value": "no"},
                {"name": "company_id", "value": COMPANY}
            ]
        })
    }

    #[test]
    fn test_order_becomes_shopify_sale() {
        let ShopifyPlan::Insert(sale) = plan(Some("orders/create"), &order()) else {
            panic!("expected sale");
        };

        assert_eq!(sale.company_id, Uuid::parse_str(COMPANY).unwrap());
        assert_eq!(sale.amount, 249.9);
        assert_eq!(sale.product_name.as_deref(), Some("Camiseta"));
        assert_eq!(sale.channel, SaleChannel::Shopify);
        assert_eq!(sale.occurred_at, Utc.with_ymd_and_hms(2025, 3, 1, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_nested_order_and_missing_topic() {
        let payload = json!({"order": order()});
        assert!(matches!(plan(None, &payload), ShopifyPlan::Insert(_)));
    }

    #[test]
    fn test_defaults_for_sparse_orders() {
        let payload = json!({
            "note_attributes": [{"name": "company_id", "value": COMPANY}]
        });

        let ShopifyPlan::Insert(sale) = plan(Some("orders/updated"), &payload) else {
            panic!("expected sale");
        };
        assert_eq!(sale.amount, 0.0);
        assert_eq!(sale.product_name.as_deref(), Some(DEFAULT_PRODUCT));
    }

    #[test]
    fn test_other_topics_are_ignored() {
        let ShopifyPlan::Skip(ack) = plan(Some("products/create"), &order()) else {
            panic!("expected skip");
        };
        assert_eq!(ack.topic.as_deref(), Some("products/create"));
        assert!(!ack.is_synced());
    }

    #[test]
    fn test_missing_company_is_skipped() {
        let payload = json!({"total_price": "10.00"});
        let ShopifyPlan::Skip(ack) = plan(None, &payload) else {
            panic!("expected skip");
        };
        assert_eq!(ack.skipped.as_deref(), Some(SKIP_NO_COMPANY));

        let payload = json!({"note_attributes": [{"name": "company_id", "value": "abc"}]});
        assert!(matches!(plan(None, &payload), ShopifyPlan::Skip(_)));
    }

    #[test]
    fn test_resolve_topic() {
        let payload = json!({"topic": "orders/updated"});
        assert_eq!(resolve_topic(Some("orders/create"), &payload).as_deref(), Some("orders/create"));
        assert_eq!(resolve_topic(None, &payload).as_deref(), Some("orders/updated"));
        assert_eq!(resolve_topic(Some(" "), &json!({})), None);
    }
}
