/// Meta Ads spend events
///
/// Only `ad_account` objects are ingested. The first entry's account id is
/// mapped to a company through [`AccountCompanyMap`], configured from
/// `META_AD_ACCOUNT_TO_COMPANY` as a JSON object. Each `spend` change becomes
/// one [`AdSpend`] row with source `meta`.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tallybook_shared::webhooks::meta::{plan, AccountCompanyMap, MetaPlan};
///
/// let map = AccountCompanyMap::from_json(r#"{"act_1":"5b0e8f7c-3a9f-4c35-9d0a-0c1b2a3d4e5f"}"#);
/// let payload = json!({
///     "object": "ad_account",
///     "entry": [{"id": "act_1", "changes": [{"field": "spend", "value": {"ad_id": "9", "spend": "12.50"}}]}]
/// });
///
/// match plan(&payload, &map) {
///     MetaPlan::Insert(rows) => assert_eq!(rows[0].amount, 12.5),
///     MetaPlan::Skip(ack) => panic!("{:?}", ack),
/// }
/// ```

use std::collections::HashMap;

use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{parse_amount, parse_company_id, WebhookAck};
use crate::models::ad_spend::{AdSpend, CreateAdSpend};

pub const SKIP_NOT_AD_ACCOUNT: &str = "Objeto não é ad_account";
pub const SKIP_NO_CHANGES: &str = "Sem changes";
pub const SKIP_UNMAPPED: &str = "company_id não configurado para este webhook";

/// Ad account id to company id mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountCompanyMap(HashMap<String, Uuid>);

impl AccountCompanyMap {
    /// Parses a JSON object of `account_id -> company_id`
    ///
    /// Invalid JSON yields an empty map; entries whose value is not a UUID
    /// are dropped.
    pub fn from_json(raw: &str) -> Self {
        let parsed: HashMap<String, JsonValue> = match serde_json::from_str(raw) {
            Ok(map) => map,
            Err(e) => {
                if !raw.trim().is_empty() {
                    warn!(error = %e, "Invalid META_AD_ACCOUNT_TO_COMPANY mapping");
                }
                return Self::default();
            }
        };

        Self(
            parsed
                .into_iter()
                .filter_map(|(account, company)| {
                    let id = company.as_str().and_then(parse_company_id)?;
                    Some((account, id))
                })
                .collect(),
        )
    }

    pub fn company_for(&self, account_id: &str) -> Option<Uuid> {
        self.0.get(account_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What to do with a Meta payload
#[derive(Debug, Clone)]
pub enum MetaPlan {
    /// Rows to insert; may be empty when no change is a spend
    Insert(Vec<CreateAdSpend>),

    /// Acknowledge without writing
    Skip(WebhookAck),
}

/// Decides how to ingest a Meta payload
pub fn plan(payload: &JsonValue, accounts: &AccountCompanyMap) -> MetaPlan {
    if payload.get("object").and_then(JsonValue::as_str) != Some("ad_account") {
        return MetaPlan::Skip(WebhookAck::skipped(SKIP_NOT_AD_ACCOUNT));
    }

    let entry = payload
        .get("entry")
        .and_then(JsonValue::as_array)
        .and_then(|entries| entries.first());

    let changes = match entry
        .and_then(|e| e.get("changes"))
        .and_then(JsonValue::as_array)
    {
        Some(changes) if !changes.is_empty() => changes,
        _ => return MetaPlan::Skip(WebhookAck::skipped(SKIP_NO_CHANGES)),
    };

    let company_id = match entry
        .and_then(|e| e.get("id"))
        .and_then(account_id)
        .and_then(|id| accounts.company_for(&id))
    {
        Some(id) => id,
        None => return MetaPlan::Skip(WebhookAck::skipped(SKIP_UNMAPPED)),
    };

    let now = Utc::now();
    let rows = changes
        .iter()
        .filter(|change| change.get("field").and_then(JsonValue::as_str) == Some("spend"))
        .filter_map(|change| {
            let value = change.get("value")?;
            let spend = value.get("spend").filter(|s| !s.is_null())?;

            Some(CreateAdSpend {
                company_id,
                amount: parse_amount(Some(spend)),
                spent_at: now,
                source: "meta".to_string(),
                metadata: json!({
                    "adId": value.get("ad_id").cloned().unwrap_or(JsonValue::Null),
                    "raw": change,
                }),
            })
        })
        .collect();

    MetaPlan::Insert(rows)
}

/// Account ids arrive as strings, occasionally as numbers
fn account_id(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Plans and persists a Meta payload
///
/// All rows of one delivery are inserted in a single transaction, so a
/// retried delivery never finds half of its rows already stored.
///
/// # Errors
///
/// Returns `sqlx::Error` if an insert fails, for example when the mapped
/// company does not exist
pub async fn ingest(
    pool: &PgPool,
    payload: &JsonValue,
    accounts: &AccountCompanyMap,
) -> Result<WebhookAck, sqlx::Error> {
    let rows = match plan(payload, accounts) {
        MetaPlan::Skip(ack) => {
            info!(reason = ?ack.skipped, "Meta webhook skipped");
            return Ok(ack);
        }
        MetaPlan::Insert(rows) => rows,
    };

    let count = rows.len();
    let mut tx = pool.begin().await?;
    for row in rows {
        AdSpend::create(&mut *tx, row).await?;
    }
    tx.commit().await?;

    info!(ad_spends = count, "Meta webhook synced");
    Ok(WebhookAck::synced())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPANY: &str = "5b0e8f7c-3a9f-4c35-9d0a-0c1b2a3d4e5f";

    fn accounts() -> AccountCompanyMap {
        AccountCompanyMap::from_json(&format!(r#"{{"act_1":"{}","act_2":"not-a-uuid"}}"#, COMPANY))
    }

    fn skipped(plan: MetaPlan) -> Option<String> {
        match plan {
            MetaPlan::Skip(ack) => ack.skipped,
            MetaPlan::Insert(_) => None,
        }
    }

    #[test]
    fn test_mapping_parsing() {
        let map = accounts();
        assert_eq!(map.company_for("act_1"), Some(Uuid::parse_str(COMPANY).unwrap()));
        assert_eq!(map.company_for("act_2"), None);
        assert!(AccountCompanyMap::from_json("not json").is_empty());
        assert!(AccountCompanyMap::from_json("").is_empty());
    }

    #[test]
    fn test_skips_non_ad_account_objects() {
        let payload = json!({"object": "page", "entry": []});
        assert_eq!(skipped(plan(&payload, &accounts())).as_deref(), Some(SKIP_NOT_AD_ACCOUNT));
    }

    #[test]
    fn test_skips_without_changes() {
        let payload = json!({"object": "ad_account", "entry": [{"id": "act_1", "changes": []}]});
        assert_eq!(skipped(plan(&payload, &accounts())).as_deref(), Some(SKIP_NO_CHANGES));

        let payload = json!({"object": "ad_account"});
        assert_eq!(skipped(plan(&payload, &accounts())).as_deref(), Some(SKIP_NO_CHANGES));
    }

    #[test]
    fn test_skips_unmapped_accounts() {
        for id in ["act_9", "act_2"] {
            let payload = json!({
                "object": "ad_account",
                "entry": [{"id": id, "changes": [{"field": "spend", "value": {"spend": "1"}}]}]
            });
            assert_eq!(skipped(plan(&payload, &accounts())).as_deref(), Some(SKIP_UNMAPPED));
        }
    }

    #[test]
    fn test_only_spend_changes_with_value_become_rows() {
        let payload = json!({
            "object": "ad_account",
            "entry": [{"id": "act_1", "changes": [
                {"field": "spend", "value": {"ad_id": "42", "spend": "19.90"}},
                {"field": "spend", "value": {"ad_id": "43", "spend": null}},
                {"field": "budget", "value": {"spend": "5"}},
                {"field": "spend", "value": {"spend": "oops"}}
            ]}]
        });

        let MetaPlan::Insert(rows) = plan(&payload, &accounts()) else {
            panic!("expected rows");
        };

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, 19.9);
        assert_eq!(rows[0].source, "meta");
        assert_eq!(rows[0].metadata["adId"], "42");
        assert_eq!(rows[0].metadata["raw"]["field"], "spend");
        assert_eq!(rows[1].amount, 0.0);
        assert!(rows[1].metadata["adId"].is_null());
    }
}
