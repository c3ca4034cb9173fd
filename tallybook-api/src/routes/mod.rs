/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Register, login, refresh, logout, current user
/// - `profile`: Profile, password change, account deletion
/// - `companies`: Company listing and creation
/// - `sales`: Sales CRUD and aggregates
/// - `finance`: Income/expense transactions, summary, report
/// - `dashboard`: Dashboard metrics
/// - `insights`: Sales insight cards
/// - `export`: CSV export
/// - `ai`: Chat and analysis
/// - `webhooks`: Meta and Shopify ingestion

pub mod ai;
pub mod auth;
pub mod companies;
pub mod dashboard;
pub mod export;
pub mod finance;
pub mod health;
pub mod insights;
pub mod profile;
pub mod sales;
pub mod webhooks;

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tallybook_shared::domain::period::parse_instant;

/// `?start=&end=` query; values are ISO 8601 instants or `YYYY-MM-DD`
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl PeriodQuery {
    /// Parses both bounds; blank values count as absent
    pub fn bounds(&self) -> ApiResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        Ok((
            parse_bound("start", self.start.as_deref())?,
            parse_bound("end", self.end.as_deref())?,
        ))
    }
}

/// Parses an optional date parameter, rejecting malformed values with 400
pub(crate) fn parse_bound(field: &str, raw: Option<&str>) -> ApiResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(value) => parse_instant(value)
            .map(Some)
            .ok_or_else(|| ApiError::invalid_field(field, &format!("{} invalido", field))),
    }
}
