/// Sales endpoints for the active company
///
/// - `POST /api/sales` - Record a manual sale
/// - `GET /api/sales?start&end` - Sales in a period (default last 30 days), newest first
/// - `PATCH /api/sales/:id` - Partial update
/// - `DELETE /api/sales/:id`
/// - `GET /api/sales/aggregates` - Period breakdown with `start` and `end`,
///   otherwise today/yesterday/week/month/year totals

use super::{parse_bound, PeriodQuery};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    middleware::tenant::ActiveCompany,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tallybook_shared::{
    auth::middleware::AuthContext,
    domain::{
        aggregation::{PeriodTotals, SalesAggregates},
        period::{dashboard_windows, days_back, resolve_range},
    },
    models::sale::{CreateSale, Sale, SaleChannel, UpdateSale},
};
use uuid::Uuid;
use validator::Validate;

const SALE_NOT_FOUND: &str = "Venda nao encontrada";

/// Default listing window
pub const DEFAULT_LIST_DAYS: i64 = 30;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateSaleRequest {
    #[validate(range(min = 0.01, message = "O valor deve ser maior que zero"))]
    pub amount: f64,

    #[validate(length(max = 255, message = "Nome do produto muito longo"))]
    pub product_name: Option<String>,

    #[validate(length(max = 100, message = "Categoria muito longa"))]
    pub category: Option<String>,

    /// ISO 8601
    pub occurred_at: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateSaleRequest {
    #[validate(range(min = 0.01, message = "O valor deve ser maior que zero"))]
    pub amount: Option<f64>,

    #[validate(length(max = 255, message = "Nome do produto muito longo"))]
    pub product_name: Option<String>,

    #[validate(length(max = 100, message = "Categoria muito longa"))]
    pub category: Option<String>,

    pub occurred_at: Option<String>,
}

/// Aggregates response: explicit period or dashboard windows
#[derive(Debug, serde::Serialize)]
#[serde(untagged)]
pub enum AggregatesResponse {
    Period(SalesAggregates),
    Windows(PeriodTotals),
}

pub async fn create_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    ApiJson(req): ApiJson<CreateSaleRequest>,
) -> ApiResult<(StatusCode, Json<Sale>)> {
    req.validate()?;

    let occurred_at = parse_bound("occurredAt", Some(&req.occurred_at))?
        .ok_or_else(|| ApiError::invalid_field("occurredAt", "Data da venda inválida"))?;

    let sale = Sale::create(
        &state.db,
        CreateSale {
            company_id,
            user_id: Some(auth.user_id),
            amount: req.amount,
            product_name: req.product_name,
            category: req.category,
            channel: SaleChannel::Manual,
            occurred_at,
        },
    )
    .await?;

    tracing::info!(sale_id = %sale.id, company_id = %company_id, amount = sale.amount, "Sale recorded");

    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn list_sales(
    State(state): State<AppState>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let (start, end) = query.bounds()?;
    let window = resolve_range(start, end, days_back(Utc::now(), DEFAULT_LIST_DAYS));

    let sales = Sale::list_in_range(&state.db, company_id, window.start, window.end).await?;
    Ok(Json(sales))
}

pub async fn update_sale(
    State(state): State<AppState>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateSaleRequest>,
) -> ApiResult<Json<Sale>> {
    req.validate()?;

    let occurred_at = match req.occurred_at.as_deref() {
        None => None,
        Some(raw) => Some(
            parse_bound("occurredAt", Some(raw))?
                .ok_or_else(|| ApiError::invalid_field("occurredAt", "Data da venda invalida"))?,
        ),
    };

    let sale = Sale::update(
        &state.db,
        company_id,
        id,
        UpdateSale {
            amount: req.amount,
            product_name: req.product_name,
            category: req.category,
            occurred_at,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(SALE_NOT_FOUND.to_string()))?;

    Ok(Json(sale))
}

pub async fn delete_sale(
    State(state): State<AppState>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JsonValue>> {
    if !Sale::delete(&state.db, company_id, id).await? {
        return Err(ApiError::NotFound(SALE_NOT_FOUND.to_string()));
    }

    tracing::info!(sale_id = %id, company_id = %company_id, "Sale deleted");

    Ok(Json(json!({ "deleted": true })))
}

pub async fn aggregates(
    State(state): State<AppState>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<AggregatesResponse>> {
    if let (Some(start), Some(end)) = query.bounds()? {
        let sales = Sale::list_in_range(&state.db, company_id, start, end).await?;
        return Ok(Json(AggregatesResponse::Period(SalesAggregates::build(&sales))));
    }

    let windows = dashboard_windows(Utc::now());
    let (today, yesterday, week, month, year) = tokio::try_join!(
        Sale::sum_in_range(&state.db, company_id, windows.today.start, windows.today.end),
        Sale::sum_in_range(&state.db, company_id, windows.yesterday.start, windows.yesterday.end),
        Sale::sum_in_range(&state.db, company_id, windows.week.start, windows.week.end),
        Sale::sum_in_range(&state.db, company_id, windows.month.start, windows.month.end),
        Sale::sum_in_range(&state.db, company_id, windows.year.start, windows.year.end),
    )?;

    Ok(Json(AggregatesResponse::Windows(
        PeriodTotals {
            today,
            yesterday,
            week,
            month,
            year,
        }
        .rounded(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sale_validation() {
        let req: CreateSaleRequest = serde_json::from_value(json!({
            "amount": 0,
            "productName": "Produto A",
            "occurredAt": "2025-03-01T10:00:00Z"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 1);

        let ok: CreateSaleRequest = serde_json::from_value(json!({
            "amount": 150.5,
            "occurredAt": "2025-03-01T10:00:00Z"
        }))
        .unwrap();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_update_sale_allows_empty_body() {
        let req: UpdateSaleRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.amount.is_none());
    }

    #[test]
    fn test_window_totals_serialize_flat() {
        let body = serde_json::to_value(AggregatesResponse::Windows(PeriodTotals {
            today: 150.5,
            ..Default::default()
        }))
        .unwrap();

        assert_eq!(body["today"], 150.5);
        assert_eq!(body["year"], 0.0);
    }
}
