/// Insight cards for the active company
///
/// `GET /api/insights?start&end` (default: the last month up to now).

use super::PeriodQuery;
use crate::{app::AppState, error::ApiResult, middleware::tenant::ActiveCompany};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use tallybook_shared::{
    domain::{
        aggregation::SalesAggregates,
        insights::{build_insights, comparison_windows, Insight},
        period::{months_back, resolve_range},
    },
    models::sale::Sale,
};

pub async fn list_insights(
    State(state): State<AppState>,
    Extension(ActiveCompany(company_id)): Extension<ActiveCompany>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<Vec<Insight>>> {
    let (start, end) = query.bounds()?;
    let period = resolve_range(start, end, months_back(Utc::now(), 1));
    let (current, previous) = comparison_windows(period.end);

    let (sales, current_week, previous_week) = tokio::try_join!(
        Sale::list_in_range(&state.db, company_id, period.start, period.end),
        Sale::sum_in_range(&state.db, company_id, current.start, current.end),
        Sale::sum_in_range(&state.db, company_id, previous.start, previous.end),
    )?;

    let aggregates = SalesAggregates::build(&sales);
    Ok(Json(build_insights(&aggregates, current_week, previous_week)))
}
