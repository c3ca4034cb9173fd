/// Dashboard metrics
///
/// `GET /api/dashboard/metrics` summarizes the user's primary company:
/// revenue is sales plus income transactions, expenses are expense
/// transactions plus ad spend. Users without a company get zeros.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use tallybook_shared::{
    auth::middleware::AuthContext,
    domain::aggregation::DashboardSummary,
    models::{ad_spend::AdSpend, company::Company, sale::Sale, transaction::FinancialTransaction, user::User},
};
use uuid::Uuid;

/// Summary for one company; zero when the company no longer exists
pub(crate) async fn company_summary(
    state: &AppState,
    company_id: Uuid,
) -> ApiResult<DashboardSummary> {
    if Company::find_by_id(&state.db, company_id).await?.is_none() {
        return Ok(DashboardSummary::zero(0));
    }

    let (sales, sums, ad_spend) = tokio::try_join!(
        Sale::sum_all(&state.db, company_id),
        FinancialTransaction::sums(&state.db, company_id),
        AdSpend::sum_all(&state.db, company_id),
    )?;

    Ok(DashboardSummary::compute(sales, &sums, ad_spend, 1))
}

pub async fn metrics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardSummary>> {
    let company_id = User::find_by_id(&state.db, auth.user_id)
        .await?
        .and_then(|user| user.company_id);

    let summary = match company_id {
        Some(company_id) => company_summary(&state, company_id).await?,
        None => DashboardSummary::zero(0),
    };

    Ok(Json(summary))
}
