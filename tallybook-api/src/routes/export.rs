/// CSV export
///
/// `GET /api/export/financial?start&end` merges transactions, sales and ad
/// spend of the user's primary company into one ledger sorted by date.
/// Users without a company get a header-only file.

use super::PeriodQuery;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use chrono::Utc;
use tallybook_shared::{
    auth::middleware::AuthContext,
    domain::export::{collect_rows, export_filename, to_csv, CSV_CONTENT_TYPE},
    models::{
        ad_spend::AdSpend,
        sale::Sale,
        transaction::{FinancialTransaction, TransactionFilter},
        user::User,
    },
};

pub async fn export_financial(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Response> {
    let (start, end) = query.bounds()?;

    let company_id = User::find_by_id(&state.db, auth.user_id)
        .await?
        .and_then(|user| user.company_id);

    let rows = match company_id {
        Some(company_id) => {
            let filter = TransactionFilter {
                start,
                end,
                kind: None,
            };
            let (transactions, sales, spends) = tokio::try_join!(
                FinancialTransaction::list(&state.db, company_id, &filter),
                Sale::list_between(&state.db, company_id, start, end),
                AdSpend::list_between(&state.db, company_id, start, end),
            )?;

            tracing::debug!(
                company_id = %company_id,
                transactions = transactions.len(),
                sales = sales.len(),
                ad_spends = spends.len(),
                "Building financial export"
            );

            collect_rows(&transactions, &sales, &spends)
        }
        None => Vec::new(),
    };

    let filename = export_filename(Utc::now().date_naive());
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(CSV_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        to_csv(&rows),
    )
        .into_response())
}
