/// Company data rendered as prompt context
///
/// Both builders are pure: callers load the company, sales aggregates,
/// insights and transactions, then render them here.

use serde_json::{json, Value as JsonValue};

use crate::domain::aggregation::{FinanceTotals, SalesAggregates};
use crate::domain::insights::Insight;
use crate::models::company::{Company, DEFAULT_CURRENCY, DEFAULT_TIMEZONE};
use crate::models::transaction::FinancialTransaction;

/// Number of recent transactions included in finance chat context
pub const RECENT_TRANSACTIONS: i64 = 5;

/// Context for the business chat: company, three-month sales and insights,
/// ending with the user's question
pub fn company_context(
    company: Option<&Company>,
    aggregates: &SalesAggregates,
    insights: &[Insight],
    question: &str,
) -> String {
    let mut parts: Vec<String> = vec![
        "## Empresa".to_string(),
        format!("Nome: {}", company.map(|c| c.name.as_str()).unwrap_or("N/A")),
        format!(
            "Moeda: {}",
            company.map(|c| c.currency.as_str()).unwrap_or(DEFAULT_CURRENCY)
        ),
        format!(
            "Timezone: {}",
            company.map(|c| c.timezone.as_str()).unwrap_or(DEFAULT_TIMEZONE)
        ),
        "\n## Resumo de vendas (últimos 3 meses)".to_string(),
        format!("Total de vendas: {}", aggregates.sales.len()),
        format!("Faturamento total: {:.2}", aggregates.total),
    ];

    if !aggregates.by_product.is_empty() {
        parts.push("Por produto:".to_string());
        for (name, totals) in &aggregates.by_product {
            parts.push(format!("  - {}: {} un., R$ {:.2}", name, totals.count, totals.total));
        }
    }

    parts.push("\n## Insights estratégicos".to_string());
    for insight in insights {
        parts.push(format!("- {}: {}", insight.title, insight.description));
        if let Some(value) = &insight.value {
            parts.push(format!("  Valor: {}", display_value(value)));
        }
    }

    parts.push("\n---".to_string());
    parts.push(format!("Pergunta do usuário: {}", question));

    parts.join("\n")
}

/// Context for the finance chat: totals plus the latest transactions
pub fn finance_context(
    company: &Company,
    totals: &FinanceTotals,
    recent: &[FinancialTransaction],
) -> String {
    let recent: Vec<JsonValue> = recent
        .iter()
        .map(|tx| {
            json!({
                "type": tx.kind,
                "amount": tx.amount,
                "description": tx.description,
                "occurredAt": tx.occurred_at,
            })
        })
        .collect();

    [
        format!("Empresa: {}", company.name),
        format!("Moeda: {}", company.currency),
        format!("Total receitas: {}", totals.total_income),
        format!("Total despesas: {}", totals.total_expense),
        format!("Saldo: {}", totals.balance),
        format!("Quantidade de transacoes: {}", totals.transactions_count),
        format!("Ultimas transacoes: {}", JsonValue::Array(recent)),
    ]
    .join("\n")
}

/// Strings render without JSON quotes
fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
