/// Rule-based sales insights
///
/// Produces a short list of cards from the sales in a period: average ticket,
/// peak hour, top product and week-over-week growth.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use super::aggregation::SalesAggregates;
use super::money::round_currency;
use super::period::Window;

/// Kind of insight card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Info,
    Metric,
    Peak,
    Product,
    Growth,
    Alert,
}

/// One insight card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

/// Growth comparison windows ending at `end`
///
/// Returns `(current, previous)` where current is the 7 days up to `end` and
/// previous is the 7 days before that, ending one millisecond before current.
pub fn comparison_windows(end: DateTime<Utc>) -> (Window, Window) {
    let split = end - Duration::days(7);
    (
        Window::new(split, end),
        Window::new(end - Duration::days(14), split - Duration::milliseconds(1)),
    )
}

/// Builds insight cards
///
/// `current_week` and `previous_week` are the sales totals of
/// [`comparison_windows`]. Growth is reported only when the previous week had
/// revenue.
pub fn build_insights(
    aggregates: &SalesAggregates,
    current_week: f64,
    previous_week: f64,
) -> Vec<Insight> {
    if aggregates.sales.is_empty() {
        return vec![Insight {
            kind: InsightKind::Info,
            title: "Sem dados no período".to_string(),
            description: "Não há vendas no intervalo selecionado. Ajuste as datas ou registre vendas."
                .to_string(),
            value: None,
            metadata: None,
        }];
    }

    let mut insights = Vec::with_capacity(4);
    let count = aggregates.sales.len();

    insights.push(Insight {
        kind: InsightKind::Metric,
        title: "Ticket médio".to_string(),
        description: "Valor médio por venda no período".to_string(),
        value: Some(json!(format!("{:.2}", aggregates.total / count as f64))),
        metadata: Some(json!({ "total": aggregates.total, "count": count })),
    });

    let (hour, revenue) = peak_hour(aggregates);
    insights.push(Insight {
        kind: InsightKind::Peak,
        title: "Horário de pico".to_string(),
        description: format!("Maior volume de vendas às {:02}:00", hour),
        value: Some(json!(hour)),
        metadata: Some(json!({ "revenue": revenue })),
    });

    if let Some((name, totals)) = aggregates.top_product() {
        insights.push(Insight {
            kind: InsightKind::Product,
            title: "Produto com maior faturamento".to_string(),
            description: format!("{} liderou em valor no período", name),
            value: Some(json!(name)),
            metadata: Some(json!({ "total": totals.total, "count": totals.count })),
        });
    }

    if previous_week > 0.0 {
        let growth = (current_week - previous_week) / previous_week * 100.0;
        let up = growth >= 0.0;

        insights.push(Insight {
            kind: if up { InsightKind::Growth } else { InsightKind::Alert },
            title: if up {
                "Crescimento vs semana anterior"
            } else {
                "Queda vs semana anterior"
            }
            .to_string(),
            description: format!("{:+.1}% em relação à semana anterior", growth),
            value: Some(json!(format!("{:+.1}%", growth))),
            metadata: Some(json!({
                "current": round_currency(current_week),
                "previous": round_currency(previous_week),
            })),
        });
    }

    insights
}

/// UTC hour with the most revenue; ties go to the earliest hour
fn peak_hour(aggregates: &SalesAggregates) -> (u32, f64) {
    let mut by_hour = [0.0_f64; 24];
    for sale in &aggregates.sales {
        by_hour[sale.occurred_at.hour() as usize] += sale.amount;
    }

    let mut peak = 0;
    for hour in 1..24 {
        if by_hour[hour] > by_hour[peak] {
            peak = hour;
        }
    }

    (peak as u32, round_currency(by_hour[peak]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregation::fixtures::sale;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, h, 15, 0).unwrap()
    }

    #[test]
    fn test_no_sales_gives_single_info_card() {
        let insights = build_insights(&SalesAggregates::build(&[]), 0.0, 100.0);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Info);
        assert_eq!(insights[0].title, "Sem dados no período");
    }

    #[test]
    fn test_metric_peak_and_product_cards() {
        let agg = SalesAggregates::build(&[
            sale(30.0, Some("Produto A"), None, at(3, 14)),
            sale(10.0, Some("Produto B"), None, at(4, 9)),
            sale(20.0, Some("Produto A"), None, at(5, 14)),
        ]);

        let insights = build_insights(&agg, 0.0, 0.0);
        assert_eq!(insights.len(), 3);

        assert_eq!(insights[0].kind, InsightKind::Metric);
        assert_eq!(insights[0].value, Some(json!("20.00")));
        assert_eq!(insights[0].metadata, Some(json!({"total": 60.0, "count": 3})));

        assert_eq!(insights[1].kind, InsightKind::Peak);
        assert_eq!(insights[1].value, Some(json!(14)));
        assert_eq!(insights[1].description, "Maior volume de vendas às 14:00");

        assert_eq!(insights[2].kind, InsightKind::Product);
        assert_eq!(insights[2].value, Some(json!("Produto A")));
        assert_eq!(insights[2].description, "Produto A liderou em valor no período");
    }

    #[test]
    fn test_peak_hour_tie_picks_earliest() {
        let agg = SalesAggregates::build(&[
            sale(10.0, None, None, at(3, 18)),
            sale(10.0, None, None, at(3, 7)),
        ]);
        assert_eq!(peak_hour(&agg), (7, 10.0));
    }

    #[test]
    fn test_growth_and_alert() {
        let agg = SalesAggregates::build(&[sale(10.0, None, None, at(3, 10))]);

        let growth = build_insights(&agg, 150.0, 100.0);
        let card = growth.last().unwrap();
        assert_eq!(card.kind, InsightKind::Growth);
        assert_eq!(card.value, Some(json!("+50.0%")));
        assert_eq!(card.description, "+50.0% em relação à semana anterior");

        let alert = build_insights(&agg, 75.0, 100.0);
        let card = alert.last().unwrap();
        assert_eq!(card.kind, InsightKind::Alert);
        assert_eq!(card.title, "Queda vs semana anterior");
        assert_eq!(card.value, Some(json!("-25.0%")));
    }

    #[test]
    fn test_comparison_windows_do_not_overlap() {
        let end = at(20, 12);
        let (current, previous) = comparison_windows(end);

        assert_eq!(current.end, end);
        assert_eq!(current.start, end - Duration::days(7));
        assert_eq!(previous.start, end - Duration::days(14));
        assert!(previous.end < current.start);
    }

    #[test]
    fn test_insight_serializes_type_field() {
        let agg = SalesAggregates::build(&[]);
        let json = serde_json::to_value(&build_insights(&agg, 0.0, 0.0)[0]).unwrap();
        assert_eq!(json["type"], "info");
        assert!(json.get("value").is_none());
    }
}
