/// Financial CSV export
///
/// Transactions, sales and ad spend are flattened into one row shape, sorted
/// ascending by date and written as CSV. Fields containing a quote, comma or
/// newline are quoted with internal quotes doubled.
///
/// # Example
///
/// ```
/// use tallybook_shared::domain::export::{to_csv, CSV_HEADER};
///
/// assert_eq!(to_csv(&[]), format!("{}\n", CSV_HEADER));
/// ```

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::models::ad_spend::AdSpend;
use crate::models::sale::Sale;
use crate::models::transaction::{FinancialTransaction, TransactionType};

pub const CSV_HEADER: &str = "date,source,type,description,category,amount";

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Origin table of an export row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSource {
    FinancialTransaction,
    Sale,
    AdSpend,
}

impl RowSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowSource::FinancialTransaction => "financial_transaction",
            RowSource::Sale => "sale",
            RowSource::AdSpend => "ad_spend",
        }
    }
}

/// One flattened ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub date: DateTime<Utc>,
    pub source: RowSource,
    pub kind: TransactionType,
    pub description: String,
    pub category: String,
    pub amount: f64,
}

impl From<&FinancialTransaction> for ExportRow {
    fn from(tx: &FinancialTransaction) -> Self {
        Self {
            date: tx.occurred_at,
            source: RowSource::FinancialTransaction,
            kind: tx.get_type().unwrap_or(TransactionType::Expense),
            description: tx.description.clone(),
            category: tx.category.clone().unwrap_or_default(),
            amount: tx.amount,
        }
    }
}

impl From<&Sale> for ExportRow {
    fn from(sale: &Sale) -> Self {
        Self {
            date: sale.occurred_at,
            source: RowSource::Sale,
            kind: TransactionType::Income,
            description: sale
                .product_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Venda".to_string()),
            category: sale.category.clone().unwrap_or_default(),
            amount: sale.amount,
        }
    }
}

impl From<&AdSpend> for ExportRow {
    fn from(spend: &AdSpend) -> Self {
        Self {
            date: spend.spent_at,
            source: RowSource::AdSpend,
            kind: TransactionType::Expense,
            description: format!("Gasto em {}", spend.source),
            category: "marketing".to_string(),
            amount: spend.amount,
        }
    }
}

/// Merges the three record kinds and sorts them ascending by date
///
/// The sort is stable: rows with equal dates keep transaction, sale, ad spend
/// order.
pub fn collect_rows(
    transactions: &[FinancialTransaction],
    sales: &[Sale],
    ad_spends: &[AdSpend],
) -> Vec<ExportRow> {
    let mut rows: Vec<ExportRow> = transactions
        .iter()
        .map(ExportRow::from)
        .chain(sales.iter().map(ExportRow::from))
        .chain(ad_spends.iter().map(ExportRow::from))
        .collect();

    rows.sort_by_key(|row| row.date);
    rows
}

/// Quotes a field if it contains `"`, `,`, `\n` or `\r`
pub fn escape_field(value: &str) -> String {
    if value.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Serializes rows to CSV
///
/// An empty export is the header plus a newline. Otherwise lines are joined
/// with `\n` without a trailing newline.
pub fn to_csv(rows: &[ExportRow]) -> String {
    if rows.is_empty() {
        return format!("{}\n", CSV_HEADER);
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADER.to_string());

    for row in rows {
        let fields = [
            row.date.to_rfc3339_opts(SecondsFormat::Millis, true),
            row.source.as_str().to_string(),
            row.kind.as_str().to_string(),
            row.description.clone(),
            row.category.clone(),
            format!("{:.2}", row.amount),
        ];

        lines.push(
            fields
                .iter()
                .map(|field| escape_field(field))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}

/// Attachment file name for an export produced on `date`
pub fn export_filename(date: NaiveDate) -> String {
    format!("financial-export-{}.csv", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregation::fixtures::{ad_spend, sale, transaction};
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_every_record_becomes_one_sorted_row() {
        let txs = vec![
            transaction("INCOME", 100.0, "Consultoria", Some("servicos"), day(5)),
            transaction("EXPENSE", 40.0, "Aluguel", None, day(1)),
        ];
        let sales = vec![sale(50.0, None, Some("loja"), day(3))];
        let spends = vec![ad_spend(12.5, "meta", day(2))];

        let rows = collect_rows(&txs, &sales, &spends);
        assert_eq!(rows.len(), 4);
        assert!(rows.windows(2).all(|w| w[0].date <= w[1].date));

        assert_eq!(rows[0].description, "Aluguel");
        assert_eq!(rows[1].source, RowSource::AdSpend);
        assert_eq!(rows[1].description, "Gasto em meta");
        assert_eq!(rows[1].category, "marketing");
        assert_eq!(rows[2].description, "Venda");
        assert_eq!(rows[2].kind, TransactionType::Income);
    }

    #[test]
    fn test_csv_layout() {
        let rows = collect_rows(
            &[transaction("INCOME", 10.0, "Venda balcao", None, day(1))],
            &[],
            &[ad_spend(12.5, "meta", day(2))],
        );

        let csv = to_csv(&rows);
        let lines: Vec<&str> = csv.split('\n').collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "2025-03-01T09:30:00.000Z,financial_transaction,INCOME,Venda balcao,,10.00"
        );
        assert_eq!(
            lines[2],
            "2025-03-02T09:30:00.000Z,ad_spend,EXPENSE,Gasto em meta,marketing,12.50"
        );
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_fields_with_commas_and_quotes_are_quoted() {
        let rows = collect_rows(
            &[transaction("EXPENSE", 5.0, "Cafe, pao e \"leite\"", None, day(1))],
            &[],
            &[],
        );

        let csv = to_csv(&rows);
        assert!(csv.contains(",\"Cafe, pao e \"\"leite\"\"\","));
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_field("carriage\rreturn"), "\"carriage\rreturn\"");
        assert_eq!(escape_field("say \"oi\""), "\"say \"\"oi\"\"\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(export_filename(date), "financial-export-2025-03-07.csv");
    }
}
