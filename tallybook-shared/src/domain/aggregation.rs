/// Pure aggregation over ledger records
///
/// Everything here works on already-loaded rows or database sums. Every
/// monetary output is passed through [`round_currency`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::money::round_currency;
use crate::models::sale::Sale;
use crate::models::transaction::{FinancialTransaction, TransactionSums, TransactionType};

/// Product bucket name when a sale has neither product nor category
pub const UNNAMED_PRODUCT: &str = "Sem nome";

/// Category bucket name for uncategorized transactions
pub const UNCATEGORIZED: &str = "Sem categoria";

/// Income/expense totals for one company
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceTotals {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub transactions_count: i64,
}

impl FinanceTotals {
    /// Builds rounded totals from raw sums
    pub fn new(income: f64, expense: f64, transactions_count: i64) -> Self {
        Self {
            total_income: round_currency(income),
            total_expense: round_currency(expense),
            balance: round_currency(income - expense),
            transactions_count,
        }
    }

    /// Sums a slice of transactions in memory
    ///
    /// Rows with an unknown type are counted but contribute to neither side.
    pub fn summarize(transactions: &[FinancialTransaction]) -> Self {
        let (income, expense) =
            transactions
                .iter()
                .fold((0.0, 0.0), |(income, expense), tx| match tx.get_type() {
                    Some(TransactionType::Income) => (income + tx.amount, expense),
                    Some(TransactionType::Expense) => (income, expense + tx.amount),
                    None => (income, expense),
                });

        Self::new(income, expense, transactions.len() as i64)
    }
}

impl From<TransactionSums> for FinanceTotals {
    fn from(sums: TransactionSums) -> Self {
        Self::new(sums.income, sums.expense, sums.count)
    }
}

/// Per-category totals for the finance report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub count: i64,
}

/// Finance report: company totals plus a category breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceReport {
    #[serde(flatten)]
    pub totals: FinanceTotals,
    pub by_category: BTreeMap<String, CategoryTotals>,
}

impl FinanceReport {
    pub fn build(transactions: &[FinancialTransaction]) -> Self {
        let mut by_category: BTreeMap<String, CategoryTotals> = BTreeMap::new();

        for tx in transactions {
            let name = tx
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(UNCATEGORIZED);

            let bucket = by_category.entry(name.to_string()).or_default();
            bucket.count += 1;
            match tx.get_type() {
                Some(TransactionType::Income) => bucket.income += tx.amount,
                Some(TransactionType::Expense) => bucket.expense += tx.amount,
                None => {}
            }
        }

        for bucket in by_category.values_mut() {
            bucket.balance = round_currency(bucket.income - bucket.expense);
            bucket.income = round_currency(bucket.income);
            bucket.expense = round_currency(bucket.expense);
        }

        Self {
            totals: FinanceTotals::summarize(transactions),
            by_category,
        }
    }
}

/// Financial dashboard summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub revenue: f64,
    pub expenses: f64,
    pub profit: f64,
    pub cashflow: f64,
    pub company_count: i64,
}

impl DashboardSummary {
    /// Summary for a user without a company
    pub fn zero(company_count: i64) -> Self {
        Self {
            revenue: 0.0,
            expenses: 0.0,
            profit: 0.0,
            cashflow: 0.0,
            company_count,
        }
    }

    /// Revenue is sales plus income; expenses are expense transactions plus ad spend
    pub fn compute(sales: f64, sums: &TransactionSums, ad_spend: f64, company_count: i64) -> Self {
        let revenue = sales + sums.income;
        let expenses = sums.expense + ad_spend;
        let profit = revenue - expenses;

        Self {
            revenue: round_currency(revenue),
            expenses: round_currency(expenses),
            profit: round_currency(profit),
            cashflow: round_currency(profit),
            company_count,
        }
    }
}

/// Sale fields exposed by period aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSnapshot {
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
    pub product_name: Option<String>,
    pub category: Option<String>,
}

/// Count and revenue for one product bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProductTotals {
    pub count: i64,
    pub total: f64,
}

/// Sales in a period with total and per-product breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesAggregates {
    pub sales: Vec<SaleSnapshot>,
    pub total: f64,
    pub by_product: BTreeMap<String, ProductTotals>,
}

/// Bucket name for a sale: product name, then category, then [`UNNAMED_PRODUCT`]
pub fn product_key(sale: &Sale) -> &str {
    sale.product_name
        .as_deref()
        .or(sale.category.as_deref())
        .unwrap_or(UNNAMED_PRODUCT)
}

impl SalesAggregates {
    pub fn build(sales: &[Sale]) -> Self {
        let mut by_product: BTreeMap<String, ProductTotals> = BTreeMap::new();
        let mut total = 0.0;

        for sale in sales {
            total += sale.amount;
            let bucket = by_product.entry(product_key(sale).to_string()).or_default();
            bucket.count += 1;
            bucket.total += sale.amount;
        }

        for bucket in by_product.values_mut() {
            bucket.total = round_currency(bucket.total);
        }

        Self {
            sales: sales
                .iter()
                .map(|s| SaleSnapshot {
                    amount: s.amount,
                    occurred_at: s.occurred_at,
                    product_name: s.product_name.clone(),
                    category: s.category.clone(),
                })
                .collect(),
            total: round_currency(total),
            by_product,
        }
    }

    /// Product with the highest revenue; ties go to the first name in order
    pub fn top_product(&self) -> Option<(&str, ProductTotals)> {
        self.by_product
            .iter()
            .fold(None, |best: Option<(&str, ProductTotals)>, (name, totals)| match best {
                Some((_, b)) if b.total >= totals.total => best,
                _ => Some((name.as_str(), *totals)),
            })
    }
}

/// Sales totals for the UTC dashboard windows
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub today: f64,
    pub yesterday: f64,
    pub week: f64,
    pub month: f64,
    pub year: f64,
}

impl PeriodTotals {
    pub fn rounded(self) -> Self {
        Self {
            today: round_currency(self.today),
            yesterday: round_currency(self.yesterday),
            week: round_currency(self.week),
            month: round_currency(self.month),
            year: round_currency(self.year),
        }
    }
}
