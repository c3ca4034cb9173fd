/// Financial transaction model
///
/// Manually entered income and expense entries of a company.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE financial_transactions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
///     user_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     type VARCHAR(10) NOT NULL CHECK (type IN ('INCOME', 'EXPENSE')),
///     amount DOUBLE PRECISION NOT NULL CHECK (amount >= 0),
///     description VARCHAR(255) NOT NULL,
///     category VARCHAR(100),
///     occurred_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const TRANSACTION_COLUMNS: &str = "id, company_id, user_id, type, amount, description, category, occurred_at, created_at";

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// Converts type to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }

    /// Parses a type ignoring case (`income`, `EXPENSE`, ...)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Some(TransactionType::Income),
            "EXPENSE" => Some(TransactionType::Expense),
            _ => None,
        }
    }
}

/// A financial transaction
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTransaction {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,

    /// `INCOME` | `EXPENSE`
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,

    pub amount: f64,
    pub description: String,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl FinancialTransaction {
    /// Gets the parsed type
    pub fn get_type(&self) -> Option<TransactionType> {
        TransactionType::parse(&self.kind)
    }
}

/// Input for creating a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub kind: TransactionType,
    pub amount: f64,
    pub description: String,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Optional filters for listing transactions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub kind: Option<TransactionType>,
}

/// Raw sums over a company's transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, sqlx::FromRow)]
pub struct TransactionSums {
    pub income: f64,
    pub expense: f64,
    pub count: i64,
}

impl FinancialTransaction {
    /// Creates a new transaction
    pub async fn create(pool: &PgPool, data: CreateTransaction) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FinancialTransaction>(&format!(
            r#"
            INSERT INTO financial_transactions
                (company_id, user_id, type, amount, description, category, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(data.company_id)
        .bind(data.user_id)
        .bind(data.kind.as_str())
        .bind(data.amount)
        .bind(data.description.trim())
        .bind(data.category)
        .bind(data.occurred_at)
        .fetch_one(pool)
        .await
    }

    /// Lists a company's transactions matching the filter, newest first
    pub async fn list(
        pool: &PgPool,
        company_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FinancialTransaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM financial_transactions
            WHERE company_id = $1
              AND ($2::timestamptz IS NULL OR occurred_at >= $2)
              AND ($3::timestamptz IS NULL OR occurred_at <= $3)
              AND ($4::varchar IS NULL OR type = $4)
            ORDER BY occurred_at DESC
            "#
        ))
        .bind(company_id)
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.kind.map(|k| k.as_str()))
        .fetch_all(pool)
        .await
    }

    /// Latest `limit` transactions of a company
    pub async fn recent(
        pool: &PgPool,
        company_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FinancialTransaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM financial_transactions
            WHERE company_id = $1
            ORDER BY occurred_at DESC
            LIMIT $2
            "#
        ))
        .bind(company_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Income sum, expense sum and row count over all of a company's transactions
    pub async fn sums(pool: &PgPool, company_id: Uuid) -> Result<TransactionSums, sqlx::Error> {
        sqlx::query_as::<_, TransactionSums>(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE type = 'INCOME'), 0)::DOUBLE PRECISION AS income,
                COALESCE(SUM(amount) FILTER (WHERE type = 'EXPENSE'), 0)::DOUBLE PRECISION AS expense,
                COUNT(*) AS count
            FROM financial_transactions
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_one(pool)
        .await
    }
}
