/// Sale model and database operations
///
/// Sales are entered by hand (`manual`) or ingested from Shopify order webhooks
/// (`shopify`). Every query is scoped by `company_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sales (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
///     user_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     amount DOUBLE PRECISION NOT NULL CHECK (amount >= 0),
///     product_name VARCHAR(255),
///     category VARCHAR(100),
///     channel VARCHAR(20) NOT NULL DEFAULT 'manual',
///     occurred_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tallybook_shared::models::sale::{CreateSale, Sale, SaleChannel};
/// use chrono::{Duration, Utc};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, company_id: Uuid) -> Result<(), sqlx::Error> {
/// Sale::create(&pool, CreateSale {
///     company_id,
///     user_id: None,
///     amount: 150.5,
///     product_name: Some("Produto A".to_string()),
///     category: None,
///     channel: SaleChannel::Manual,
///     occurred_at: Utc::now(),
/// }).await?;
///
/// let now = Utc::now();
/// let recent = Sale::list_in_range(&pool, company_id, now - Duration::days(30), now).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const SALE_COLUMNS: &str = "id, company_id, user_id, amount, product_name, category, channel, occurred_at, created_at, updated_at";

/// Where a sale came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleChannel {
    Manual,
    Shopify,
}

impl SaleChannel {
    /// Converts channel to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleChannel::Manual => "manual",
            SaleChannel::Shopify => "shopify",
        }
    }

    /// Parses channel from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(SaleChannel::Manual),
            "shopify" => Some(SaleChannel::Shopify),
            _ => None,
        }
    }
}

/// A recorded sale
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub company_id: Uuid,

    /// User who entered it; None for webhook-ingested sales
    pub user_id: Option<Uuid>,

    pub amount: f64,
    pub product_name: Option<String>,
    pub category: Option<String>,

    /// `manual` | `shopify`
    pub channel: String,

    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Gets the parsed channel
    pub fn get_channel(&self) -> Option<SaleChannel> {
        SaleChannel::from_str(&self.channel)
    }
}

/// Input for creating a sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSale {
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub amount: f64,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub channel: SaleChannel,
    pub occurred_at: DateTime<Utc>,
}

/// Partial update of a sale; `None` keeps the current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSale {
    pub amount: Option<f64>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Creates a new sale
    pub async fn create(pool: &PgPool, data: CreateSale) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Sale>(&format!(
            r#"
            INSERT INTO sales (company_id, user_id, amount, product_name, category, channel, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SALE_COLUMNS}
            "#
        ))
        .bind(data.company_id)
        .bind(data.user_id)
        .bind(data.amount)
        .bind(data.product_name)
        .bind(data.category)
        .bind(data.channel.as_str())
        .bind(data.occurred_at)
        .fetch_one(pool)
        .await
    }

    /// Lists a company's sales with `start <= occurred_at <= end`, newest first
    pub async fn list_in_range(
        pool: &PgPool,
        company_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE company_id = $1 AND occurred_at >= $2 AND occurred_at <= $3
            ORDER BY occurred_at DESC
            "#
        ))
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    /// Lists a company's sales with optional bounds, unordered
    pub async fn list_between(
        pool: &PgPool,
        company_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE company_id = $1
              AND ($2::timestamptz IS NULL OR occurred_at >= $2)
              AND ($3::timestamptz IS NULL OR occurred_at <= $3)
            "#
        ))
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }

    /// Sums amounts with `start <= occurred_at <= end`
    pub async fn sum_in_range(
        pool: &PgPool,
        company_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, sqlx::Error> {
        let (total,): (f64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION
            FROM sales
            WHERE company_id = $1 AND occurred_at >= $2 AND occurred_at <= $3
            "#,
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }

    /// Sums all of a company's sales
    pub async fn sum_all(pool: &PgPool, company_id: Uuid) -> Result<f64, sqlx::Error> {
        let (total,): (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION FROM sales WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }

    /// Applies a partial update to a sale of this company
    ///
    /// # Returns
    ///
    /// The updated sale, or None if no sale with this id belongs to the company
    pub async fn update(
        pool: &PgPool,
        company_id: Uuid,
        id: Uuid,
        data: UpdateSale,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Sale>(&format!(
            r#"
            UPDATE sales
            SET amount = COALESCE($3, amount),
                product_name = COALESCE($4, product_name),
                category = COALESCE($5, category),
                occurred_at = COALESCE($6, occurred_at),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {SALE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(company_id)
        .bind(data.amount)
        .bind(data.product_name)
        .bind(data.category)
        .bind(data.occurred_at)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a sale of this company
    pub async fn delete(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
