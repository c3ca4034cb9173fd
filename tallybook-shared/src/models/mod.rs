/// Database models for Tallybook
///
/// Each model is a `sqlx::FromRow` struct with static async methods taking a
/// pool (or any executor, where the call has to join a transaction).
///
/// # Models
///
/// - `user`: User accounts, plan and AI detail preference
/// - `company`: Companies (tenants)
/// - `refresh_token`: Hashed refresh-token records
/// - `sale`: Manual and Shopify sales
/// - `transaction`: Income/expense entries
/// - `ad_spend`: Advertising spend from Meta
/// - `chat_message`: AI conversation log
/// - `analysis`: Persisted AI analyses
///
/// # Example
///
/// ```no_run
/// use tallybook_shared::models::company::{Company, CreateCompany};
/// use tallybook_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let company = Company::create(&pool, CreateCompany {
///     name: "Acme".to_string(),
///     slug: "acme".to_string(),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod ad_spend;
pub mod analysis;
pub mod chat_message;
pub mod company;
pub mod refresh_token;
pub mod sale;
pub mod transaction;
pub mod user;
