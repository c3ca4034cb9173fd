//! # Demo data seeder
//!
//! Creates the `empresa-demo` company, its admin user and three sample sales
//! (today, yesterday, three days ago) so the dashboard shows data right away.
//! Running it again leaves existing rows untouched.
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/tallybook cargo run -p tallybook-api --bin seed
//! ```

use anyhow::Context;
use chrono::{Duration, Utc};
use tallybook_shared::{
    auth::password::hash_password,
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    domain::period::start_of_day,
    models::{
        company::{Company, CreateCompany},
        sale::{CreateSale, Sale, SaleChannel},
        user::{CreateUser, User},
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_SLUG: &str = "empresa-demo";
const DEMO_EMAIL: &str = "admin@empresa-demo.com";
const DEMO_PASSWORD: &str = "senha123";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,tallybook_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    ensure_database_exists(&url).await?;

    let pool = create_pool(DatabaseConfig {
        url,
        max_connections: 2,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let company = match Company::find_by_slug(&pool, DEMO_SLUG).await? {
        Some(company) => company,
        None => {
            Company::create(
                &pool,
                CreateCompany {
                    name: "Empresa Demo".to_string(),
                    slug: DEMO_SLUG.to_string(),
                    ..Default::default()
                },
            )
            .await?
        }
    };

    let user = match User::find_by_email(&pool, DEMO_EMAIL).await? {
        Some(user) => user,
        None => {
            let user = User::create(
                &pool,
                CreateUser {
                    email: DEMO_EMAIL.to_string(),
                    password_hash: hash_password(DEMO_PASSWORD)?,
                    name: "Admin Demo".to_string(),
                },
            )
            .await?;
            User::set_company(&pool, user.id, company.id).await?;
            user
        }
    };

    let existing = Sale::list_between(&pool, company.id, None, None).await?;
    if existing.is_empty() {
        let today = start_of_day(Utc::now());
        let samples = [
            (150.5, "Produto A", None, today),
            (89.0, "Produto B", None, today - Duration::days(1)),
            (320.0, "Produto C", Some("E-commerce"), today - Duration::days(3)),
        ];

        for (amount, product, category, occurred_at) in samples {
            Sale::create(
                &pool,
                CreateSale {
                    company_id: company.id,
                    user_id: Some(user.id),
                    amount,
                    product_name: Some(product.to_string()),
                    category: category.map(str::to_string),
                    channel: SaleChannel::Manual,
                    occurred_at,
                },
            )
            .await?;
        }
        tracing::info!(count = samples.len(), "Sample sales created");
    } else {
        tracing::info!(count = existing.len(), "Company already has sales, skipping samples");
    }

    tracing::info!(
        company_id = %company.id,
        user_id = %user.id,
        email = DEMO_EMAIL,
        "Seed complete"
    );

    close_pool(pool).await;
    Ok(())
}
