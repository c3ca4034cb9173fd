/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use tallybook_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = tallybook_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{
        auth::require_auth,
        rate_limit::{rate_limit_layer, RateLimiter},
        security::SecurityHeadersLayer,
        tenant::{active_company, tenant_scope},
    },
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tallybook_shared::{
    ai::{gemini::GeminiClient, openai::OpenAiClient, TextGenerator},
    auth::{
        store::PgCredentialStore,
        tokens::{TokenConfig, TokenService},
    },
    redis::RedisClient,
    webhooks::meta::AccountCompanyMap,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Token issuance and refresh rotation
    pub tokens: TokenService,

    /// Provider for `/ai/chat` and `/ai/analyze` (Gemini)
    pub business_ai: Option<Arc<dyn TextGenerator>>,

    /// Provider for `/chat` (OpenAI)
    pub finance_ai: Option<Arc<dyn TextGenerator>>,

    /// Meta ad account to company mapping
    pub meta_accounts: Arc<AccountCompanyMap>,

    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Creates new application state
    ///
    /// AI providers are enabled only when their API key is configured.
    pub fn new(db: PgPool, config: Config) -> Self {
        let tokens = TokenService::new(
            TokenConfig {
                access_secret: config.jwt.secret.clone(),
                refresh_secret: config.jwt.refresh_secret.clone(),
                access_expires_in: config.jwt.expires_in.clone(),
                refresh_expires_in: config.jwt.refresh_expires_in.clone(),
            },
            Arc::new(PgCredentialStore::new(db.clone())),
        );

        let business_ai = config.ai.gemini_api_key.as_ref().map(|key| {
            Arc::new(GeminiClient::new(key.clone(), config.ai.gemini_model.clone()))
                as Arc<dyn TextGenerator>
        });
        let finance_ai = config.ai.openai_api_key.as_ref().map(|key| {
            Arc::new(OpenAiClient::new(key.clone(), config.ai.openai_model.clone()))
                as Arc<dyn TextGenerator>
        });

        let meta_accounts = config
            .webhooks
            .meta_ad_account_to_company
            .as_deref()
            .map(AccountCompanyMap::from_json)
            .unwrap_or_default();

        let rate_limiter = RateLimiter::new(config.rate_limit);

        Self {
            db,
            config: Arc::new(config),
            tokens,
            business_ai,
            finance_ai,
            meta_accounts: Arc::new(meta_accounts),
            rate_limiter,
        }
    }

    /// Shares rate-limit counters through Redis
    pub fn with_redis(mut self, client: RedisClient) -> Self {
        self.rate_limiter = self.rate_limiter.with_redis(client);
        self
    }

    /// Replaces the business chat/analysis provider
    pub fn with_business_ai(mut self, provider: Arc<dyn TextGenerator>) -> Self {
        self.business_ai = Some(provider);
        self
    }

    /// Replaces the finance chat provider
    pub fn with_finance_ai(mut self, provider: Arc<dyn TextGenerator>) -> Self {
        self.finance_ai = Some(provider);
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        self.tokens.access_secret()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # public
/// └── /api/
///     ├── /auth/{register,login,refresh}   # public
///     ├── /webhooks/{meta,shopify}          # public, signature-checked
///     ├── /auth/{logout,me}                 # auth
///     ├── /profile, /user/*                 # auth
///     ├── /companies, /company              # auth
///     ├── /dashboard, /export, GET /transactions      # auth + tenant
///     └── /sales, /financial, /insights, /ai, /chat,  # auth + tenant + active company
///         POST /transactions
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, compression, tracing, rate
/// limiting. Guards are layered per route group; for a guarded request
/// they run as auth, then tenant scope, then active company.
pub fn build_router(state: AppState) -> Router {
    let auth = from_fn_with_state(state.clone(), require_auth);
    let active = from_fn_with_state(state.clone(), active_company);

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route(
            "/webhooks/meta",
            get(routes::webhooks::verify_meta).post(routes::webhooks::receive_meta),
        )
        .route("/webhooks/shopify", post(routes::webhooks::receive_shopify));

    let account_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route(
            "/profile",
            get(routes::profile::get_profile)
                .patch(routes::profile::update_profile)
                .delete(routes::profile::delete_account),
        )
        .route(
            "/profile/change-password",
            patch(routes::profile::change_password),
        )
        .route("/user/profile", patch(routes::profile::update_profile))
        .route(
            "/user/change-password",
            patch(routes::profile::change_password),
        )
        .route(
            "/companies",
            get(routes::companies::list_companies).post(routes::companies::create_company),
        )
        .route(
            "/company",
            get(routes::companies::list_companies).post(routes::companies::create_company),
        )
        .layer(auth.clone());

    let scoped_routes = Router::new()
        .route("/dashboard/metrics", get(routes::dashboard::metrics))
        .route("/export/financial", get(routes::export::export_financial))
        .route(
            "/transactions",
            get(routes::finance::list_user_transactions)
                .merge(post(routes::finance::create_transaction).layer(active.clone())),
        )
        .layer(from_fn(tenant_scope))
        .layer(auth.clone());

    let company_routes = Router::new()
        .route(
            "/sales",
            get(routes::sales::list_sales).post(routes::sales::create_sale),
        )
        .route("/sales/aggregates", get(routes::sales::aggregates))
        .route(
            "/sales/:id",
            patch(routes::sales::update_sale).delete(routes::sales::delete_sale),
        )
        .route(
            "/financial",
            get(routes::finance::list_transactions).post(routes::finance::create_transaction),
        )
        .route(
            "/financial/transactions",
            get(routes::finance::list_transactions).post(routes::finance::create_transaction),
        )
        .route("/financial/summary", get(routes::finance::summary))
        .route("/financial/report", get(routes::finance::report))
        .route(
            "/financial/:companyId",
            get(routes::finance::list_company_transactions),
        )
        .route("/insights", get(routes::insights::list_insights))
        .route("/ai/chat", post(routes::ai::business_chat))
        .route("/ai/analyze", post(routes::ai::analyze))
        .route("/ai/history", get(routes::ai::history))
        .route("/chat", post(routes::ai::finance_chat))
        .layer(active)
        .layer(from_fn(tenant_scope))
        .layer(auth);

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(account_routes)
        .merge(scoped_routes)
        .merge(company_routes);

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .fallback(route_not_found)
        .layer(from_fn_with_state(state.clone(), rate_limit_layer))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Rota nao encontrada".to_string())
}

/// Permissive CORS for `*`, otherwise the listed origins with credentials
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
