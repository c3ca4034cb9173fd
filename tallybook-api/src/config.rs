/// Configuration management for the API server
///
/// Loads `.env` (if present) and reads typed settings from environment
/// variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `JWT_SECRET`: Access-token signing secret, at least 32 characters (required)
/// - `JWT_REFRESH_SECRET`: Refresh-token signing secret (default: `JWT_SECRET`)
/// - `JWT_EXPIRES_IN` / `JWT_REFRESH_EXPIRES_IN`: Lifetimes (default: `15m` / `30d`)
/// - `API_HOST` / `PORT`: Bind address (default: `0.0.0.0:3333`)
/// - `CORS_ORIGINS`: Comma-separated origins or `*`
/// - `PRODUCTION`: Enables HSTS
/// - `GEMINI_API_KEY`, `GEMINI_MODEL`, `OPENAI_API_KEY`, `OPENAI_MODEL`
/// - `META_WEBHOOK_VERIFY_TOKEN`, `META_APP_SECRET`, `META_AD_ACCOUNT_TO_COMPANY`
/// - `SHOPIFY_WEBHOOK_SECRET`
/// - `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_SECS`: default 600 per 900s
///
/// # Example
///
/// ```no_run
/// use tallybook_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use std::env;
use std::str::FromStr;
use tallybook_shared::ai::{gemini, openai};

/// Origins allowed when `CORS_ORIGINS` is unset
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub ai: AiConfig,
    pub webhooks: WebhookConfig,
    pub rate_limit: RateLimitConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Access-token secret
    ///
    /// IMPORTANT: at least 32 characters. Generate with `openssl rand -hex 32`
    pub secret: String,

    pub refresh_secret: Option<String>,
    pub expires_in: String,
    pub refresh_expires_in: String,
}

/// AI provider configuration; a provider without a key is disabled
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

/// Webhook configuration
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    pub meta_verify_token: Option<String>,

    /// Signature checks are skipped without it
    pub meta_app_secret: Option<String>,

    /// JSON object mapping ad account ids to company ids
    pub meta_ad_account_to_company: Option<String>,

    pub shopify_secret: Option<String>,
}

/// Fixed-window rate limit per client address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 600,
            window_secs: 900,
        }
    }
}

impl Config {
    /// Builds a configuration with defaults for everything optional
    ///
    /// Used by tests and the seed binary.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 3333,
                cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
                production: false,
            },
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
                refresh_secret: None,
                expires_in: "15m".to_string(),
                refresh_expires_in: "30d".to_string(),
            },
            ai: AiConfig {
                gemini_api_key: None,
                gemini_model: gemini::DEFAULT_MODEL.to_string(),
                openai_api_key: None,
                openai_model: openai::DEFAULT_MODEL.to_string(),
            },
            webhooks: WebhookConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A numeric variable cannot be parsed
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = optional("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = optional("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let mut config = Self::new(database_url, jwt_secret);

        config.api.host = optional("API_HOST").unwrap_or(config.api.host);
        config.api.port = parse_or("PORT", config.api.port)?;
        if let Some(origins) = optional("CORS_ORIGINS") {
            config.api.cors_origins = parse_origins(&origins);
        }
        config.api.production = optional("PRODUCTION")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        config.database.max_connections =
            parse_or("DATABASE_MAX_CONNECTIONS", config.database.max_connections)?;

        config.jwt.refresh_secret = optional("JWT_REFRESH_SECRET");
        config.jwt.expires_in = optional("JWT_EXPIRES_IN").unwrap_or(config.jwt.expires_in);
        config.jwt.refresh_expires_in =
            optional("JWT_REFRESH_EXPIRES_IN").unwrap_or(config.jwt.refresh_expires_in);

        config.ai.gemini_api_key = optional("GEMINI_API_KEY");
        config.ai.gemini_model = optional("GEMINI_MODEL").unwrap_or(config.ai.gemini_model);
        config.ai.openai_api_key = optional("OPENAI_API_KEY");
        config.ai.openai_model = optional("OPENAI_MODEL").unwrap_or(config.ai.openai_model);

        config.webhooks = WebhookConfig {
            meta_verify_token: optional("META_WEBHOOK_VERIFY_TOKEN"),
            meta_app_secret: optional("META_APP_SECRET"),
            meta_ad_account_to_company: optional("META_AD_ACCOUNT_TO_COMPANY"),
            shopify_secret: optional("SHOPIFY_WEBHOOK_SECRET"),
        };

        config.rate_limit = RateLimitConfig {
            max_requests: parse_or("RATE_LIMIT_MAX", config.rate_limit.max_requests)?,
            window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", config.rate_limit.window_secs)?,
        };

        Ok(config)
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Reads a variable, treating blank values as unset
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(name) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        None => Ok(default),
    }
}

/// Splits `CORS_ORIGINS`; any `*` entry collapses the list to `["*"]`
pub fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.iter().any(|o| o == "*") {
        vec!["*".to_string()]
    } else {
        origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let mut config = Config::new(
            "postgresql://localhost/test",
            "test-secret-key-at-least-32-bytes-long",
        );
        config.api.host = "127.0.0.1".to_string();

        assert_eq!(config.bind_address(), "127.0.0.1:3333");
    }

    #[test]
    fn test_defaults() {
        let config = Config::new("postgresql://localhost/test", "secret");

        assert_eq!(config.jwt.expires_in, "15m");
        assert_eq!(config.jwt.refresh_expires_in, "30d");
        assert_eq!(config.ai.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.ai.openai_model, "gpt-4o-mini");
        assert_eq!(config.rate_limit, RateLimitConfig { max_requests: 600, window_secs: 900 });
        assert!(!config.api.production);
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://app.example.com/, http://localhost:5173"),
            vec!["https://app.example.com", "http://localhost:5173"]
        );
        assert_eq!(parse_origins("https://a.example.com,*"), vec!["*"]);
        assert!(parse_origins(" , ").is_empty());
    }
}
