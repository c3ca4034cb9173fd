//! # Tallybook Shared Library
//!
//! Types, persistence and business rules used by the Tallybook API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Passwords, JWTs, refresh-token rotation and tenant scoping
//! - `domain`: Pure aggregation, export and insight logic over ledger records
//! - `ai`: Text-generation providers and prompt building
//! - `webhooks`: Inbound Meta/Shopify payload verification and normalization
//! - `db`: Connection pool and migrations
//! - `redis`: Redis client used for distributed rate limiting

pub mod ai;
pub mod auth;
pub mod db;
pub mod domain;
pub mod models;
pub mod redis;
pub mod webhooks;

/// Current version of the Tallybook shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
