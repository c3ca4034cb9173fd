//! # Tallybook API Server Library
//!
//! HTTP layer for Tallybook: authentication, tenant guards, and the sales,
//! finance, AI, and webhook endpoints.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from environment variables
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON extractor that rejects with `ApiError`
//! - `middleware`: Authentication, tenant scope, rate limiting, security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
