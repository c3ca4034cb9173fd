/// Middleware for the API server
///
/// - `auth`: Bearer access-token authentication
/// - `tenant`: Company scoping and active-company resolution
/// - `rate_limit`: Fixed-window limiting per client address
/// - `security`: Security response headers

pub mod auth;
pub mod rate_limit;
pub mod security;
pub mod tenant;
