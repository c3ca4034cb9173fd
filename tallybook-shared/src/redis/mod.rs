/// Redis integration
///
/// Tallybook only uses Redis for counters shared between API instances,
/// currently the request rate limiter.

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig, WindowHit};
