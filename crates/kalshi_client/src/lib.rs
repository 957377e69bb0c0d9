//! Kalshi API client library.
//!
//! Provides authenticated REST access to the Kalshi trade API.

pub mod auth;
pub mod rate_limit;
pub mod rest;

pub use auth::KalshiAuth;
pub use rate_limit::RateLimiter;
pub use rest::KalshiRestClient;
