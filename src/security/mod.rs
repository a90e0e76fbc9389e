//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (production pipeline):
//!     → rate_limit.rs (fixed window per client IP, shared store)
//!     → 429 + Retry-After when exceeded, otherwise pass on
//!     → Rate-Limit-* headers on the way out
//! ```
//!
//! # Design Decisions
//! - Fail open: a store outage must not take the site down
//! - Body size limits are a tower-http layer configured in `http::server`

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimitStatus, RateLimiter};
