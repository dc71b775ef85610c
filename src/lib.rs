pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod worker;

pub use auth::{AnonymousResolver, SupabaseTokenResolver, TokenResolver};
pub use identity::client_identifier;
pub use middleware::{RateLimitGuard, rate_limit, with_rate_limit};
pub use models::{RateLimitDecision, RateLimitRecord};
pub use policy::RateLimitPolicy;
pub use rate_limit::RateLimiter;
pub use store::{MemoryStore, PostgresStore, RateLimitStore};
