//! # Partner Gateway
//!
//! HTTP gateway for partner integrations. Partners sign every request
//! (RSA or HMAC over a canonical string), hold short-lived session tokens,
//! and can present zero-knowledge proof tokens in place of raw customer
//! identifiers when authorizing payments.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{GatewayError, Result};
pub use routes::create_routes;
pub use state::AppState;
