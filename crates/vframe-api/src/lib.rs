//! Axum HTTP API server.
//!
//! This crate provides:
//! - Multipart video upload that enqueues a frame-extraction job
//! - Job status polling and per-user job listing
//! - Archive download once a job is done
//! - Bearer-token auth against the customer service
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, CustomerAuthClient, TokenVerifier};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
