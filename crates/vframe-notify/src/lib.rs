//! Best-effort delivery of job outcomes to the notification listener.
//!
//! This crate provides:
//! - JSON POST delivery to the listener's `/notify` endpoint
//! - Bounded retries with capped exponential backoff
//! - Failure translation that never disrupts the calling job flow

pub mod http;

pub use http::{HttpNotifier, NotifierConfig};
