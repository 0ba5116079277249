//! Local filesystem storage gateway.
//!
//! This crate provides:
//! - Upload persistence under a configured base directory
//! - Artifact relocation with cross-device fallback
//! - Scoped temporary directories for extraction runs
//! - Resolution of opaque storage references back to paths

pub mod local;

pub use local::{LocalStorage, StorageConfig};
