//! FFmpeg CLI wrapper for frame extraction.
//!
//! This crate provides:
//! - Type-safe ffmpeg argument building
//! - Bounded execution with process kill on timeout
//! - Failure translation that surfaces ffmpeg's own diagnostics

pub mod extract;

pub use extract::{ExtractorConfig, FfmpegExtractor};
