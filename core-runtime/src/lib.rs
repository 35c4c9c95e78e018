//! # Core Runtime Module
//!
//! Provides the runtime infrastructure shared by the OneDrive items crates:
//! - Logging and tracing infrastructure
//! - Drive client configuration
//! - Event bus carrying upload lifecycle events
//!
//! ## Overview
//!
//! This crate sits between the host bridges and the provider. It owns the
//! explicit [`DriveConfig`](config::DriveConfig) passed at construction, the
//! `tracing-subscriber` setup, and the broadcast channel upload sessions
//! publish their progress on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
