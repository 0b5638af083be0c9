//! Common utilities shared across services.
//!
//! This crate provides:
//! - Unified error handling
//! - The `REGRU__` application configuration loader
//! - A secret string wrapper that stays out of logs

pub mod config;
pub mod error;
pub mod secret;

pub use config::*;
pub use error::{AppError, AppResult, ConfigError, FieldError, OptionExt};
pub use secret::Secret;
