//! Ragport Core Library
//!
//! Foundational utilities shared across the ragport workspace:
//! - Error handling (`AppError`, `AppResult`, `CollectionFailure`)
//! - Logging infrastructure
//! - Configuration loading for the CLI boundary

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, CollectionFailure};
