//! Shared types, error model, and settings for genscribe.
//!
//! This crate is the foundation depended on by all other genscribe crates.
//! It provides:
//! - [`GenscribeError`], the unified error type
//! - Domain types ([`ChatMessage`], [`CodeBundle`], [`ResponseFormat`], [`RunId`])
//! - Settings ([`Settings`], settings loading and validation)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    CodePromptsConfig, GeneralConfig, OutputConfig, SETTINGS_FILE_NAME, Settings,
    WelcomePromptsConfig, init_settings, load_settings, load_settings_from, resolve_api_key,
    settings_dir, validate_settings,
};
pub use error::{CONTENT_VALIDATION_MESSAGE, GenscribeError, Result};
pub use types::{ChatMessage, CodeBundle, ResponseFormat, Role, RunId};
