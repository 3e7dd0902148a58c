//! jktb Core - Foundation crate for the jktb daily report client.
//!
//! This crate provides the error taxonomy, configuration and domain types that
//! the HTTP and workflow crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Stage error kinds and configuration errors using thiserror
//! - [`config`] - TOML configuration with XDG paths and env overrides
//! - [`types`] - Credentials, identity and form records
//!
//! # Example
//!
//! ```rust
//! use jktb_core::{AppConfig, Endpoint};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.retry.max_attempts, 5);
//! assert_eq!(Endpoint::OAuth2.name(), "OAuth2");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, Endpoint, Endpoints, HttpConfig, RetryConfig, SubmissionConfig, SubmissionTemplate,
};
pub use error::{ConfigError, ConfigResult, ErrorKind, ReportError, Result};
pub use types::{Credentials, FormId, FormRecord, Identity, LineItem};
