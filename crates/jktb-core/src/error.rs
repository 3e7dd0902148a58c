//! Error types for the jktb report client.
//!
//! Every stage of the report workflow fails with a [`ReportError`] tagged by an
//! [`ErrorKind`], so callers can dispatch on the kind without matching on
//! message text. Configuration problems are reported separately through
//! [`ConfigError`] because they happen before any network traffic.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Classification of a workflow failure, one per stage anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// CAPTCHA image could not be fetched or decoded
    VerifyCodeFetch,
    /// Login response was not a redirect
    Login,
    /// Every CAPTCHA attempt was rejected
    VerifyCodeExhausted,
    /// WeChat authorization code could not be obtained
    WeChatCode,
    /// WeChat code exchange was refused
    OAuth2,
    /// A form listing or detail request failed
    FormsFetch,
    /// Today's report has already been submitted
    ReportAlreadyExists,
    /// Today's form no longer matches yesterday's accepted submission
    FormSchemaChanged,
    /// The final submission was refused
    Submit,
}

impl ErrorKind {
    /// Stable machine-readable code for this kind.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::VerifyCodeFetch => "VERIFY_CODE_FETCH",
            Self::Login => "LOGIN",
            Self::VerifyCodeExhausted => "VERIFY_CODE_EXHAUSTED",
            Self::WeChatCode => "WECHAT_CODE",
            Self::OAuth2 => "OAUTH2",
            Self::FormsFetch => "FORMS_FETCH",
            Self::ReportAlreadyExists => "REPORT_ALREADY_EXISTS",
            Self::FormSchemaChanged => "FORM_SCHEMA_CHANGED",
            Self::Submit => "SUBMIT",
        }
    }

    /// Whether this kind represents an actual failure.
    ///
    /// `ReportAlreadyExists` ends the run early but means there is nothing
    /// left to do, so it is not counted as a failure.
    #[must_use]
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::ReportAlreadyExists)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A terminal condition raised by one of the workflow stages.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ReportError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ReportError {
    /// Create a new error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause (transport failure, decode error, ...).
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The kind of failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Shorthand for `self.kind().is_failure()`.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.kind.is_failure()
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse the submission template
    #[error("failed to parse submission template {path}: {source}")]
    TemplateParse {
        /// Template path
        path: String,
        /// JSON parse error
        #[source]
        source: serde_json::Error,
    },

    /// I/O error reading config or template
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `ReportError`.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReportError::new(ErrorKind::FormSchemaChanged, "表单出现更改");
        assert_eq!(err.to_string(), "表单出现更改");
        assert_eq!(err.kind(), ErrorKind::FormSchemaChanged);

        let err = ConfigError::NoConfigDir;
        assert_eq!(
            err.to_string(),
            "could not determine config directory (XDG base directories not available)"
        );
    }

    #[test]
    fn test_only_existing_report_is_not_a_failure() {
        let kinds = [
            ErrorKind::VerifyCodeFetch,
            ErrorKind::Login,
            ErrorKind::VerifyCodeExhausted,
            ErrorKind::WeChatCode,
            ErrorKind::OAuth2,
            ErrorKind::FormsFetch,
            ErrorKind::FormSchemaChanged,
            ErrorKind::Submit,
        ];
        assert!(kinds.iter().all(|k| k.is_failure()));
        assert!(!ErrorKind::ReportAlreadyExists.is_failure());
    }

    #[test]
    fn test_source_is_preserved() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = ReportError::new(ErrorKind::Submit, "提交失败").with_source(io_err);
        let source = err.source().expect("source attached");
        assert_eq!(source.to_string(), "timed out");
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::OAuth2.to_string(), "OAUTH2");
        assert_eq!(
            ErrorKind::ReportAlreadyExists.code(),
            "REPORT_ALREADY_EXISTS"
        );
    }
}
