//! Configuration management for jktb.
//!
//! A single TOML file holds the user's credentials, the endpoint map and the
//! tunables of the run. It is loaded once into an [`AppConfig`] and passed by
//! reference to the workflow.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Credentials;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Login page of the portal. A login redirect back here means the CAPTCHA was
/// rejected.
pub const DEFAULT_LOGIN_PAGE: &str = "http://xy.4009955.com/sfrzwx/auth/login";

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Credentials of the reporting user
    pub user: Credentials,
    /// Endpoint URLs keyed by logical operation
    pub endpoints: Endpoints,
    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,
    /// HTTP client settings
    pub http: HttpConfig,
    /// CAPTCHA retry settings
    pub retry: RetryConfig,
    /// Submission payload settings
    pub submission: SubmissionConfig,
}

impl AppConfig {
    /// Load configuration from the default location.
    ///
    /// Unlike most tools there is no useful default configuration: without
    /// credentials nothing can run, so a missing file is an error.
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path, apply environment overrides
    /// and validate the result.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        Self::load_from_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`AppConfig::load_from`], reading overrides from `lookup` instead
    /// of the process environment.
    pub fn load_from_with<F>(path: &Path, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;

        config.apply_overrides(lookup);

        if config.submission.template_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.submission.template_path = dir.join(&config.submission.template_path);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process
    /// environment).
    ///
    /// Supported variables:
    /// - `JKTB_USERNAME`: portal account name
    /// - `JKTB_PASSWORD`: portal password
    /// - `JKTB_TEMPLATE_PATH`: submission template location
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup("JKTB_USERNAME") {
            tracing::debug!("Override user.username from env");
            self.user.username = username;
        }

        if let Some(password) = lookup("JKTB_PASSWORD") {
            tracing::debug!("Override user.password from env");
            self.user.password = password;
        }

        if let Some(path) = lookup("JKTB_TEMPLATE_PATH") {
            tracing::debug!("Override submission.template_path from env: {}", path);
            self.submission.template_path = PathBuf::from(path);
        }
    }

    /// Check that the configuration can drive a run.
    pub fn validate(&self) -> ConfigResult<()> {
        let required = [
            ("user.username", &self.user.username),
            ("user.password", &self.user.password),
            ("user.school_name", &self.user.school_name),
            ("user.wechat_open_id", &self.user.wechat_open_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }

        for endpoint in Endpoint::ALL {
            let url = self.endpoints.url(endpoint);
            Url::parse(url).map_err(|e| {
                invalid(
                    &format!("endpoints.{}", endpoint.name()),
                    &format!("'{url}' is not an absolute URL: {e}"),
                )
            })?;
        }

        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }

        Ok(())
    }

    /// Headers sent with every request: the configured extras plus the
    /// `User-Agent` and the `Referer` the login page expects.
    #[must_use]
    pub fn base_headers(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if !self.user.user_agent.is_empty() {
            headers.push(("User-Agent".to_string(), self.user.user_agent.clone()));
        }
        headers.push(("Referer".to_string(), self.referer()));
        headers
    }

    /// `Referer` of the WeChat login page for this user.
    #[must_use]
    pub fn referer(&self) -> String {
        format!(
            "{}?openid={}&dlfs=zhmm",
            self.endpoints.login_page, self.user.wechat_open_id
        )
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/jktb/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "jktb", "jktb").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Logical remote operations, each resolved to a URL by [`Endpoints`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// WeChat login page (also the CAPTCHA-rejected redirect target)
    LoginPage,
    /// CAPTCHA image
    VerifyCode,
    /// Credential login
    Login,
    /// WeChat authorization code
    WeChatCode,
    /// WeChat code exchange
    OAuth2,
    /// Today's form summary
    TodayForms,
    /// Historical form summaries
    HistoryForms,
    /// Today's form detail
    TodayFormDetail,
    /// Historical form detail
    HistoryFormDetail,
    /// Report submission
    Submit,
}

impl Endpoint {
    /// Every endpoint, in workflow order.
    pub const ALL: [Endpoint; 10] = [
        Self::LoginPage,
        Self::VerifyCode,
        Self::Login,
        Self::WeChatCode,
        Self::OAuth2,
        Self::TodayForms,
        Self::HistoryForms,
        Self::TodayFormDetail,
        Self::HistoryFormDetail,
        Self::Submit,
    ];

    /// Key of this endpoint in the `[endpoints]` table.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::LoginPage => "login_page",
            Self::VerifyCode => "verify_code",
            Self::Login => "login",
            Self::WeChatCode => "wechat_code",
            Self::OAuth2 => "OAuth2",
            Self::TodayForms => "todayForms",
            Self::HistoryForms => "historyForms",
            Self::TodayFormDetail => "todayFormDetail",
            Self::HistoryFormDetail => "historyFormDetail",
            Self::Submit => "submit",
        }
    }
}

/// Endpoint URLs of the remote service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// WeChat login page
    pub login_page: String,
    /// CAPTCHA image
    pub verify_code: String,
    /// Credential login
    pub login: String,
    /// WeChat authorization code
    pub wechat_code: String,
    /// WeChat code exchange
    #[serde(rename = "OAuth2")]
    pub oauth2: String,
    /// Today's form summary
    #[serde(rename = "todayForms")]
    pub today_forms: String,
    /// Historical form summaries
    #[serde(rename = "historyForms")]
    pub history_forms: String,
    /// Today's form detail
    #[serde(rename = "todayFormDetail")]
    pub today_form_detail: String,
    /// Historical form detail
    #[serde(rename = "historyFormDetail")]
    pub history_form_detail: String,
    /// Report submission
    pub submit: String,
}

impl Endpoints {
    /// Resolve a logical operation to its URL.
    #[must_use]
    pub fn url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::LoginPage => &self.login_page,
            Endpoint::VerifyCode => &self.verify_code,
            Endpoint::Login => &self.login,
            Endpoint::WeChatCode => &self.wechat_code,
            Endpoint::OAuth2 => &self.oauth2,
            Endpoint::TodayForms => &self.today_forms,
            Endpoint::HistoryForms => &self.history_forms,
            Endpoint::TodayFormDetail => &self.today_form_detail,
            Endpoint::HistoryFormDetail => &self.history_form_detail,
            Endpoint::Submit => &self.submit,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_page: DEFAULT_LOGIN_PAGE.to_string(),
            verify_code: String::new(),
            login: String::new(),
            wechat_code: String::new(),
            oauth2: String::new(),
            today_forms: String::new(),
            history_forms: String::new(),
            today_form_detail: String::new(),
            history_form_detail: String::new(),
            submit: String::new(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            accept_invalid_certs: true,
        }
    }
}

/// CAPTCHA retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Login attempts before giving up
    pub max_attempts: u32,
    /// Delay after a rejected CAPTCHA, in seconds
    pub backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_secs: 3,
        }
    }
}

/// Fixed values of the submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// JSON document holding the line-item template
    pub template_path: PathBuf,
    /// Daily deadline (`mrtbjzsj`)
    pub deadline: String,
    /// Remaining edit count (`syxgcs`)
    pub remaining_edits: u32,
    /// Form name (`bdmc`)
    pub form_name: String,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("daily_info_template.json"),
            deadline: "22:10".to_string(),
            remaining_edits: 3,
            form_name: "学生每日健康填报".to_string(),
        }
    }
}

/// Static line items submitted every day.
///
/// Items are forwarded verbatim; their inner structure is not checked.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionTemplate {
    items: Vec<Value>,
}

impl SubmissionTemplate {
    /// Load a template document from disk.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        tracing::debug!("Loading submission template from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let document: Value =
            serde_json::from_str(&contents).map_err(|source| ConfigError::TemplateParse {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_document(document)
    }

    /// Build a template from a parsed document with a `list` array.
    pub fn from_document(document: Value) -> ConfigResult<Self> {
        match document {
            Value::Object(mut map) => match map.remove("list") {
                Some(Value::Array(items)) => Ok(Self { items }),
                _ => Err(invalid("template", "expected a `list` array")),
            },
            _ => Err(invalid("template", "expected a JSON object")),
        }
    }

    /// The template's line items.
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }
}
