//! WeChat authorization code exchange.

use crate::api::{JSON_CONTENT_TYPE, XHR};
use jktb_core::{AppConfig, Endpoint, ErrorKind, ReportError, Result};
use jktb_http::{HttpRequest, Session};
use serde_json::json;
use std::fmt;
use url::Url;

/// Single-use WeChat authorization code.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    /// Get the code as sent by the portal.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthorizationCode(<redacted>)")
    }
}

/// Turns the portal login into a WeChat-authenticated session.
pub struct OAuthBridge<'a> {
    session: &'a Session,
    config: &'a AppConfig,
}

impl<'a> OAuthBridge<'a> {
    /// Create a bridge over an authenticated `session`.
    pub fn new(session: &'a Session, config: &'a AppConfig) -> Self {
        Self { session, config }
    }

    /// Ask the portal for a WeChat code; it arrives in the redirect target.
    pub async fn acquire_code(&self) -> Result<AuthorizationCode> {
        let request = HttpRequest::get(self.config.endpoints.url(Endpoint::WeChatCode))
            .header(XHR.0, XHR.1)
            .no_redirect();

        let response = self
            .session
            .send(request)
            .await
            .map_err(|e| wechat_error("获取WeChat Code错误").with_source(e))?;

        if !response.is_found() {
            return Err(wechat_error(format!(
                "获取WeChat Code错误 (HTTP {})",
                response.status
            )));
        }

        let location = response
            .location
            .ok_or_else(|| wechat_error("获取WeChat Code错误: 跳转地址缺失"))?;
        let code = code_from_redirect(&location)?;

        tracing::info!("WeChat code acquired");
        Ok(code)
    }

    /// Exchange the code; success marks the session as WeChat-authenticated.
    pub async fn exchange(&self, code: &AuthorizationCode) -> Result<()> {
        let request = HttpRequest::post(self.config.endpoints.url(Endpoint::OAuth2))
            .header(JSON_CONTENT_TYPE.0, JSON_CONTENT_TYPE.1)
            .json(json!({ "code": code.as_str() }))
            .no_redirect();

        let response = self
            .session
            .send(request)
            .await
            .map_err(|e| ReportError::new(ErrorKind::OAuth2, "微信鉴权错误").with_source(e))?;

        if !response.is_ok() {
            return Err(ReportError::new(
                ErrorKind::OAuth2,
                format!("微信鉴权错误 (HTTP {})", response.status),
            ));
        }

        tracing::info!("WeChat OAuth2 passed");
        Ok(())
    }
}

fn wechat_error(message: impl Into<String>) -> ReportError {
    ReportError::new(ErrorKind::WeChatCode, message)
}

/// Pull the `code` query parameter out of a redirect target.
fn code_from_redirect(location: &str) -> Result<AuthorizationCode> {
    let url = Url::parse(location)
        .map_err(|e| wechat_error("获取WeChat Code错误: 跳转地址无效").with_source(e))?;

    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
        .map(AuthorizationCode)
        .ok_or_else(|| wechat_error("获取WeChat Code错误: 跳转地址中没有 code"))
}
