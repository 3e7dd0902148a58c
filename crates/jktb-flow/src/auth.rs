//! Credential login with the CAPTCHA retry loop.

use crate::api::{FORM_CONTENT_TYPE, XHR};
use crate::captcha::{CaptchaClassifier, VerifyCodeResolver};
use jktb_core::{AppConfig, Credentials, Endpoint, ErrorKind, ReportError, Result};
use jktb_http::{HttpRequest, Session};
use std::time::Duration;
use url::Url;

/// Progress of a login.
///
/// A login that is refused outright (`LoginFailed`) or that runs out of
/// attempts never becomes a state; it is returned as an error instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// About to fetch a CAPTCHA and post credentials (1-based attempt)
    Attempting {
        /// Attempt number
        attempt: u32,
    },
    /// The portal bounced back to the login page
    CaptchaRejected {
        /// Attempt that was rejected
        attempt: u32,
    },
    /// The portal redirected somewhere else
    Authenticated {
        /// Redirect target to follow
        redirect: String,
    },
}

/// Logs into the portal, retrying when the CAPTCHA answer is rejected.
pub struct Authenticator<'a> {
    session: &'a Session,
    config: &'a AppConfig,
    classifier: &'a dyn CaptchaClassifier,
}

impl<'a> Authenticator<'a> {
    /// Create an authenticator over `session`.
    pub fn new(
        session: &'a Session,
        config: &'a AppConfig,
        classifier: &'a dyn CaptchaClassifier,
    ) -> Self {
        Self {
            session,
            config,
            classifier,
        }
    }

    /// Log in and finalize the session cookies.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        let login_path = login_page_path(self.config.endpoints.url(Endpoint::LoginPage))?;
        let max_attempts = self.config.retry.max_attempts;
        let backoff = Duration::from_secs(self.config.retry.backoff_secs);

        let mut state = LoginState::Attempting { attempt: 1 };
        let redirect = loop {
            state = match state {
                LoginState::Attempting { attempt } => {
                    self.attempt(credentials, attempt, &login_path).await?
                }
                LoginState::CaptchaRejected { attempt } if attempt < max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        "verification code rejected, retrying in {}s",
                        backoff.as_secs()
                    );
                    tokio::time::sleep(backoff).await;
                    LoginState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                LoginState::CaptchaRejected { attempt } => {
                    return Err(ReportError::new(
                        ErrorKind::VerifyCodeExhausted,
                        format!("验证码错误过多 ({attempt} 次)"),
                    ));
                }
                LoginState::Authenticated { redirect } => break redirect,
            };
        };

        // Following the redirect is what sets the portal's session cookies.
        let response = self
            .session
            .send(HttpRequest::get(&redirect).header(XHR.0, XHR.1))
            .await
            .map_err(|e| ReportError::new(ErrorKind::Login, "登录跳转失败").with_source(e))?;
        tracing::debug!(status = response.status, "followed login redirect");

        tracing::info!("login succeeded");
        Ok(())
    }

    async fn attempt(
        &self,
        credentials: &Credentials,
        attempt: u32,
        login_path: &str,
    ) -> Result<LoginState> {
        let code = VerifyCodeResolver::new(
            self.session,
            self.config.endpoints.url(Endpoint::VerifyCode),
            self.classifier,
        )
        .resolve()
        .await?;

        let request = HttpRequest::post(self.config.endpoints.url(Endpoint::Login))
            .header(FORM_CONTENT_TYPE.0, FORM_CONTENT_TYPE.1)
            .form([
                ("dlfs", "zhmm"),
                ("openid", credentials.wechat_open_id.as_str()),
                ("sjschool", ""),
                ("sjh", ""),
                ("yzm", ""),
                ("zhschool", credentials.school_name.as_str()),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
                ("code", code.as_str()),
            ])
            .no_redirect();

        tracing::debug!(attempt, "submitting login");
        let response = self
            .session
            .send(request)
            .await
            .map_err(|e| login_error("登录错误").with_source(e))?;

        if !response.is_found() {
            return Err(login_error(format!("登录错误 (HTTP {})", response.status)));
        }

        let location = response
            .location
            .ok_or_else(|| login_error("登录错误: 跳转地址缺失"))?;
        let target = Url::parse(&location)
            .map_err(|e| login_error("登录错误: 跳转地址无效").with_source(e))?;

        if target.path() == login_path {
            Ok(LoginState::CaptchaRejected { attempt })
        } else {
            Ok(LoginState::Authenticated { redirect: location })
        }
    }
}

fn login_error(message: impl Into<String>) -> ReportError {
    ReportError::new(ErrorKind::Login, message)
}

fn login_page_path(login_page: &str) -> Result<String> {
    Url::parse(login_page)
        .map(|url| url.path().to_string())
        .map_err(|e| login_error("登录页地址无效").with_source(e))
}
