//! The full report run: login, OAuth, verification, submission.

use crate::auth::Authenticator;
use crate::captcha::CaptchaClassifier;
use crate::oauth::OAuthBridge;
use crate::submit::Submitter;
use crate::verifier::{ReportVerifier, Verification};
use jktb_core::{AppConfig, Result, SubmissionTemplate};
use jktb_http::Session;
use std::fmt;

/// A completed step of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Logged into the portal
    Login,
    /// Obtained a WeChat authorization code
    WeChatCode,
    /// Exchanged the code
    OAuth2,
    /// Today's form matches yesterday's
    Verify,
    /// Report submitted
    Submit,
}

impl Stage {
    /// Status line shown once the stage completes.
    #[must_use]
    pub fn done_message(self) -> &'static str {
        match self {
            Self::Login => "登录成功",
            Self::WeChatCode => "WeChat Code获取成功",
            Self::OAuth2 => "WeChat OAuth2 通过",
            Self::Verify => "表单校验无误",
            Self::Submit => "填报完成",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::WeChatCode => "wechat_code",
            Self::OAuth2 => "oauth2",
            Self::Verify => "verify",
            Self::Submit => "submit",
        };
        f.write_str(name)
    }
}

type ProgressFn = Box<dyn Fn(Stage) + Send + Sync>;

/// One run of the report chain over a single session.
///
/// Stages run strictly in order and the first error ends the run.
pub struct ReportWorkflow<'a> {
    config: &'a AppConfig,
    session: Session,
    classifier: Box<dyn CaptchaClassifier>,
    on_stage: Option<ProgressFn>,
}

impl<'a> ReportWorkflow<'a> {
    /// Create a workflow over `session`, solving CAPTCHAs with `classifier`.
    pub fn new(
        config: &'a AppConfig,
        session: Session,
        classifier: Box<dyn CaptchaClassifier>,
    ) -> Self {
        Self {
            config,
            session,
            classifier,
            on_stage: None,
        }
    }

    /// Call `f` after each completed stage.
    #[must_use]
    pub fn with_progress(mut self, f: impl Fn(Stage) + Send + Sync + 'static) -> Self {
        self.on_stage = Some(Box::new(f));
        self
    }

    /// Authenticate and verify today's form without submitting it.
    pub async fn check(&self) -> Result<Verification> {
        Authenticator::new(&self.session, self.config, self.classifier.as_ref())
            .login(&self.config.user)
            .await?;
        self.completed(Stage::Login);

        let bridge = OAuthBridge::new(&self.session, self.config);
        let code = bridge.acquire_code().await?;
        self.completed(Stage::WeChatCode);
        bridge.exchange(&code).await?;
        self.completed(Stage::OAuth2);

        let verification = ReportVerifier::new(&self.session, self.config)
            .verify()
            .await?;
        self.completed(Stage::Verify);

        Ok(verification)
    }

    /// Run every stage, submitting `template` at the end.
    pub async fn run(&self, template: &SubmissionTemplate) -> Result<Verification> {
        let verification = self.check().await?;

        Submitter::new(&self.session, self.config)
            .submit(
                &verification.identity,
                &verification.today_form_id,
                template,
            )
            .await?;
        self.completed(Stage::Submit);

        Ok(verification)
    }

    fn completed(&self, stage: Stage) {
        tracing::info!(%stage, "stage completed");
        if let Some(f) = &self.on_stage {
            f(stage);
        }
    }
}
