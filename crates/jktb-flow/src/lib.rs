//! jktb Flow - the daily report chain.
//!
//! Each stage runs over the same [`jktb_http::Session`], so cookies set by one
//! stage carry into the next:
//!
//! ```text
//! Authenticator → OAuthBridge → ReportVerifier → Submitter
//!   (CAPTCHA        (code →        (today vs        (template +
//!    retry loop)     exchange)      yesterday)       identity)
//! ```
//!
//! - [`captcha`]: CAPTCHA fetch and the pluggable [`CaptchaClassifier`]
//! - [`auth`]: credential login, bounded CAPTCHA retries
//! - [`oauth`]: WeChat code acquisition and exchange
//! - [`verifier`]: structural comparison against yesterday's form
//! - [`submit`]: submission payload and post
//! - [`workflow`]: [`ReportWorkflow`] chaining the stages

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod api;
pub mod auth;
pub mod captcha;
pub mod oauth;
pub mod submit;
pub mod verifier;
pub mod workflow;

pub use auth::{Authenticator, LoginState};
pub use captcha::{
    decode_image, CaptchaClassifier, ClassifierError, CommandClassifier, PromptClassifier,
    VerifyCodeResolver,
};
pub use oauth::{AuthorizationCode, OAuthBridge};
pub use submit::{build_payload, Submitter};
pub use verifier::{ReportVerifier, Verification, HISTORY_PAGE_SIZE};
pub use workflow::{ReportWorkflow, Stage};
