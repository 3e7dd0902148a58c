//! Checks today's form against yesterday's accepted submission.
//!
//! The portal has no schema versioning. If today's line items differ from the
//! ones accepted yesterday, the static submission template may no longer fit,
//! so the run stops before anything is submitted.

use crate::api::{Envelope, FormDetail, FormSummary, JSON_CONTENT_TYPE};
use jktb_core::{
    AppConfig, Endpoint, ErrorKind, FormId, FormRecord, Identity, ReportError, Result,
};
use jktb_http::{HttpRequest, Session};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Page size used when listing past submissions.
pub const HISTORY_PAGE_SIZE: u32 = 50;

/// Status flag value meaning today's form has been submitted.
const STATUS_SUBMITTED: i64 = 1;

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    /// Who the form belongs to
    pub identity: Identity,
    /// Id of today's form, needed for submission
    pub today_form_id: FormId,
    /// Today's form as fetched
    pub today: FormRecord,
    /// Yesterday's accepted form
    pub yesterday: FormRecord,
}

/// Fetches today's and yesterday's forms and compares them.
pub struct ReportVerifier<'a> {
    session: &'a Session,
    config: &'a AppConfig,
}

impl<'a> ReportVerifier<'a> {
    /// Create a verifier over an authenticated `session`.
    pub fn new(session: &'a Session, config: &'a AppConfig) -> Self {
        Self { session, config }
    }

    /// Verify today's form.
    ///
    /// Returns `ReportAlreadyExists` as soon as today's form shows as submitted,
    /// before any further request.
    pub async fn verify(&self) -> Result<Verification> {
        let today_summary: Vec<FormSummary> =
            self.fetch(Endpoint::TodayForms, None, "今日表单id及状态").await?;
        let today_summary = first(today_summary, "今日表单id及状态")?;

        if today_summary.status == Some(STATUS_SUBMITTED) {
            return Err(ReportError::new(
                ErrorKind::ReportAlreadyExists,
                "已填报，无需再次填写",
            ));
        }

        let history: Vec<FormSummary> = self
            .fetch(
                Endpoint::HistoryForms,
                Some(json!({ "page": 1, "pageSize": HISTORY_PAGE_SIZE })),
                "昨日表单id",
            )
            .await?;
        let latest = first(history, "昨日表单id")?;
        let yesterday_date = latest
            .date
            .as_deref()
            .and_then(|d| d.split(' ').next())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .ok_or_else(|| forms_error("获取昨日表单id错误: 缺少填报日期"))?;

        let today_detail: FormDetail = self
            .fetch(
                Endpoint::TodayFormDetail,
                Some(json!({ "bdtbslid": today_summary.id })),
                "今日表单内容",
            )
            .await?;
        let identity = match (today_detail.name, today_detail.college) {
            (Some(name), Some(college)) => Identity { name, college },
            _ => return Err(forms_error("获取今日表单内容错误: 缺少姓名或学院")),
        };

        let yesterday_detail: FormDetail = self
            .fetch(
                Endpoint::HistoryFormDetail,
                Some(json!({ "bdtbslid": latest.id, "tbrq": yesterday_date })),
                "昨日表单内容",
            )
            .await?;

        let today = FormRecord {
            id: today_summary.id,
            status: today_summary.status,
            date: None,
            items: today_detail.items,
        };
        let yesterday = FormRecord {
            id: latest.id,
            status: latest.status,
            date: Some(yesterday_date),
            items: yesterday_detail.items,
        };

        if !today.same_structure(&yesterday) {
            tracing::warn!(
                today_items = today.items.len(),
                yesterday_items = yesterday.items.len(),
                "form structure differs from yesterday"
            );
            return Err(ReportError::new(
                ErrorKind::FormSchemaChanged,
                "表单出现更改",
            ));
        }

        tracing::info!(form_id = %today.id, "form verified against yesterday");
        Ok(Verification {
            identity,
            today_form_id: today.id.clone(),
            today,
            yesterday,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        body: Option<Value>,
        what: &str,
    ) -> Result<T> {
        let mut request = HttpRequest::post(self.config.endpoints.url(endpoint))
            .header(JSON_CONTENT_TYPE.0, JSON_CONTENT_TYPE.1)
            .no_redirect();
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self
            .session
            .send(request)
            .await
            .map_err(|e| forms_error(format!("获取{what}错误")).with_source(e))?;

        if !response.is_ok() {
            return Err(forms_error(format!(
                "获取{what}错误 (HTTP {})",
                response.status
            )));
        }

        let envelope: Envelope<T> = response
            .parse_json()
            .map_err(|e| forms_error(format!("获取{what}错误: 响应格式错误")).with_source(e))?;
        Ok(envelope.into_content())
    }
}

fn first(rows: Vec<FormSummary>, what: &str) -> Result<FormSummary> {
    rows.into_iter()
        .next()
        .ok_or_else(|| forms_error(format!("获取{what}错误: 列表为空")))
}

fn forms_error(message: impl Into<String>) -> ReportError {
    ReportError::new(ErrorKind::FormsFetch, message)
}
