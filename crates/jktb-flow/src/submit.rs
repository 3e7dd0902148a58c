//! Final report submission.

use crate::api::JSON_CONTENT_TYPE;
use chrono::{Local, NaiveDate};
use jktb_core::{
    AppConfig, Endpoint, ErrorKind, FormId, Identity, ReportError, Result, SubmissionConfig,
    SubmissionTemplate,
};
use jktb_http::{HttpRequest, Session};
use serde_json::{json, Value};

/// Posts the daily report.
pub struct Submitter<'a> {
    session: &'a Session,
    config: &'a AppConfig,
}

impl<'a> Submitter<'a> {
    /// Create a submitter over an authenticated `session`.
    pub fn new(session: &'a Session, config: &'a AppConfig) -> Self {
        Self { session, config }
    }

    /// Submit today's report, dated with the local calendar day.
    pub async fn submit(
        &self,
        identity: &Identity,
        form_id: &FormId,
        template: &SubmissionTemplate,
    ) -> Result<()> {
        self.submit_on(Local::now().date_naive(), identity, form_id, template)
            .await
    }

    /// Submit the report dated `date`.
    pub async fn submit_on(
        &self,
        date: NaiveDate,
        identity: &Identity,
        form_id: &FormId,
        template: &SubmissionTemplate,
    ) -> Result<()> {
        let payload = build_payload(&self.config.submission, date, identity, form_id, template);

        let request = HttpRequest::post(self.config.endpoints.url(Endpoint::Submit))
            .header(JSON_CONTENT_TYPE.0, JSON_CONTENT_TYPE.1)
            .json(payload)
            .no_redirect();

        let response = self
            .session
            .send(request)
            .await
            .map_err(|e| ReportError::new(ErrorKind::Submit, "提交失败").with_source(e))?;

        if !response.is_ok() {
            return Err(ReportError::new(
                ErrorKind::Submit,
                format!("提交失败 (HTTP {})", response.status),
            ));
        }

        tracing::info!(form_id = %form_id, %date, "report submitted");
        Ok(())
    }
}

/// Build the submission body.
///
/// `tbzt` is sent as 0: the server flips it once it accepts the report.
#[must_use]
pub fn build_payload(
    settings: &SubmissionConfig,
    date: NaiveDate,
    identity: &Identity,
    form_id: &FormId,
    template: &SubmissionTemplate,
) -> Value {
    json!({
        "list": template.items(),
        "isEdit": 1,
        "tbzt": 0,
        "syxgcs": settings.remaining_edits,
        "tbrq": date.format("%Y-%m-%d").to_string(),
        "mrtbjzsj": settings.deadline,
        "xm": identity.name,
        "zzjgmc": identity.college,
        "bdtbslid": form_id,
        "bdmc": settings.form_name,
    })
}
