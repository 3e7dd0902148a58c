//! Wire shapes of the portal's JSON responses.
//!
//! Every response wraps its payload as `{"data": {"content": ...}}`.

use jktb_core::{FormId, LineItem};
use serde::Deserialize;

/// `X-Requested-With` value the portal expects on XHR-style calls.
pub(crate) const XHR: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

pub(crate) const FORM_CONTENT_TYPE: (&str, &str) = (
    "Content-Type",
    "application/x-www-form-urlencoded; charset=UTF-8",
);

pub(crate) const JSON_CONTENT_TYPE: (&str, &str) = ("Content-Type", "application/json; charset=UTF-8");

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: Content<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Content<T> {
    pub content: T,
}

impl<T> Envelope<T> {
    pub fn into_content(self) -> T {
        self.data.content
    }
}

/// One row of a form listing.
#[derive(Debug, Deserialize)]
pub(crate) struct FormSummary {
    #[serde(rename = "bdtbslid")]
    pub id: FormId,
    #[serde(rename = "tbzt", default)]
    pub status: Option<i64>,
    /// `YYYY-MM-DD hh:mm:ss`
    #[serde(rename = "tbrq", default)]
    pub date: Option<String>,
}

/// Body of a form detail response.
#[derive(Debug, Deserialize)]
pub(crate) struct FormDetail {
    #[serde(rename = "list")]
    pub items: Vec<LineItem>,
    #[serde(rename = "xm", default)]
    pub name: Option<String>,
    #[serde(rename = "zzjgmc", default)]
    pub college: Option<String>,
}
