//! Shared domain types for the report workflow.
//!
//! Field names on the wire are the remote service's pinyin abbreviations
//! (`bdtbslid`, `tbzt`, `bt`, `nr`, ...); the Rust side uses descriptive names
//! and maps them with serde renames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Login credentials and client identity for a single user.
///
/// Loaded once before the workflow starts and never mutated afterwards.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Credentials {
    /// Portal account name
    pub username: String,
    /// Portal password
    pub password: String,
    /// School name as shown on the login form
    pub school_name: String,
    /// WeChat open-id bound to the account
    pub wechat_open_id: String,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("school_name", &self.school_name)
            .field("wechat_open_id", &self.wechat_open_id)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// The submitter's display name and organizational unit.
///
/// Discovered from the server's own record of today's form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Display name (`xm`)
    #[serde(rename = "xm")]
    pub name: String,
    /// College / organizational unit (`zzjgmc`)
    #[serde(rename = "zzjgmc")]
    pub college: String,
}

/// Opaque remote form identifier (`bdtbslid`).
///
/// The service has been seen to send it both as a string and as a number. The
/// id is echoed back in later requests exactly as it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(Repr);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
enum Repr {
    Text(String),
    Number(serde_json::Number),
}

impl FormId {
    /// Create a textual `FormId`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(Repr::Text(id.into()))
    }

    /// Create a numeric `FormId`.
    #[must_use]
    pub fn numeric(id: impl Into<serde_json::Number>) -> Self {
        Self(Repr::Number(id.into()))
    }

    /// Whether the service sent this id as a JSON number.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self.0, Repr::Number(_))
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Text(s) => f.write_str(s),
            Repr::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One entry of a report form.
///
/// Only the title (`bt`) and content (`nr`) take part in the structural
/// comparison; a field that is absent compares equal only to another absent
/// field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item title (`bt`)
    #[serde(rename = "bt", default)]
    pub title: Option<Value>,
    /// Item content (`nr`)
    #[serde(rename = "nr", default)]
    pub content: Option<Value>,
}

impl LineItem {
    /// Create a line item with text title and content.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(Value::String(title.into())),
            content: Some(Value::String(content.into())),
        }
    }
}

/// A daily report form as seen by the verifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FormRecord {
    /// Remote form id
    pub id: FormId,
    /// Submission status flag (`tbzt`), when known
    pub status: Option<i64>,
    /// Submission date (`YYYY-MM-DD`), when known
    pub date: Option<String>,
    /// Ordered line items
    pub items: Vec<LineItem>,
}

impl FormRecord {
    /// Check whether two forms have the same structure.
    ///
    /// Items are paired by position, so the same items in a different order
    /// do not match.
    #[must_use]
    pub fn same_structure(&self, other: &FormRecord) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.title == b.title && a.content == b.content)
    }
}
