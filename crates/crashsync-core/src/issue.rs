//! Crashlytics issue data model
//!
//! One row of the daily top-crash query. Several rows may share an `id`
//! when the same crash bucket shows up with different exception variants.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// A crash bucket observed on the target day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashlyticsIssue {
    /// Stable Crashlytics issue id
    pub id: String,

    /// Issue title (usually the crashing frame)
    pub title: String,

    /// Number of events on the target day
    pub count: u64,

    pub exception_type: String,

    pub exception_message: String,

    /// Day the events were recorded, `YYYY-MM-DD` or RFC 3339
    pub event_time: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fatal: Option<bool>,
}

impl CrashlyticsIssue {
    /// Console link for this issue
    pub fn permalink(&self, issue_base_url: &str) -> String {
        format!("{}{}", issue_base_url, self.id)
    }

    /// Title used for the tracking task: `Type(message) title`
    pub fn task_title(&self) -> String {
        format!(
            "{}({}) {}",
            self.exception_type, self.exception_message, self.title
        )
    }

    /// Parse `event_time` into a calendar date
    pub fn event_date(&self) -> Option<NaiveDate> {
        let raw = self.event_time.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
    }

    pub fn is_fatal(&self) -> bool {
        self.is_fatal.unwrap_or(false)
    }
}

impl std::fmt::Display for CrashlyticsIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{} events] {}({}) {}",
            self.id, self.count, self.exception_type, self.exception_message, self.title
        )
    }
}
