//! Slack notification
//!
//! Issues are deduplicated by id (first occurrence wins) before rendering,
//! unlike reconciliation which handles every occurrence.

use crate::config::SlackNotifyConfig;
use crate::http::{build_client, checked_text};
use crate::issue::CrashlyticsIssue;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;

const SERVICE: &str = "slack";
const NO_ISSUES_TEXT: &str = "No fatal crash events were recorded.";

/// Slack rejects section text longer than this
const MAX_SECTION_TEXT: usize = 3000;

/// Slack truncates the top-level `text` field past this
const MAX_FALLBACK_TEXT: usize = 40_000;

/// Text object inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl TextObject {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: "mrkdwn",
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: "plain_text",
            text: text.into(),
        }
    }
}

/// Link button shown next to an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkButton {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: TextObject,
    pub url: String,
}

/// Block Kit block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<LinkButton>,
    },
}

/// Message posted to the webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackPayload {
    /// Fallback text shown in notifications
    pub text: String,
    pub blocks: Vec<Block>,
}

/// Keep the first occurrence of every issue id, in input order
pub fn dedup_by_id(issues: &[CrashlyticsIssue]) -> Vec<&CrashlyticsIssue> {
    let mut seen = HashSet::new();
    issues
        .iter()
        .filter(|issue| seen.insert(issue.id.as_str()))
        .collect()
}

/// Escape the characters Slack treats as control characters in mrkdwn
fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Cut `text` to at most `max` characters, ending in `...` when shortened
fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Renders issues into a [`SlackPayload`]
#[derive(Debug, Clone)]
pub struct Notifier {
    headline: String,
    issue_base_url: String,
}

impl Notifier {
    pub fn new(headline: impl Into<String>, issue_base_url: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            issue_base_url: issue_base_url.into(),
        }
    }

    pub fn build_payload(&self, issues: &[CrashlyticsIssue]) -> SlackPayload {
        let unique = dedup_by_id(issues);

        if unique.is_empty() {
            return SlackPayload {
                text: format!("{}\n{}", self.headline, NO_ISSUES_TEXT),
                blocks: vec![Block::Section {
                    text: TextObject::mrkdwn(NO_ISSUES_TEXT),
                    accessory: None,
                }],
            };
        }

        let lines: Vec<String> = unique
            .iter()
            .enumerate()
            .map(|(index, issue)| self.summary_line(index + 1, issue))
            .collect();
        let blocks = unique
            .iter()
            .enumerate()
            .map(|(index, issue)| self.issue_block(index + 1, issue))
            .collect();

        SlackPayload {
            text: truncate_chars(
                format!("{}\n{}", self.headline, lines.join("\n")),
                MAX_FALLBACK_TEXT,
            ),
            blocks,
        }
    }

    /// `1. Fatal Issue 5 Events. NPE(boom)<url|title>`
    fn summary_line(&self, rank: usize, issue: &CrashlyticsIssue) -> String {
        let fatal = if issue.is_fatal() { "Fatal Issue " } else { "" };
        format!(
            "{rank}. {fatal}{} Events. {}({})<{}|{}>",
            issue.count,
            escape_mrkdwn(&issue.exception_type),
            urlencoding::encode(&issue.exception_message),
            issue.permalink(&self.issue_base_url),
            escape_mrkdwn(&issue.title)
        )
    }

    /// One section per issue; the exception line is shortened so the
    /// whole text stays within [`MAX_SECTION_TEXT`]
    fn issue_block(&self, rank: usize, issue: &CrashlyticsIssue) -> Block {
        let url = issue.permalink(&self.issue_base_url);
        let date = issue
            .event_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| escape_mrkdwn(&issue.event_time));
        let head = format!(
            "*{rank}. <{url}|{}>*\n{date} · {} events\n",
            escape_mrkdwn(&issue.title),
            issue.count,
        );
        let exception = format!(
            "{}({})",
            escape_mrkdwn(&issue.exception_type),
            urlencoding::encode(&issue.exception_message),
        );
        // Two characters for the backticks.
        let budget = MAX_SECTION_TEXT.saturating_sub(head.chars().count() + 2);
        let text = truncate_chars(
            format!("{head}`{}`", truncate_chars(exception, budget)),
            MAX_SECTION_TEXT,
        );

        Block::Section {
            text: TextObject::mrkdwn(text),
            accessory: Some(LinkButton {
                kind: "button",
                text: TextObject::plain("Open in Crashlytics"),
                url,
            }),
        }
    }
}

/// Chat collaborator
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn post(&self, payload: &SlackPayload) -> Result<()>;
}

/// Slack incoming webhook
#[derive(Clone)]
pub struct SlackWebhook {
    http: reqwest::Client,
    url: String,
}

impl SlackWebhook {
    pub fn new(config: &SlackNotifyConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(None)?,
            url: config.notify_slack_url.clone(),
        })
    }
}

#[async_trait]
impl ChatNotifier for SlackWebhook {
    async fn post(&self, payload: &SlackPayload) -> Result<()> {
        let response = self.http.post(&self.url).json(payload).send().await?;
        checked_text(SERVICE, response).await?;
        tracing::info!(blocks = payload.blocks.len(), "posted slack notification");
        Ok(())
    }
}
