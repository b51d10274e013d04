//! crashsync-core: Core library for crashsync
//!
//! Expands environment placeholders in the config, reconciles the day's
//! top Crashlytics issues with Wrike tasks, and renders the Slack summary.
//! Remote systems sit behind traits so the engine can run against fakes.

pub mod config;
pub mod error;
mod http;
pub mod issue;
pub mod notify;
pub mod placeholder;
pub mod reconcile;
pub mod run;
pub mod source;
pub mod target;
pub mod task;
pub mod tracker;

pub use config::{CrashlyticsAnalysisConfig, CrashlyticsConfig, SlackNotifyConfig, WrikeConfig};
pub use error::Error;
pub use issue::CrashlyticsIssue;
pub use notify::{ChatNotifier, Notifier, SlackPayload, SlackWebhook, dedup_by_id};
pub use placeholder::PlaceholderExpander;
pub use reconcile::{PlannedAction, ReconcileReport, Reconciler};
pub use run::{Collaborators, RunOptions, RunSummary, run};
pub use source::{BigQueryIssueSource, IssueSource};
pub use target::TargetDay;
pub use task::{CustomField, Decision, NewTask, SkipReason, Task};
pub use tracker::{TaskTracker, WrikeClient};

/// Result type for crashsync operations
pub type Result<T> = std::result::Result<T, Error>;
