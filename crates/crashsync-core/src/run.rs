//! One end-to-end pass: fetch issues, reconcile tasks, notify

use crate::config::CrashlyticsAnalysisConfig;
use crate::issue::CrashlyticsIssue;
use crate::notify::{ChatNotifier, Notifier, dedup_by_id};
use crate::reconcile::{PlannedAction, ReconcileReport, Reconciler};
use crate::source::IssueSource;
use crate::target::TargetDay;
use crate::tracker::TaskTracker;
use crate::Result;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

/// Run options
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Plan only: no task writes, no notification
    pub dry_run: bool,
}

/// What a run did
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub target_day: String,
    pub issues: Vec<CrashlyticsIssue>,
    pub unique_issues: usize,
    pub plan: Vec<PlannedAction>,
    /// Absent on a dry run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReconcileReport>,
    pub notified: bool,
}

/// The three collaborators a run talks to
pub struct Collaborators<'a> {
    pub source: &'a dyn IssueSource,
    pub tracker: &'a dyn TaskTracker,
    pub chat: &'a dyn ChatNotifier,
}

pub async fn run(
    config: &CrashlyticsAnalysisConfig,
    collaborators: Collaborators<'_>,
    day: TargetDay,
    options: RunOptions,
) -> Result<RunSummary> {
    let run_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("run", run_id = %run_id, %day);
    run_inner(config, collaborators, day, options, run_id)
        .instrument(span)
        .await
}

async fn run_inner(
    config: &CrashlyticsAnalysisConfig,
    collaborators: Collaborators<'_>,
    day: TargetDay,
    options: RunOptions,
    run_id: String,
) -> Result<RunSummary> {
    tracing::info!(dry_run = options.dry_run, "run started");

    let issues = collaborators.source.fetch_issues(day).await?;

    let reconciler = Reconciler::new(collaborators.tracker, config);
    let plan = reconciler.plan(&issues).await?;

    let (report, notified) = if options.dry_run {
        tracing::info!(actions = plan.len(), "dry run, skipping writes and notification");
        (None, false)
    } else {
        let report = reconciler.apply(&plan).await?;

        let headline = format!("{} ({day})", config.slack_notify_config.headline);
        let notifier = Notifier::new(headline, &config.crashlytics_config.issue_base_url);
        let payload = notifier.build_payload(&issues);
        collaborators.chat.post(&payload).await?;
        (Some(report), true)
    };

    let unique_issues = dedup_by_id(&issues).len();
    tracing::info!("run finished");

    Ok(RunSummary {
        run_id,
        target_day: day.to_string(),
        issues,
        unique_issues,
        plan,
        report,
        notified,
    })
}
