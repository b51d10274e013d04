//! Issue-to-task reconciliation
//!
//! Every issue gets its own lookup, duplicates included. Lookups run
//! concurrently, then each issue's decision is applied concurrently. The
//! first failure aborts the whole batch.

use crate::config::CrashlyticsAnalysisConfig;
use crate::issue::CrashlyticsIssue;
use crate::task::{Decision, SkipReason};
use crate::tracker::TaskTracker;
use crate::Result;
use futures::future::try_join_all;
use serde::Serialize;

/// Decision for one issue occurrence, in input order
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    pub issue_id: String,
    pub decision: Decision,
}

/// Outcome counts of an applied plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: usize,
    pub reactivated: usize,
    pub skipped_open: usize,
    pub skipped_fixed: usize,
}

impl ReconcileReport {
    fn from_plan(plan: &[PlannedAction]) -> Self {
        let mut report = Self::default();
        for action in plan {
            match action.decision {
                Decision::Create { .. } => report.created += 1,
                Decision::Reactivate { .. } => report.reactivated += 1,
                Decision::Skip {
                    reason: SkipReason::StillOpen,
                    ..
                } => report.skipped_open += 1,
                Decision::Skip {
                    reason: SkipReason::FixedOrIgnored,
                    ..
                } => report.skipped_fixed += 1,
            }
        }
        report
    }

    pub fn skipped(&self) -> usize {
        self.skipped_open + self.skipped_fixed
    }
}

/// Reconciles issues against a [`TaskTracker`]
pub struct Reconciler<'a, T: TaskTracker + ?Sized> {
    tracker: &'a T,
    config: &'a CrashlyticsAnalysisConfig,
}

impl<'a, T: TaskTracker + ?Sized> Reconciler<'a, T> {
    pub fn new(tracker: &'a T, config: &'a CrashlyticsAnalysisConfig) -> Self {
        Self { tracker, config }
    }

    /// Look up every issue and decide what to do, without writing anything
    pub async fn plan(&self, issues: &[CrashlyticsIssue]) -> Result<Vec<PlannedAction>> {
        let lookups = issues
            .iter()
            .map(|issue| self.tracker.find_tasks(&issue.id));
        let found = try_join_all(lookups).await?;

        let wrike = &self.config.wrike_config;
        let base_url = &self.config.crashlytics_config.issue_base_url;
        let plan = issues
            .iter()
            .zip(found)
            .map(|(issue, tasks)| {
                let decision = Decision::for_issue(wrike, issue, base_url, &tasks);
                tracing::debug!(issue = %issue.id, action = decision.label(), "planned");
                PlannedAction {
                    issue_id: issue.id.clone(),
                    decision,
                }
            })
            .collect();
        Ok(plan)
    }

    /// Execute the create and reactivate actions of a plan
    pub async fn apply(&self, plan: &[PlannedAction]) -> Result<ReconcileReport> {
        let writes = plan.iter().map(|action| self.apply_one(action));
        try_join_all(writes).await?;
        let report = ReconcileReport::from_plan(plan);
        tracing::info!(
            created = report.created,
            reactivated = report.reactivated,
            skipped = report.skipped(),
            "reconciled tasks"
        );
        Ok(report)
    }

    async fn apply_one(&self, action: &PlannedAction) -> Result<()> {
        match &action.decision {
            Decision::Create { task } => {
                let created = self.tracker.create_task(task).await?;
                tracing::info!(issue = %action.issue_id, task = %created.id, "created task");
            }
            Decision::Reactivate { task_id, status_id } => {
                self.tracker.update_status(task_id, status_id).await?;
                tracing::info!(issue = %action.issue_id, task = %task_id, "reactivated task");
            }
            Decision::Skip { task_id, reason } => {
                tracing::debug!(issue = %action.issue_id, task = %task_id, %reason, "left task alone");
            }
        }
        Ok(())
    }
}
