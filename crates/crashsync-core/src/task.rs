//! Tracking task view and the per-issue reconciliation decision

use crate::config::WrikeConfig;
use crate::issue::CrashlyticsIssue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value a flag custom field holds when set
const FLAG_SET: &str = "true";

/// Custom field value on a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    #[serde(default)]
    pub value: String,
}

/// Read-only view of a tracking task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    #[serde(default)]
    pub title: String,

    pub custom_status_id: String,

    /// Absent when the API omits the field list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Vec<CustomField>>,
}

impl Task {
    /// Custom fields keyed by id; later entries override earlier ones
    pub fn field_map(&self) -> HashMap<&str, &str> {
        self.custom_fields
            .iter()
            .flatten()
            .map(|f| (f.id.as_str(), f.value.as_str()))
            .collect()
    }

    pub fn field(&self, id: &str) -> Option<&str> {
        self.field_map().get(id).copied()
    }
}

/// Task to be created for an untracked issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub custom_fields: Vec<CustomField>,
}

impl NewTask {
    /// Build the task for `issue`, linked through the issue-id custom field
    pub fn for_issue(config: &WrikeConfig, issue: &CrashlyticsIssue, issue_base_url: &str) -> Self {
        Self {
            title: issue.task_title(),
            description: format!("{}\n", issue.permalink(issue_base_url)),
            custom_fields: vec![CustomField {
                id: config.crashlytics_issue_id_field_id.clone(),
                value: issue.id.clone(),
            }],
        }
    }
}

/// Why an existing task is left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Task is in one of the open statuses
    StillOpen,
    /// Someone marked the task fixed or ignored
    FixedOrIgnored,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::StillOpen => write!(f, "still open"),
            SkipReason::FixedOrIgnored => write!(f, "fixed or ignored"),
        }
    }
}

/// What to do for one issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Create { task: NewTask },
    Reactivate { task_id: String, status_id: String },
    Skip { task_id: String, reason: SkipReason },
}

impl Decision {
    /// Decide for `issue` given the tasks found for it
    ///
    /// Only the first task is considered. A task flagged fixed/ignored is
    /// never touched; a task outside the open statuses is moved to todo.
    pub fn for_issue(
        config: &WrikeConfig,
        issue: &CrashlyticsIssue,
        issue_base_url: &str,
        tasks: &[Task],
    ) -> Self {
        let Some(task) = tasks.first() else {
            return Decision::Create {
                task: NewTask::for_issue(config, issue, issue_base_url),
            };
        };

        if task.custom_fields.is_none() {
            tracing::warn!(task = %task.id, "task has no custom field list, treating as unflagged");
        }

        let fixed_or_ignore = task.field(&config.fixed_or_ignore_flag_field_id) == Some(FLAG_SET);
        let regression = !config
            .not_completed_workflow_status_ids
            .contains(&task.custom_status_id);

        if fixed_or_ignore {
            Decision::Skip {
                task_id: task.id.clone(),
                reason: SkipReason::FixedOrIgnored,
            }
        } else if regression {
            Decision::Reactivate {
                task_id: task.id.clone(),
                status_id: config.todo_workflow_status_id.clone(),
            }
        } else {
            Decision::Skip {
                task_id: task.id.clone(),
                reason: SkipReason::StillOpen,
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Create { .. } => "create",
            Decision::Reactivate { .. } => "reactivate",
            Decision::Skip { .. } => "skip",
        }
    }
}
