//! Task-tracking collaborator
//!
//! [`TaskTracker`] is the seam the reconciler talks to; [`WrikeClient`] is
//! the Wrike v4 implementation.

use crate::config::WrikeConfig;
use crate::http::{build_client, checked_json, join_url};
use crate::task::{NewTask, Task};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const SERVICE: &str = "wrike";

/// Tasks fetched per search; only the first page is read
pub const SEARCH_PAGE_SIZE: u32 = 20;

#[async_trait]
pub trait TaskTracker: Send + Sync {
    /// Tasks whose issue-id custom field equals `issue_id`
    async fn find_tasks(&self, issue_id: &str) -> Result<Vec<Task>>;

    /// Create a task and return it as stored
    async fn create_task(&self, task: &NewTask) -> Result<Task>;

    /// Move a task to another workflow status
    async fn update_status(&self, task_id: &str, status_id: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct TasksEnvelope {
    #[serde(default)]
    data: Vec<Task>,
}

/// Wrike REST client
///
/// Holds one preconfigured HTTP client for the whole run.
#[derive(Clone)]
pub struct WrikeClient {
    http: reqwest::Client,
    api_base: String,
    folder_id: String,
    issue_id_field_id: String,
}

impl WrikeClient {
    pub fn new(config: &WrikeConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(Some(&config.access_token))?,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            folder_id: config.folder_id.clone(),
            issue_id_field_id: config.crashlytics_issue_id_field_id.clone(),
        })
    }

    fn folder_tasks_url(&self) -> String {
        join_url(&self.api_base, &format!("folders/{}/tasks", self.folder_id))
    }
}

#[async_trait]
impl TaskTracker for WrikeClient {
    async fn find_tasks(&self, issue_id: &str) -> Result<Vec<Task>> {
        let custom_field = json!({
            "id": self.issue_id_field_id,
            "comparator": "EqualTo",
            "value": issue_id,
        })
        .to_string();
        let page_size = SEARCH_PAGE_SIZE.to_string();

        let response = self
            .http
            .get(self.folder_tasks_url())
            .query(&[
                ("pageSize", page_size.as_str()),
                ("fields", r#"["customFields"]"#),
                ("customField", custom_field.as_str()),
            ])
            .send()
            .await?;
        let envelope: TasksEnvelope = checked_json(SERVICE, response).await?;
        tracing::debug!(issue = issue_id, found = envelope.data.len(), "searched tasks");
        Ok(envelope.data)
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task> {
        let response = self
            .http
            .post(self.folder_tasks_url())
            .json(task)
            .send()
            .await?;
        let envelope: TasksEnvelope = checked_json(SERVICE, response).await?;
        envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::unexpected(SERVICE, "create returned no task"))
    }

    async fn update_status(&self, task_id: &str, status_id: &str) -> Result<()> {
        let response = self
            .http
            .put(join_url(&self.api_base, &format!("tasks/{task_id}")))
            .json(&json!({ "customStatus": status_id }))
            .send()
            .await?;
        let _: TasksEnvelope = checked_json(SERVICE, response).await?;
        Ok(())
    }
}
