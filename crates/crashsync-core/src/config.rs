//! Configuration for crashsync
//!
//! Stored as JSON (or TOML) and placeholder-expanded against the
//! environment before it is deserialized.

use crate::placeholder::PlaceholderExpander;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "crashsync";
const CONFIG_FILE: &str = "config.json";
const REDACTED: &str = "********";

/// Slack accepts at most this many blocks per message, one per issue
const MAX_ISSUE_LIMIT: u32 = 50;

/// Top-level crashsync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashlyticsAnalysisConfig {
    pub slack_notify_config: SlackNotifyConfig,
    pub crashlytics_config: CrashlyticsConfig,
    pub wrike_config: WrikeConfig,
}

/// Slack incoming-webhook settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackNotifyConfig {
    /// Incoming webhook URL
    pub notify_slack_url: String,

    /// Header line of the posted message
    #[serde(default = "default_headline")]
    pub headline: String,
}

/// Crashlytics BigQuery export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashlyticsConfig {
    pub gcp_project_id: String,

    /// Table inside the export dataset, e.g. `com_example_app_ANDROID`
    pub table_name: String,

    /// Console URL prefix; an issue's permalink is this plus its id
    pub issue_base_url: String,

    /// OAuth bearer token for the BigQuery REST API
    pub access_token: String,

    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Number of top issues to fetch, 1 to [`MAX_ISSUE_LIMIT`]
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// IANA timezone used to decide what "today" is
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// How many days back from today the default target day lies
    #[serde(default = "default_days_back")]
    pub days_back: u32,

    #[serde(default = "default_bigquery_base_url")]
    pub bigquery_base_url: String,
}

/// Wrike credentials and field mappings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrikeConfig {
    pub access_token: String,
    pub folder_id: String,

    /// Custom field holding the Crashlytics issue id
    pub crashlytics_issue_id_field_id: String,

    /// Status a regressed task is moved back to
    pub todo_workflow_status_id: String,

    /// Custom field that, when "true", marks a task as fixed or ignored
    pub fixed_or_ignore_flag_field_id: String,

    /// Every status that still counts as open
    pub not_completed_workflow_status_ids: BTreeSet<String>,

    #[serde(default = "default_wrike_api_base_url")]
    pub api_base_url: String,
}

fn default_headline() -> String {
    "Top crash events".to_string()
}

fn default_dataset() -> String {
    "firebase_crashlytics".to_string()
}

fn default_limit() -> u32 {
    20
}

fn default_timezone() -> String {
    "Asia/Tokyo".to_string()
}

fn default_days_back() -> u32 {
    1
}

fn default_bigquery_base_url() -> String {
    "https://bigquery.googleapis.com/bigquery/v2".to_string()
}

fn default_wrike_api_base_url() -> String {
    "https://www.wrike.com/api/v4".to_string()
}

impl CrashlyticsAnalysisConfig {
    /// Load config from a file, expanding placeholders from the process environment
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, &|name: &str| std::env::var(name).ok())
    }

    /// Load config from a file, resolving placeholders through `lookup`
    pub fn load_with<F>(path: &Path, lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let raw: serde_json::Value = if is_toml {
            toml::from_str(&content).map_err(|e| Error::InvalidConfig(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| Error::InvalidConfig(e.to_string()))?
        };

        Self::from_value(raw, lookup)
    }

    /// Expand and deserialize an already parsed config tree
    pub fn from_value<F>(raw: serde_json::Value, lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = PlaceholderExpander::new()?.expand(raw, lookup)?;
        let config: Self =
            serde_json::from_value(expanded).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that required values are present after expansion
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("slackNotifyConfig.notifySlackUrl", &self.slack_notify_config.notify_slack_url),
            ("crashlyticsConfig.gcpProjectId", &self.crashlytics_config.gcp_project_id),
            ("crashlyticsConfig.tableName", &self.crashlytics_config.table_name),
            ("crashlyticsConfig.issueBaseUrl", &self.crashlytics_config.issue_base_url),
            ("wrikeConfig.accessToken", &self.wrike_config.access_token),
            ("wrikeConfig.folderId", &self.wrike_config.folder_id),
            (
                "wrikeConfig.crashlyticsIssueIdFieldId",
                &self.wrike_config.crashlytics_issue_id_field_id,
            ),
            (
                "wrikeConfig.todoWorkflowStatusId",
                &self.wrike_config.todo_workflow_status_id,
            ),
            (
                "wrikeConfig.fixedOrIgnoreFlagFieldId",
                &self.wrike_config.fixed_or_ignore_flag_field_id,
            ),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        if self.wrike_config.not_completed_workflow_status_ids.is_empty() {
            return Err(Error::InvalidConfig(
                "wrikeConfig.notCompletedWorkflowStatusIds must not be empty".to_string(),
            ));
        }
        let limit = self.crashlytics_config.limit;
        if !(1..=MAX_ISSUE_LIMIT).contains(&limit) {
            return Err(Error::InvalidConfig(format!(
                "crashlyticsConfig.limit must be between 1 and {MAX_ISSUE_LIMIT}, got {limit}"
            )));
        }
        Ok(())
    }

    /// Copy of the config with credentials masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.crashlytics_config.access_token = REDACTED.to_string();
        config.wrike_config.access_token = REDACTED.to_string();
        config.slack_notify_config.notify_slack_url = REDACTED.to_string();
        config
    }

    /// Default config location: `<config dir>/crashsync/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Example config with placeholders for every secret
    pub fn example() -> String {
        r#"{
  "slackNotifyConfig": {
    "notifySlackUrl": "${SLACK_WEBHOOK_URL}",
    "headline": "Top crash events"
  },
  "crashlyticsConfig": {
    "gcpProjectId": "my-gcp-project",
    "tableName": "com_example_app_ANDROID",
    "issueBaseUrl": "https://console.firebase.google.com/project/my-gcp-project/crashlytics/app/android:com.example.app/issues/",
    "accessToken": "${GCP_ACCESS_TOKEN}",
    "limit": 20,
    "timezone": "Asia/Tokyo",
    "daysBack": 1
  },
  "wrikeConfig": {
    "accessToken": "${WRIKE_ACCESS_TOKEN}",
    "folderId": "IEAAAAAAI4AAAAAA",
    "crashlyticsIssueIdFieldId": "IEAAAAAAJUAAAAA1",
    "todoWorkflowStatusId": "IEAAAAAAJMAAAAA1",
    "fixedOrIgnoreFlagFieldId": "IEAAAAAAJUAAAAA2",
    "notCompletedWorkflowStatusIds": ["IEAAAAAAJMAAAAA1", "IEAAAAAAJMAAAAA2"]
  }
}
"#
        .to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Minimal valid config used across the crate's tests
    pub(crate) fn sample_config() -> CrashlyticsAnalysisConfig {
        CrashlyticsAnalysisConfig::from_value(sample_value(), &|_: &str| None).unwrap()
    }

    pub(crate) fn sample_value() -> serde_json::Value {
        json!({
            "slackNotifyConfig": { "notifySlackUrl": "https://hooks.slack.test/T/B/X" },
            "crashlyticsConfig": {
                "gcpProjectId": "proj",
                "tableName": "app_ANDROID",
                "issueBaseUrl": "https://console.test/issues/",
                "accessToken": "gcp-token"
            },
            "wrikeConfig": {
                "accessToken": "wrike-token",
                "folderId": "F1",
                "crashlyticsIssueIdFieldId": "CF_ISSUE",
                "todoWorkflowStatusId": "S_TODO",
                "fixedOrIgnoreFlagFieldId": "CF_FIXED",
                "notCompletedWorkflowStatusIds": ["S_TODO", "S_DOING"]
            }
        })
    }

    #[test]
    fn test_defaults_applied() {
        let config = sample_config();
        assert_eq!(config.crashlytics_config.limit, 20);
        assert_eq!(config.crashlytics_config.timezone, "Asia/Tokyo");
        assert_eq!(config.crashlytics_config.days_back, 1);
        assert_eq!(config.crashlytics_config.dataset, "firebase_crashlytics");
        assert_eq!(config.wrike_config.api_base_url, "https://www.wrike.com/api/v4");
        assert_eq!(config.slack_notify_config.headline, "Top crash events");
    }

    #[test]
    fn test_placeholders_expanded_before_deserialize() {
        let mut value = sample_value();
        value["wrikeConfig"]["accessToken"] = json!("${WRIKE_TOKEN}");
        let lookup = |name: &str| (name == "WRIKE_TOKEN").then(|| "from-env".to_string());

        let config = CrashlyticsAnalysisConfig::from_value(value, &lookup).unwrap();
        assert_eq!(config.wrike_config.access_token, "from-env");
    }

    #[test]
    fn test_unresolved_placeholder_fails_load() {
        let mut value = sample_value();
        value["wrikeConfig"]["accessToken"] = json!("$WRIKE_TOKEN");
        let err = CrashlyticsAnalysisConfig::from_value(value, &|_: &str| None).unwrap_err();
        assert!(matches!(err, Error::UnresolvedPlaceholder(_)));
    }

    #[test]
    fn test_missing_field_is_invalid_config() {
        let mut value = sample_value();
        value["wrikeConfig"]
            .as_object_mut()
            .unwrap()
            .remove("folderId");
        let err = CrashlyticsAnalysisConfig::from_value(value, &|_: &str| None).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(msg) if msg.contains("folderId")));
    }

    #[test]
    fn test_empty_open_status_set_rejected() {
        let mut value = sample_value();
        value["wrikeConfig"]["notCompletedWorkflowStatusIds"] = json!([]);
        let err = CrashlyticsAnalysisConfig::from_value(value, &|_: &str| None).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_limit_bounded_by_slack_blocks() {
        let mut value = sample_value();
        value["crashlyticsConfig"]["limit"] = json!(60);
        let err = CrashlyticsAnalysisConfig::from_value(value, &|_: &str| None).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(msg) if msg.contains("limit")));

        let mut value = sample_value();
        value["crashlyticsConfig"]["limit"] = json!(0);
        assert!(CrashlyticsAnalysisConfig::from_value(value, &|_: &str| None).is_err());

        let mut value = sample_value();
        value["crashlyticsConfig"]["limit"] = json!(MAX_ISSUE_LIMIT);
        let config = CrashlyticsAnalysisConfig::from_value(value, &|_: &str| None).unwrap();
        assert_eq!(config.crashlytics_config.limit, 50);
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let redacted = sample_config().redacted();
        assert_eq!(redacted.wrike_config.access_token, REDACTED);
        assert_eq!(redacted.crashlytics_config.access_token, REDACTED);
        assert_eq!(redacted.slack_notify_config.notify_slack_url, REDACTED);
        assert_eq!(redacted.wrike_config.folder_id, "F1");
    }

    #[test]
    fn test_example_parses_with_env() {
        let raw: serde_json::Value =
            serde_json::from_str(&CrashlyticsAnalysisConfig::example()).unwrap();
        let lookup = |_: &str| Some("secret".to_string());
        let config = CrashlyticsAnalysisConfig::from_value(raw, &lookup).unwrap();
        assert_eq!(config.slack_notify_config.notify_slack_url, "secret");
        assert_eq!(config.wrike_config.not_completed_workflow_status_ids.len(), 2);
    }

    #[test]
    fn test_load_json_and_toml_files() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("config.json");
        std::fs::write(&json_path, sample_value().to_string()).unwrap();
        let from_json =
            CrashlyticsAnalysisConfig::load_with(&json_path, &|_: &str| None).unwrap();
        assert_eq!(from_json.wrike_config.folder_id, "F1");

        let toml_path = dir.path().join("config.toml");
        std::fs::write(
            &toml_path,
            r#"
[slackNotifyConfig]
notifySlackUrl = "https://hooks.slack.test/T/B/X"

[crashlyticsConfig]
gcpProjectId = "proj"
tableName = "app_IOS"
issueBaseUrl = "https://console.test/issues/"
accessToken = "$GCP_TOKEN"
daysBack = 2

[wrikeConfig]
accessToken = "wrike-token"
folderId = "F2"
crashlyticsIssueIdFieldId = "CF_ISSUE"
todoWorkflowStatusId = "S_TODO"
fixedOrIgnoreFlagFieldId = "CF_FIXED"
notCompletedWorkflowStatusIds = ["S_TODO"]
"#,
        )
        .unwrap();
        let lookup = |name: &str| (name == "GCP_TOKEN").then(|| "gcp".to_string());
        let from_toml = CrashlyticsAnalysisConfig::load_with(&toml_path, &lookup).unwrap();
        assert_eq!(from_toml.wrike_config.folder_id, "F2");
        assert_eq!(from_toml.crashlytics_config.access_token, "gcp");
        assert_eq!(from_toml.crashlytics_config.days_back, 2);
    }

    #[test]
    fn test_missing_file() {
        let err = CrashlyticsAnalysisConfig::load(Path::new("/nonexistent/crashsync.json"))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = CrashlyticsAnalysisConfig::load_with(&path, &|_: &str| None).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
