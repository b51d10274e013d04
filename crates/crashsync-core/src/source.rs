//! Crash issue source
//!
//! [`BigQueryIssueSource`] runs the daily top-crash query against the
//! Crashlytics BigQuery export through the REST `queries` endpoint.

use crate::config::CrashlyticsConfig;
use crate::http::{build_client, checked_json, join_url};
use crate::issue::CrashlyticsIssue;
use crate::target::TargetDay;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;

const SERVICE: &str = "bigquery";
const QUERY_TIMEOUT_MS: u64 = 60_000;

#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Fatal issues for `day`, most events first
    async fn fetch_issues(&self, day: TargetDay) -> Result<Vec<CrashlyticsIssue>>;
}

/// Top fatal issues for `@targetDate` (YYYYMMDD)
pub fn top_issues_query(dataset: &str, table: &str, limit: u32) -> String {
    format!(
        r#"
WITH issue_count AS (
    SELECT COUNT(*) AS count, issue_id
    FROM `{dataset}.{table}`
    WHERE FORMAT_DATE("%Y%m%d", DATE(event_timestamp)) = @targetDate
    GROUP BY issue_id
),
issues AS (
    SELECT DISTINCT
        issue_id,
        issue_title,
        is_fatal,
        exceptions.type AS exception_type,
        exceptions.exception_message AS exception_message
    FROM `{dataset}.{table}`, UNNEST(exceptions) AS exceptions
    WHERE FORMAT_DATE("%Y%m%d", DATE(event_timestamp)) = @targetDate
)
SELECT
    issue_count.count AS count,
    issues.issue_id AS id,
    issues.issue_title AS title,
    issues.is_fatal AS isFatal,
    issues.exception_type AS exceptionType,
    issues.exception_message AS exceptionMessage,
    FORMAT_DATE("%Y-%m-%d", PARSE_DATE("%Y%m%d", @targetDate)) AS eventTime
FROM issue_count
INNER JOIN issues ON issue_count.issue_id = issues.issue_id
WHERE issues.is_fatal = TRUE
ORDER BY count DESC
LIMIT {limit}
"#
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    v: Value,
}

/// BigQuery-backed issue source
#[derive(Clone)]
pub struct BigQueryIssueSource {
    http: reqwest::Client,
    endpoint: String,
    query: String,
}

impl BigQueryIssueSource {
    pub fn new(config: &CrashlyticsConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(Some(&config.access_token))?,
            endpoint: join_url(
                &config.bigquery_base_url,
                &format!("projects/{}/queries", config.gcp_project_id),
            ),
            query: top_issues_query(&config.dataset, &config.table_name, config.limit),
        })
    }
}

#[async_trait]
impl IssueSource for BigQueryIssueSource {
    async fn fetch_issues(&self, day: TargetDay) -> Result<Vec<CrashlyticsIssue>> {
        let body = json!({
            "query": self.query,
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "timeoutMs": QUERY_TIMEOUT_MS,
            "queryParameters": [{
                "name": "targetDate",
                "parameterType": { "type": "STRING" },
                "parameterValue": { "value": day.as_param() },
            }],
        });

        let response = self.http.post(&self.endpoint).json(&body).send().await?;
        let result: QueryResponse = checked_json(SERVICE, response).await?;
        let issues = decode_rows(result)?;
        tracing::info!(%day, count = issues.len(), "fetched crash issues");
        Ok(issues)
    }
}

/// Map positional rows onto issues by column name
fn decode_rows(result: QueryResponse) -> Result<Vec<CrashlyticsIssue>> {
    if !result.job_complete {
        return Err(Error::unexpected(SERVICE, "query did not complete in time"));
    }
    let Some(schema) = result.schema else {
        return Ok(Vec::new());
    };
    let columns: HashMap<&str, usize> = schema
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.as_str(), i))
        .collect();

    result
        .rows
        .iter()
        .map(|row| {
            let count = text(&columns, row, "count")?
                .parse::<u64>()
                .map_err(|e| Error::unexpected(SERVICE, format!("bad count: {e}")))?;
            let is_fatal = match cell(&columns, row, "isFatal") {
                Some(Value::String(s)) => Some(s.eq_ignore_ascii_case("true")),
                Some(Value::Bool(b)) => Some(*b),
                _ => None,
            };

            Ok(CrashlyticsIssue {
                id: text(&columns, row, "id")?,
                title: text(&columns, row, "title")?,
                count,
                exception_type: text(&columns, row, "exceptionType")?,
                exception_message: text(&columns, row, "exceptionMessage")?,
                event_time: text(&columns, row, "eventTime")?,
                is_fatal,
            })
        })
        .collect()
}

fn cell<'r>(columns: &HashMap<&str, usize>, row: &'r TableRow, name: &str) -> Option<&'r Value> {
    columns
        .get(name)
        .and_then(|&i| row.f.get(i))
        .map(|c| &c.v)
}

/// Cell as text; NULL becomes an empty string
fn text(columns: &HashMap<&str, usize>, row: &TableRow, name: &str) -> Result<String> {
    match cell(columns, row, name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Ok(other.to_string()),
        None => Err(Error::unexpected(SERVICE, format!("missing column {name}"))),
    }
}
