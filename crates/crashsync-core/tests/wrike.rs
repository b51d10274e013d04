use crashsync_core::{
    CrashlyticsAnalysisConfig, CrashlyticsIssue, Error, NewTask, Reconciler, TaskTracker,
    WrikeClient,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> CrashlyticsAnalysisConfig {
    let raw = json!({
        "slackNotifyConfig": { "notifySlackUrl": format!("{}/hook", server.uri()) },
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
            "notCompletedWorkflowStatusIds": ["S_TODO", "S_DOING"],
            "apiBaseUrl": server.uri()
        }
    });
    CrashlyticsAnalysisConfig::from_value(raw, &|_: &str| None).unwrap()
}

fn issue(id: &str) -> CrashlyticsIssue {
    CrashlyticsIssue {
        id: id.to_string(),
        title: "Crash".to_string(),
        count: 5,
        exception_type: "NPE".to_string(),
        exception_message: "boom".to_string(),
        event_time: "2024-01-01".to_string(),
        is_fatal: Some(true),
    }
}

fn tasks_body(tasks: serde_json::Value) -> serde_json::Value {
    json!({ "kind": "tasks", "data": tasks })
}

#[tokio::test]
async fn find_tasks_sends_custom_field_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/folders/F1/tasks"))
        .and(header("authorization", "bearer wrike-token"))
        .and(query_param("pageSize", "20"))
        .and(query_param("fields", r#"["customFields"]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(tasks_body(json!([
            {
                "id": "T1",
                "title": "NPE(boom) Crash",
                "customStatusId": "S_DONE",
                "customFields": [{ "id": "CF_FIXED", "value": "true" }]
            }
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = WrikeClient::new(&config.wrike_config).unwrap();
    let tasks = client.find_tasks("x1").await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].custom_status_id, "S_DONE");
    assert_eq!(tasks[0].field("CF_FIXED"), Some("true"));

    let received = server.received_requests().await.unwrap();
    let filter = received[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "customField")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    let filter: serde_json::Value = serde_json::from_str(&filter).unwrap();
    assert_eq!(
        filter,
        json!({ "id": "CF_ISSUE", "comparator": "EqualTo", "value": "x1" })
    );
}

#[tokio::test]
async fn create_task_posts_title_description_and_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/folders/F1/tasks"))
        .and(body_json(json!({
            "title": "NPE(boom) Crash",
            "description": "https://console.test/issues/x1\n",
            "customFields": [{ "id": "CF_ISSUE", "value": "x1" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(tasks_body(json!([
            { "id": "NEW", "customStatusId": "S_TODO" }
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = WrikeClient::new(&config.wrike_config).unwrap();
    let task = NewTask::for_issue(
        &config.wrike_config,
        &issue("x1"),
        &config.crashlytics_config.issue_base_url,
    );
    let created = client.create_task(&task).await.unwrap();
    assert_eq!(created.id, "NEW");
}

#[tokio::test]
async fn update_status_puts_custom_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/tasks/T1"))
        .and(body_json(json!({ "customStatus": "S_TODO" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(tasks_body(json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = WrikeClient::new(&config.wrike_config).unwrap();
    client.update_status("T1", "S_TODO").await.unwrap();
}

#[tokio::test]
async fn api_error_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/folders/F1/tasks"))
        .respond_with(ResponseTemplate::new(401).set_body_string("not_authorized"))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = WrikeClient::new(&config.wrike_config).unwrap();
    let err = client.find_tasks("x1").await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 401, .. }));
}

#[tokio::test]
async fn reconcile_against_wrike_creates_and_reactivates() {
    let server = MockServer::start().await;

    // Every search returns a closed, unflagged task except for "new".
    Mock::given(method("GET"))
        .and(path("/folders/F1/tasks"))
        .and(query_param(
            "customField",
            json!({ "id": "CF_ISSUE", "comparator": "EqualTo", "value": "new" }).to_string(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(tasks_body(json!([]))))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/folders/F1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tasks_body(json!([
            { "id": "T9", "customStatusId": "S_DONE" }
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/folders/F1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tasks_body(json!([
            { "id": "NEW", "customStatusId": "S_TODO" }
        ]))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/tasks/T9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tasks_body(json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = WrikeClient::new(&config.wrike_config).unwrap();
    let reconciler = Reconciler::new(&client, &config);
    let plan = reconciler.plan(&[issue("new"), issue("old")]).await.unwrap();
    assert_eq!(plan.len(), 2);
    let report = reconciler.apply(&plan).await.unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.reactivated, 1);
}
