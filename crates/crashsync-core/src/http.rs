//! Shared HTTP plumbing for the collaborator clients

use crate::{Error, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!("crashsync/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a JSON client, optionally sending `Authorization: bearer <token>`
pub(crate) fn build_client(bearer_token: Option<&str>) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = bearer_token {
        let value = HeaderValue::from_str(&format!("bearer {}", token.trim()))
            .map_err(|_| Error::InvalidConfig("access token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, value);
    }

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Fail on a non-success status, otherwise return the body text
pub(crate) async fn checked_text(service: &'static str, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::api(service, status.as_u16(), &body));
    }
    Ok(body)
}

/// Fail on a non-success status, otherwise decode the JSON body
pub(crate) async fn checked_json<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> Result<T> {
    let body = checked_text(service, response).await?;
    serde_json::from_str(&body).map_err(|e| Error::unexpected(service, e.to_string()))
}

/// Join a base URL and a path without doubling the slash
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
