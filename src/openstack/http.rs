//! HTTP utilities for OpenStack REST API calls

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

/// Header carrying the Keystone token on every request
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body and strip control characters before logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// HTTP client wrapper for OpenStack API calls
#[derive(Clone)]
pub struct OpenStackHttpClient {
    client: Client,
}

impl OpenStackHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ostack/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// GET a JSON document
    pub async fn get(&self, url: &str, token: &str, headers: &[(&str, &str)]) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(url).header(AUTH_TOKEN_HEADER, token);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("API request failed: {}", status));
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }

    /// DELETE a resource; OpenStack answers 202/204 with an empty body
    pub async fn delete(&self, url: &str, token: &str, headers: &[(&str, &str)]) -> Result<()> {
        tracing::debug!("DELETE {}", url);

        let mut request = self.client.delete(url).header(AUTH_TOKEN_HEADER, token);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("API request failed: {}", status));
        }

        Ok(())
    }
}

/// Operator hint for a failed API call, based on the status it reported
pub fn api_error_hint(error: &anyhow::Error) -> Option<&'static str> {
    let error_str = format!("{error:#}");

    if !error_str.contains("API request failed") {
        return None;
    }
    if error_str.contains("401") {
        return Some("Authentication failed. Issue a new token with 'openstack token issue' and set OS_TOKEN.");
    }
    if error_str.contains("403") {
        return Some("Permission denied. Check the roles of your user on this project.");
    }
    if error_str.contains("404") {
        return Some("Resource or endpoint not found. Check the endpoints in clouds.yaml.");
    }
    if error_str.contains("409") {
        return Some("Resource conflict. The resource may be in use or in a transitional state.");
    }
    if error_str.contains("500") || error_str.contains("503") {
        return Some("OpenStack service temporarily unavailable. Please try again.");
    }
    None
}
