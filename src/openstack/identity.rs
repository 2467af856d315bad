//! Keystone identity
//!
//! Discovers the acting user and project by validating the configured token.

use super::client::OpenStackClient;
use crate::provider::{Context, Service};
use anyhow::{Context as _, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    user: IdRef,
    #[serde(default)]
    project: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

/// Identity carried by the client's token
pub async fn whoami(client: &OpenStackClient) -> Result<Context> {
    let token = client.token().to_string();
    let response = client
        .get_with_headers(Service::Identity, "v3/auth/tokens", &[("X-Subject-Token", &token)])
        .await?;

    let parsed: TokenResponse =
        serde_json::from_value(response).context("Unexpected token validation response")?;

    Ok(Context::new(
        Some(parsed.token.user.id),
        parsed.token.project.map(|p| p.id),
    ))
}

/// Fill in whatever the configuration left out from the token itself
pub async fn complete_context(client: &OpenStackClient, configured: Context) -> Context {
    if configured.user_id.is_some() && configured.project_id.is_some() {
        return configured;
    }

    match whoami(client).await {
        Ok(discovered) => {
            tracing::info!(
                "Token belongs to user {:?}, project {:?}",
                discovered.user_id,
                discovered.project_id
            );
            Context::new(
                configured.user_id.or(discovered.user_id),
                configured.project_id.or(discovered.project_id),
            )
        }
        Err(e) => {
            tracing::warn!("Failed to validate token: {:#}, using configured identity only", e);
            configured
        }
    }
}
