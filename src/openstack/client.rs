//! OpenStack Client
//!
//! Main client for the OpenStack REST APIs, combining the HTTP client, the
//! token and the per-service endpoints. Implements [`Provider`].

use super::dispatch;
use super::http::OpenStackHttpClient;
use crate::config::CloudConfig;
use crate::provider::{Provider, Service};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// Main OpenStack client
#[derive(Clone)]
pub struct OpenStackClient {
    pub http: OpenStackHttpClient,
    token: String,
    endpoints: HashMap<Service, Url>,
}

impl OpenStackClient {
    /// Create a client from a resolved cloud configuration
    pub fn new(cloud: &CloudConfig) -> Result<Self> {
        let token = cloud
            .token
            .clone()
            .context("No token configured. Set OS_TOKEN or 'token' in clouds.yaml")?;

        let mut endpoints = HashMap::new();
        for (name, url) in &cloud.endpoints {
            let Some(service) = Service::ALL.into_iter().find(|s| s.as_str() == name) else {
                tracing::warn!("Ignoring endpoint for unsupported service '{}'", name);
                continue;
            };
            endpoints.insert(service, url.as_str());
        }

        Self::with_endpoints(&token, endpoints)
    }

    pub fn with_endpoints(token: &str, endpoints: HashMap<Service, &str>) -> Result<Self> {
        let endpoints = endpoints
            .into_iter()
            .map(|(service, url)| {
                Url::parse(url)
                    .with_context(|| format!("Invalid {} endpoint: {}", service, url))
                    .map(|url| (service, url))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            http: OpenStackHttpClient::new()?,
            token: token.to_string(),
            endpoints,
        })
    }

    /// Absolute URL for `path` under a service endpoint
    pub fn service_url(&self, service: Service, path: &str) -> Result<String> {
        let endpoint = self.endpoints.get(&service).with_context(|| {
            format!(
                "No {} endpoint configured. Set endpoints.{} in clouds.yaml or {}",
                service,
                service,
                service.endpoint_env_var()
            )
        })?;
        Ok(format!(
            "{}/{}",
            endpoint.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    /// GET a JSON document from a service
    pub async fn get(&self, service: Service, path: &str) -> Result<Value> {
        self.get_with_headers(service, path, &[]).await
    }

    pub async fn get_with_headers(
        &self,
        service: Service,
        path: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<Value> {
        let url = self.service_url(service, path)?;
        let mut headers: Vec<(&str, &str)> = dispatch::microversion_headers(service).to_vec();
        headers.extend_from_slice(extra_headers);
        self.http.get(&url, &self.token, &headers).await
    }

    /// DELETE a resource of a service
    pub async fn delete_at(&self, service: Service, path: &str) -> Result<()> {
        let url = self.service_url(service, path)?;
        self.http
            .delete(&url, &self.token, dispatch::microversion_headers(service))
            .await
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }
}

#[async_trait]
impl Provider for OpenStackClient {
    async fn list(&self, service: Service, method: &str, params: &Value) -> Result<Value> {
        tracing::debug!("list: service={}, method={}", service, method);
        let path = dispatch::list_path(service, method, params)?;
        self.get(service, &path)
            .await
            .with_context(|| format!("{}.{}", service, method))
    }

    async fn delete(&self, service: Service, method: &str, id: &str) -> Result<()> {
        tracing::info!("delete: service={}, method={}, id={}", service, method, id);
        let path = dispatch::delete_path(service, method, id)?;
        self.delete_at(service, &path).await
    }
}
