//! Provider abstraction
//!
//! The resource engine only talks to the cloud through [`Provider`], so it can be
//! driven by the OpenStack REST client or by an in-memory fake in tests.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// OpenStack service catalog types used by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Compute,
    Image,
    Network,
    Baremetal,
    Volume,
    Identity,
}

impl Service {
    pub const ALL: [Service; 6] = [
        Service::Compute,
        Service::Image,
        Service::Network,
        Service::Baremetal,
        Service::Volume,
        Service::Identity,
    ];

    /// Service type as it appears in the service catalog and in clouds.yaml
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Compute => "compute",
            Service::Image => "image",
            Service::Network => "network",
            Service::Baremetal => "baremetal",
            Service::Volume => "volumev3",
            Service::Identity => "identity",
        }
    }

    /// Environment variable that overrides this service's endpoint
    pub fn endpoint_env_var(&self) -> String {
        format!("OS_{}_ENDPOINT", self.as_str().to_uppercase())
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-invocation identity, threaded explicitly into fetching and resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub user_id: Option<String>,
    pub project_id: Option<String>,
}

impl Context {
    pub fn new(user_id: Option<String>, project_id: Option<String>) -> Self {
        Self {
            user_id,
            project_id,
        }
    }
}

/// Remote operations the resource engine needs
#[async_trait]
pub trait Provider: Send + Sync {
    /// Invoke a listing method, returning the raw response body
    async fn list(&self, service: Service, method: &str, params: &Value) -> Result<Value>;

    /// Delete one resource by ID
    async fn delete(&self, service: Service, method: &str, id: &str) -> Result<()>;
}
