//! Bulk deletion
//!
//! Deletes are issued one at a time. A failed delete is recorded and the
//! remaining targets are still attempted; nothing is rolled back.

use super::registry::Registry;
use crate::error::{OstackError, Result};
use crate::provider::Provider;
use serde::Deserialize;
use std::fmt;
use std::io::Read;

/// One resource to delete
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeleteTarget {
    /// Baremetal listings carry `uuid` instead of `id`
    #[serde(alias = "uuid")]
    pub id: String,
    /// Only echoed back to the operator, never resolved
    #[serde(default)]
    pub name: Option<String>,
}

impl DeleteTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

impl fmt::Display for DeleteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => write!(f, "{} {}", self.id, name),
            _ => f.write_str(&self.id),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TargetInput {
    Id(String),
    Object(DeleteTarget),
}

/// Targets of a bulk delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTargets(Vec<DeleteTarget>);

impl DeleteTargets {
    /// `-` reads a JSON array from `stdin`, anything else is a comma-separated ID list
    pub fn parse(target: &str, stdin: impl Read) -> Result<Self> {
        if target == "-" {
            let mut input = String::new();
            let mut stdin = stdin;
            stdin.read_to_string(&mut input)?;
            Self::from_json(&input)
        } else {
            Self::from_list(target)
        }
    }

    pub fn from_list(list: &str) -> Result<Self> {
        let targets: Vec<DeleteTarget> = list
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(DeleteTarget::new)
            .collect();
        Self::non_empty(targets)
    }

    /// Accepts `[{"id": ..., "name": ...}, ...]` as printed by `list -f json`, or bare IDs
    pub fn from_json(input: &str) -> Result<Self> {
        let items: Vec<TargetInput> = serde_json::from_str(input).map_err(|e| {
            OstackError::InvalidTarget(format!(
                "expected a JSON array of objects with an 'id' field: {e}"
            ))
        })?;

        let targets = items
            .into_iter()
            .map(|item| match item {
                TargetInput::Id(id) => DeleteTarget::new(id),
                TargetInput::Object(target) => target,
            })
            .collect();
        Self::non_empty(targets)
    }

    fn non_empty(targets: Vec<DeleteTarget>) -> Result<Self> {
        if targets.is_empty() {
            return Err(OstackError::InvalidTarget("no targets given".to_string()));
        }
        Ok(Self(targets))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeleteTarget> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A target whose delete call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub target: DeleteTarget,
    pub error: String,
}

/// Outcome of a bulk delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<DeleteTarget>,
    pub failures: Vec<DeleteFailure>,
}

impl DeleteReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delete every target of `kind`, continuing past failures
pub async fn delete<P>(
    kind: &str,
    targets: &DeleteTargets,
    registry: &Registry,
    provider: &P,
) -> Result<DeleteReport>
where
    P: Provider + ?Sized,
{
    let descriptor = registry.lookup(kind)?;
    let mut report = DeleteReport::default();

    for target in targets.iter() {
        tracing::info!("delete: kind={}, target={}", descriptor.kind, target);

        match provider
            .delete(descriptor.service, descriptor.delete_method, &target.id)
            .await
        {
            Ok(()) => report.deleted.push(target.clone()),
            Err(e) => {
                tracing::error!("Failed to delete {} {}: {:#}", descriptor.kind, target.id, e);
                report.failures.push(DeleteFailure {
                    target: target.clone(),
                    error: format!("{e:#}"),
                });
            }
        }
    }

    Ok(report)
}
