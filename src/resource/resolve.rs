//! Resolution Engine
//!
//! Turns fetched collections into output rows: validates the requested columns,
//! runs each column's formatter against every resource of the target kind and
//! drops rows rejected by the matchers.

use super::fetcher::fetch_with_dependencies;
use super::formatter::{display_text, Formatter, Lookup};
use super::registry::{Registry, ResourceDescriptor, ResourceKind};
use super::{Collections, RawResource, ResourceCollection};
use crate::error::{OstackError, Result};
use crate::provider::{Context, Provider};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Formatted values of one resource, in requested column order
pub type OutputRow = IndexMap<String, Value>;

/// Keep rows whose `field` contains `needle`, ignoring case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    pub field: String,
    pub needle: String,
}

impl Matcher {
    pub fn new(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            needle: needle.into(),
        }
    }

    /// Parse `FIELD=VALUE`; the value may itself contain `=`
    pub fn parse(spec: &str) -> Result<Self> {
        match spec.split_once('=') {
            Some((field, needle)) if !field.trim().is_empty() => {
                Ok(Self::new(field.trim(), needle))
            }
            _ => Err(OstackError::InvalidMatcher(spec.to_string())),
        }
    }

    /// An absent value never matches
    pub fn matches(&self, value: Option<&Value>) -> bool {
        value.is_some_and(|value| {
            display_text(value)
                .to_lowercase()
                .contains(&self.needle.to_lowercase())
        })
    }
}

impl FromStr for Matcher {
    type Err = OstackError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Columns and filters for one listing
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    /// Empty means the kind's default columns
    pub columns: Vec<String>,
    pub matchers: Vec<Matcher>,
}

impl ListRequest {
    pub fn new(columns: Vec<String>, matchers: Vec<Matcher>) -> Self {
        Self { columns, matchers }
    }
}

/// Rows of one listing along with the columns they carry
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub kind: ResourceKind,
    pub columns: Vec<String>,
    pub rows: Vec<OutputRow>,
}

/// Fetch the target kind and its dependencies, then resolve rows
pub async fn resolve<P>(
    kind: &str,
    request: &ListRequest,
    registry: &Registry,
    provider: &P,
    context: &Context,
) -> Result<Resolved>
where
    P: Provider + ?Sized,
{
    let descriptor = registry.lookup(kind)?;
    let collections = fetch_with_dependencies(descriptor, registry, provider, context).await?;
    resolve_rows(descriptor, &collections, request, context)
}

/// Resolve rows from already fetched collections
pub fn resolve_rows(
    descriptor: &ResourceDescriptor,
    collections: &Collections,
    request: &ListRequest,
    context: &Context,
) -> Result<Resolved> {
    let empty = ResourceCollection::new();
    let target = collections.get(&descriptor.kind).unwrap_or(&empty);

    let columns = requested_columns(descriptor, &request.columns);
    let valid = valid_fields(descriptor, target);
    let referenced = columns
        .iter()
        .chain(request.matchers.iter().map(|m| &m.field));
    for column in referenced {
        if !valid.contains(column) {
            return Err(OstackError::UnknownColumn {
                column: column.clone(),
                valid: valid.into_iter().collect(),
            });
        }
    }

    let lookup = Lookup::new(collections, context);
    let mut rows = Vec::new();

    for (id, resource) in target {
        let keep = request.matchers.iter().all(|matcher| {
            let value = format_field(descriptor, &matcher.field, resource, &lookup);
            matcher.matches(value.as_ref())
        });
        if !keep {
            continue;
        }

        let mut row = OutputRow::with_capacity(columns.len());
        for column in &columns {
            let value = format_field(descriptor, column, resource, &lookup).ok_or_else(|| {
                OstackError::MissingField {
                    column: column.clone(),
                    resource_id: id.clone(),
                }
            })?;
            row.insert(column.clone(), value);
        }
        rows.push(row);
    }

    tracing::debug!(
        "resolved {} of {} {} resources",
        rows.len(),
        target.len(),
        descriptor.kind
    );

    Ok(Resolved {
        kind: descriptor.kind,
        columns,
        rows,
    })
}

/// Fields a listing of `descriptor` may show or match on
///
/// Raw fields are sampled from one resource; an empty collection falls back to
/// the default columns since nothing will be resolved anyway.
pub fn valid_fields(descriptor: &ResourceDescriptor, target: &ResourceCollection) -> BTreeSet<String> {
    let mut valid: BTreeSet<String> = descriptor
        .formatters
        .keys()
        .map(|k| k.to_string())
        .collect();

    match target.values().next() {
        Some(sample) => valid.extend(sample.keys().cloned()),
        None => valid.extend(descriptor.default_columns.iter().map(|c| c.to_string())),
    }

    valid
}

fn requested_columns(descriptor: &ResourceDescriptor, requested: &[String]) -> Vec<String> {
    let source: Vec<String> = if requested.is_empty() {
        descriptor
            .default_columns
            .iter()
            .map(|c| c.to_string())
            .collect()
    } else {
        requested.to_vec()
    };

    let mut columns = Vec::with_capacity(source.len());
    for column in source {
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    columns
}

/// Value of one column for one resource; `None` when its input field is absent
fn format_field(
    descriptor: &ResourceDescriptor,
    column: &str,
    resource: &RawResource,
    lookup: &Lookup<'_>,
) -> Option<Value> {
    match descriptor.formatter(column) {
        Some(Formatter::Simple(format)) => resource.get(column).map(|v| format(v)),
        Some(Formatter::Renamed { source, format }) => resource.get(*source).map(|v| format(v)),
        Some(Formatter::CrossReference(compute)) => Some(compute(lookup, resource)),
        None => resource.get(column).cloned(),
    }
}
