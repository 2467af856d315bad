//! Resource Fetcher
//!
//! Lists resources through a [`Provider`] based on resource descriptors.

use super::formatter::id_text;
use super::registry::{Registry, ResourceDescriptor, ResourceKind};
use super::{Collections, ResourceCollection};
use crate::error::{OstackError, Result};
use crate::provider::{Context, Provider};
use serde_json::Value;

/// Fetch every resource of one kind, keyed by ID in provider order
pub async fn fetch<P>(
    descriptor: &ResourceDescriptor,
    provider: &P,
    context: &Context,
) -> Result<ResourceCollection>
where
    P: Provider + ?Sized,
{
    let params = descriptor.list_arguments(context)?;

    tracing::info!(
        "fetch: kind={}, method={}",
        descriptor.kind,
        descriptor.list_method
    );

    let response = provider
        .list(descriptor.service, descriptor.list_method, &params)
        .await
        .map_err(|source| OstackError::Provider {
            kind: descriptor.kind.to_string(),
            source,
        })?;

    let collection = collect_items(&response, descriptor);
    tracing::debug!("fetched {} {} resources", collection.len(), descriptor.kind);

    Ok(collection)
}

/// Fetch the target kind, then each of its dependencies, one after another
///
/// The target's failures are fatal. A dependency whose list arguments need
/// identity that is not known is left empty, so references into it show as
/// unknown.
pub async fn fetch_with_dependencies<P>(
    descriptor: &ResourceDescriptor,
    registry: &Registry,
    provider: &P,
    context: &Context,
) -> Result<Collections>
where
    P: Provider + ?Sized,
{
    let mut collections = Collections::new();
    for kind in descriptor.fetch_set() {
        let collection = match fetch(registry.get(kind)?, provider, context).await {
            Ok(collection) => collection,
            Err(OstackError::MissingContext(what)) if kind != descriptor.kind => {
                tracing::warn!(
                    "skipping {} lookups for {}: no {} known",
                    kind,
                    descriptor.kind,
                    what
                );
                ResourceCollection::new()
            }
            Err(e) => return Err(e),
        };
        collections.insert(kind, collection);
    }
    Ok(collections)
}

/// Build the ID-keyed collection from the array at `response_path`
fn collect_items(response: &Value, descriptor: &ResourceDescriptor) -> ResourceCollection {
    let items = if descriptor.response_path.is_empty() {
        response.as_array()
    } else {
        response
            .get(descriptor.response_path)
            .and_then(Value::as_array)
    };

    let Some(items) = items else {
        tracing::warn!(
            "response for {} has no '{}' array",
            descriptor.kind,
            descriptor.response_path
        );
        return ResourceCollection::new();
    };

    let mut collection = ResourceCollection::with_capacity(items.len());
    for item in items {
        let Some(object) = item.as_object() else {
            tracing::warn!("skipping non-object {} item", descriptor.kind);
            continue;
        };
        let Some(id) = object.get(descriptor.id_field).and_then(id_text) else {
            tracing::warn!(
                "skipping {} item without '{}'",
                descriptor.kind,
                descriptor.id_field
            );
            continue;
        };
        collection.insert(id, object.clone());
    }
    collection
}
