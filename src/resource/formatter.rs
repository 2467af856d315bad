//! Field formatters
//!
//! Every output column of a resource kind is computed by a [`Formatter`]. Columns
//! without an explicit formatter fall back to identity on the field of the same name.

use super::registry::ResourceKind;
use super::{Collections, RawResource};
use crate::provider::Context;
use chrono::DateTime;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// Display value for cross-references that cannot be resolved
pub const UNKNOWN: &str = "(unknown)";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Plain value conversion
pub type ValueFn = fn(&Value) -> Value;

/// Computation over the fetched collections and the current resource
pub type ReferenceFn = dyn Fn(&Lookup<'_>, &RawResource) -> Value + Send + Sync;

/// How a column is computed from a raw resource
#[derive(Clone)]
pub enum Formatter {
    /// Reads the field named like the column
    Simple(ValueFn),
    /// Reads `source` instead of the column name
    Renamed { source: &'static str, format: ValueFn },
    /// Consults other collections (or the invocation context)
    CrossReference(Arc<ReferenceFn>),
}

impl Formatter {
    pub fn simple(format: ValueFn) -> Self {
        Formatter::Simple(format)
    }

    pub fn renamed(source: &'static str, format: ValueFn) -> Self {
        Formatter::Renamed { source, format }
    }

    /// Expose `source` under another column name, unchanged
    pub fn alias(source: &'static str) -> Self {
        Formatter::Renamed {
            source,
            format: identity,
        }
    }

    /// Expose `source` unchanged, showing null where the provider omits it
    ///
    /// For attributes only some roles are shown, such as nova's admin-only
    /// `OS-EXT-SRV-ATTR:*` fields.
    pub fn optional(source: &'static str) -> Self {
        Self::computed(move |_, resource| resource.get(source).cloned().unwrap_or(Value::Null))
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Lookup<'_>, &RawResource) -> Value + Send + Sync + 'static,
    {
        Formatter::CrossReference(Arc::new(f))
    }

    /// Follow `path` on the current resource to an ID, look that ID up in the
    /// `kind` collection and return its `target_field`.
    pub fn reference(kind: ResourceKind, path: &'static [&'static str], target_field: &'static str) -> Self {
        Self::computed(move |lookup, resource| {
            value_at(resource, path)
                .and_then(id_text)
                .map(|id| lookup.field(kind, &id, target_field))
                .unwrap_or_else(unknown)
        })
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formatter::Simple(_) => f.write_str("Simple"),
            Formatter::Renamed { source, .. } => write!(f, "Renamed({source})"),
            Formatter::CrossReference(_) => f.write_str("CrossReference"),
        }
    }
}

/// Read-only view handed to cross-referencing formatters
pub struct Lookup<'a> {
    collections: &'a Collections,
    context: &'a Context,
}

impl<'a> Lookup<'a> {
    pub fn new(collections: &'a Collections, context: &'a Context) -> Self {
        Self {
            collections,
            context,
        }
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    /// Find a resource of `kind` by ID
    pub fn get(&self, kind: ResourceKind, id: &str) -> Option<&'a RawResource> {
        self.collections.get(&kind)?.get(id)
    }

    /// Field of a referenced resource, or [`UNKNOWN`] for a dangling reference
    pub fn field(&self, kind: ResourceKind, id: &str, field: &str) -> Value {
        self.get(kind, id)
            .and_then(|resource| resource.get(field))
            .cloned()
            .unwrap_or_else(unknown)
    }
}

pub fn unknown() -> Value {
    Value::String(UNKNOWN.to_string())
}

/// Walk nested objects by key
pub fn value_at<'r>(resource: &'r RawResource, path: &[&str]) -> Option<&'r Value> {
    let (first, rest) = path.split_first()?;
    let mut current = resource.get(*first)?;
    for key in rest {
        current = current.get(*key)?;
    }
    Some(current)
}

/// Identifier carried by a value, if it looks like one
pub fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Text used for tables, matching and sorting
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

pub fn identity(value: &Value) -> Value {
    value.clone()
}

/// `{"net": [{"addr": "10.0.0.1"}, ...]}` -> `net=10.0.0.1,...`
pub fn addresses(value: &Value) -> Value {
    let Some(networks) = value.as_object() else {
        return Value::String(String::new());
    };

    let rendered = networks
        .iter()
        .map(|(network, entries)| {
            let addrs = entries
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|entry| entry.get("addr").and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .unwrap_or_default();
            format!("{network}={addrs}")
        })
        .collect::<Vec<_>>()
        .join(",");

    Value::String(rendered)
}

/// Neutron `fixed_ips` -> comma-separated addresses
pub fn fixed_ips(value: &Value) -> Value {
    let ips = value
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|entry| entry.get("ip_address").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default();
    Value::String(ips)
}

pub fn array_len(value: &Value) -> Value {
    Value::from(value.as_array().map(Vec::len).unwrap_or(0))
}

/// Embedded flavor (microversion >= 2.47) or a flavor reference
pub fn flavor_name(value: &Value) -> Value {
    ["original_name", "name", "id"]
        .iter()
        .find_map(|key| value.get(*key).filter(|v| v.is_string()))
        .cloned()
        .unwrap_or_else(unknown)
}

/// RFC 3339 timestamp -> `YYYY-MM-DD`
pub fn date_only(value: &Value) -> Value {
    let Some(raw) = value.as_str() else {
        return value.clone();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Value::String(parsed.format("%Y-%m-%d").to_string()),
        Err(_) => Value::String(raw.to_string()),
    }
}

/// Byte count -> GiB with one decimal, kept numeric
pub fn bytes_to_gib(value: &Value) -> Value {
    let Some(bytes) = value.as_f64() else {
        return value.clone();
    };
    let gib = (bytes / GIB * 10.0).round() / 10.0;
    Number::from_f64(gib).map(Value::Number).unwrap_or(Value::Null)
}

/// Volume `attachments` -> names of the attached servers
pub fn attached_servers(lookup: &Lookup<'_>, resource: &RawResource) -> Value {
    let Some(attachments) = resource.get("attachments").and_then(Value::as_array) else {
        return unknown();
    };

    let names = attachments
        .iter()
        .map(|attachment| {
            attachment
                .get("server_id")
                .and_then(id_text)
                .map(|id| display_text(&lookup.field(ResourceKind::Server, &id, "name")))
                .unwrap_or_else(|| UNKNOWN.to_string())
        })
        .collect::<Vec<_>>()
        .join(",");

    Value::String(names)
}

/// Whether the resource belongs to the acting project
pub fn owned_by_current_project(lookup: &Lookup<'_>, resource: &RawResource) -> Value {
    let owner = resource
        .get("tenant_id")
        .or_else(|| resource.get("project_id"))
        .and_then(id_text);

    match (owner, lookup.context().project_id.as_deref()) {
        (Some(owner), Some(current)) => Value::Bool(owner == current),
        _ => unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceCollection;
    use serde_json::json;

    fn raw(value: Value) -> RawResource {
        value.as_object().cloned().unwrap()
    }

    fn images() -> Collections {
        let mut collection = ResourceCollection::new();
        collection.insert("img1".to_string(), raw(json!({"id": "img1", "name": "ubuntu-22"})));
        let mut collections = Collections::new();
        collections.insert(ResourceKind::Image, collection);
        collections
    }

    #[test]
    fn test_reference_resolves_nested_id() {
        let collections = images();
        let context = Context::default();
        let lookup = Lookup::new(&collections, &context);
        let formatter = Formatter::reference(ResourceKind::Image, &["image", "id"], "name");
        let server = raw(json!({"id": "s1", "image": {"id": "img1"}}));

        let Formatter::CrossReference(f) = formatter else {
            panic!("expected cross-reference");
        };
        assert_eq!(f(&lookup, &server), json!("ubuntu-22"));
    }

    #[test]
    fn test_reference_misses_yield_unknown() {
        let collections = images();
        let context = Context::default();
        let lookup = Lookup::new(&collections, &context);
        let Formatter::CrossReference(f) =
            Formatter::reference(ResourceKind::Image, &["image", "id"], "name")
        else {
            panic!("expected cross-reference");
        };

        let dangling = raw(json!({"image": {"id": "missing"}}));
        let no_field = raw(json!({"name": "web1"}));
        let boot_from_volume = raw(json!({"image": ""}));

        assert_eq!(f(&lookup, &dangling), json!(UNKNOWN));
        assert_eq!(f(&lookup, &no_field), json!(UNKNOWN));
        assert_eq!(f(&lookup, &boot_from_volume), json!(UNKNOWN));
    }

    #[test]
    fn test_reference_to_unfetched_kind_is_unknown() {
        let collections = Collections::new();
        let context = Context::default();
        let lookup = Lookup::new(&collections, &context);
        assert_eq!(lookup.field(ResourceKind::Network, "n1", "name"), json!(UNKNOWN));
    }

    #[test]
    fn test_optional_field_absent_is_null() {
        let collections = Collections::new();
        let context = Context::default();
        let lookup = Lookup::new(&collections, &context);
        let Formatter::CrossReference(host) = Formatter::optional("OS-EXT-SRV-ATTR:host") else {
            panic!("optional fields are computed");
        };

        let admin_view = raw(json!({"id": "s1", "OS-EXT-SRV-ATTR:host": "cmp-1"}));
        assert_eq!(host(&lookup, &admin_view), json!("cmp-1"));
        assert_eq!(host(&lookup, &raw(json!({"id": "s1"}))), Value::Null);
    }

    #[test]
    fn test_addresses() {
        let value = json!({
            "external": [{"version": 4, "addr": "203.0.113.5"}, {"version": 6, "addr": "2001:db8::5"}],
            "private": [{"version": 4, "addr": "10.0.0.5"}]
        });
        assert_eq!(
            addresses(&value),
            json!("external=203.0.113.5,2001:db8::5,private=10.0.0.5")
        );
        assert_eq!(addresses(&json!({})), json!(""));
    }

    #[test]
    fn test_fixed_ips() {
        let value = json!([
            {"subnet_id": "a", "ip_address": "10.0.0.3"},
            {"subnet_id": "b", "ip_address": "10.0.1.3"}
        ]);
        assert_eq!(fixed_ips(&value), json!("10.0.0.3,10.0.1.3"));
    }

    #[test]
    fn test_flavor_name_prefers_original_name() {
        assert_eq!(
            flavor_name(&json!({"original_name": "m1.small", "vcpus": 1})),
            json!("m1.small")
        );
        assert_eq!(flavor_name(&json!({"id": "42"})), json!("42"));
        assert_eq!(flavor_name(&json!("42")), json!(UNKNOWN));
    }

    #[test]
    fn test_date_only() {
        assert_eq!(date_only(&json!("2024-03-01T12:30:00Z")), json!("2024-03-01"));
        assert_eq!(date_only(&json!("not a date")), json!("not a date"));
        assert_eq!(date_only(&Value::Null), Value::Null);
    }

    #[test]
    fn test_bytes_to_gib_stays_numeric() {
        let value = bytes_to_gib(&json!(2_684_354_560u64));
        assert_eq!(value, json!(2.5));
        assert!(value.is_number());
    }

    #[test]
    fn test_attached_servers() {
        let mut servers = ResourceCollection::new();
        servers.insert("s1".to_string(), raw(json!({"id": "s1", "name": "web1"})));
        let mut collections = Collections::new();
        collections.insert(ResourceKind::Server, servers);
        let context = Context::default();
        let lookup = Lookup::new(&collections, &context);

        let volume = raw(json!({"attachments": [{"server_id": "s1"}, {"server_id": "gone"}]}));
        assert_eq!(attached_servers(&lookup, &volume), json!("web1,(unknown)"));

        let detached = raw(json!({"attachments": []}));
        assert_eq!(attached_servers(&lookup, &detached), json!(""));
    }

    #[test]
    fn test_owned_by_current_project_uses_context() {
        let collections = Collections::new();
        let context = Context::new(None, Some("p1".to_string()));
        let lookup = Lookup::new(&collections, &context);

        assert_eq!(owned_by_current_project(&lookup, &raw(json!({"tenant_id": "p1"}))), json!(true));
        assert_eq!(owned_by_current_project(&lookup, &raw(json!({"tenant_id": "p2"}))), json!(false));

        let anonymous = Context::default();
        let lookup = Lookup::new(&collections, &anonymous);
        assert_eq!(owned_by_current_project(&lookup, &raw(json!({"tenant_id": "p1"}))), json!(UNKNOWN));
    }

    #[test]
    fn test_display_text() {
        assert_eq!(display_text(&Value::Null), "");
        assert_eq!(display_text(&json!(12)), "12");
        assert_eq!(display_text(&json!(true)), "true");
        assert_eq!(display_text(&json!(["a"])), "[\"a\"]");
    }
}
