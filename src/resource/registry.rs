//! Resource Registry
//!
//! Static table describing every supported resource kind. The table is built
//! once on first access and never changes afterwards.

use super::formatter::{self, Formatter};
use crate::error::{OstackError, Result};
use crate::provider::{Context, Service};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// Glance lists 25 images by default
const IMAGE_LIST_LIMIT: &str = "1000";

/// Supported resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Server,
    Image,
    Port,
    Network,
    BaremetalNode,
    Volume,
    Project,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Server,
        ResourceKind::Image,
        ResourceKind::Port,
        ResourceKind::Network,
        ResourceKind::BaremetalNode,
        ResourceKind::Volume,
        ResourceKind::Project,
    ];

    /// Name used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Server => "server",
            ResourceKind::Image => "image",
            ResourceKind::Port => "port",
            ResourceKind::Network => "network",
            ResourceKind::BaremetalNode => "baremetal-node",
            ResourceKind::Volume => "volume",
            ResourceKind::Project => "project",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes listing parameters once a connection context is known
pub type ListArgumentsFn = fn(&Context) -> Result<Value>;

/// Everything needed to list, resolve and delete one resource kind
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub service: Service,
    pub list_method: &'static str,
    /// Key of the item array in the list response
    pub response_path: &'static str,
    pub id_field: &'static str,
    pub list_arguments: Option<ListArgumentsFn>,
    pub default_columns: &'static [&'static str],
    pub formatters: IndexMap<&'static str, Formatter>,
    pub dependencies: &'static [ResourceKind],
    pub delete_method: &'static str,
}

impl ResourceDescriptor {
    /// Override formatter for a column, if any
    pub fn formatter(&self, column: &str) -> Option<&Formatter> {
        self.formatters.get(column)
    }

    /// Kinds to fetch before resolving: this kind first, then its dependencies
    pub fn fetch_set(&self) -> Vec<ResourceKind> {
        let mut kinds = vec![self.kind];
        for dependency in self.dependencies {
            if !kinds.contains(dependency) {
                kinds.push(*dependency);
            }
        }
        kinds
    }

    /// Evaluate the list arguments for this invocation
    pub fn list_arguments(&self, context: &Context) -> Result<Value> {
        match self.list_arguments {
            Some(compute) => compute(context),
            None => Ok(Value::Object(serde_json::Map::new())),
        }
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("kind", &self.kind)
            .field("service", &self.service)
            .field("list_method", &self.list_method)
            .field("default_columns", &self.default_columns)
            .field("formatters", &self.formatters)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Lookup table of resource descriptors
#[derive(Debug)]
pub struct Registry {
    descriptors: IndexMap<ResourceKind, ResourceDescriptor>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// The built-in registry (built on first access)
    pub fn global() -> &'static Registry {
        REGISTRY.get_or_init(Registry::builtin)
    }

    pub fn builtin() -> Self {
        Self::from_descriptors([
            server(),
            image(),
            port(),
            network(),
            baremetal_node(),
            volume(),
            project(),
        ])
    }

    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ResourceDescriptor>) -> Self {
        Self {
            descriptors: descriptors.into_iter().map(|d| (d.kind, d)).collect(),
        }
    }

    /// Find the descriptor for a kind given by name
    pub fn lookup(&self, kind: &str) -> Result<&ResourceDescriptor> {
        ResourceKind::from_name(kind)
            .and_then(|k| self.descriptors.get(&k))
            .ok_or_else(|| self.unknown_kind(kind))
    }

    pub fn get(&self, kind: ResourceKind) -> Result<&ResourceDescriptor> {
        self.descriptors
            .get(&kind)
            .ok_or_else(|| self.unknown_kind(kind.as_str()))
    }

    /// Registered kinds, in registration order
    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.descriptors.keys().copied()
    }

    pub fn kind_names(&self) -> Vec<String> {
        self.kinds().map(|k| k.as_str().to_string()).collect()
    }

    fn unknown_kind(&self, kind: &str) -> OstackError {
        OstackError::UnknownKind {
            kind: kind.to_string(),
            valid: self.kind_names(),
        }
    }

    /// Check that dependencies are registered and acyclic
    pub fn validate(&self) -> Result<()> {
        for descriptor in self.descriptors.values() {
            if descriptor.default_columns.is_empty() {
                return Err(OstackError::Config(format!(
                    "{} has no default columns",
                    descriptor.kind
                )));
            }
            for dependency in descriptor.dependencies {
                if !self.descriptors.contains_key(dependency) {
                    return Err(OstackError::Config(format!(
                        "{} depends on unregistered kind {}",
                        descriptor.kind, dependency
                    )));
                }
            }
            let mut path = Vec::new();
            let mut done = HashSet::new();
            self.check_acyclic(descriptor.kind, &mut path, &mut done)?;
        }
        Ok(())
    }

    fn check_acyclic(
        &self,
        kind: ResourceKind,
        path: &mut Vec<ResourceKind>,
        done: &mut HashSet<ResourceKind>,
    ) -> Result<()> {
        if done.contains(&kind) {
            return Ok(());
        }
        if path.contains(&kind) {
            let cycle = path
                .iter()
                .chain(std::iter::once(&kind))
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(OstackError::Config(format!("dependency cycle: {cycle}")));
        }

        path.push(kind);
        if let Some(descriptor) = self.descriptors.get(&kind) {
            for dependency in descriptor.dependencies {
                self.check_acyclic(*dependency, path, done)?;
            }
        }
        path.pop();
        done.insert(kind);
        Ok(())
    }
}

// =============================================================================
// List arguments
// =============================================================================

fn image_arguments(_context: &Context) -> Result<Value> {
    Ok(json!({ "limit": IMAGE_LIST_LIMIT }))
}

fn project_arguments(context: &Context) -> Result<Value> {
    let user_id = context
        .user_id
        .as_deref()
        .ok_or(OstackError::MissingContext("user_id"))?;
    Ok(json!({ "user_id": user_id }))
}

// =============================================================================
// Descriptors
// =============================================================================

fn server() -> ResourceDescriptor {
    ResourceDescriptor {
        kind: ResourceKind::Server,
        service: Service::Compute,
        list_method: "list_servers",
        response_path: "servers",
        id_field: "id",
        list_arguments: None,
        default_columns: &["name", "addresses", "compute_host", "id"],
        formatters: IndexMap::from([
            ("addresses", Formatter::simple(formatter::addresses)),
            ("compute_host", Formatter::optional("OS-EXT-SRV-ATTR:host")),
            ("hypervisor", Formatter::optional("OS-EXT-SRV-ATTR:hypervisor_hostname")),
            ("flavor_name", Formatter::renamed("flavor", formatter::flavor_name)),
            (
                "image_name",
                Formatter::reference(ResourceKind::Image, &["image", "id"], "name"),
            ),
            (
                "project_name",
                Formatter::reference(ResourceKind::Project, &["tenant_id"], "name"),
            ),
            ("mine", Formatter::computed(formatter::owned_by_current_project)),
            (
                "volume_count",
                Formatter::renamed("os-extended-volumes:volumes_attached", formatter::array_len),
            ),
            ("created", Formatter::simple(formatter::date_only)),
        ]),
        dependencies: &[ResourceKind::Image, ResourceKind::Project],
        delete_method: "delete_server",
    }
}

fn image() -> ResourceDescriptor {
    ResourceDescriptor {
        kind: ResourceKind::Image,
        service: Service::Image,
        list_method: "list_images",
        response_path: "images",
        id_field: "id",
        list_arguments: Some(image_arguments),
        default_columns: &["name", "status", "size", "owner_name", "id"],
        formatters: IndexMap::from([
            ("size_gb", Formatter::renamed("size", formatter::bytes_to_gib)),
            (
                "owner_name",
                Formatter::reference(ResourceKind::Project, &["owner"], "name"),
            ),
            ("created", Formatter::renamed("created_at", formatter::date_only)),
        ]),
        dependencies: &[ResourceKind::Project],
        delete_method: "delete_image",
    }
}

fn port() -> ResourceDescriptor {
    ResourceDescriptor {
        kind: ResourceKind::Port,
        service: Service::Network,
        list_method: "list_ports",
        response_path: "ports",
        id_field: "id",
        list_arguments: None,
        default_columns: &[
            "name",
            "network_name",
            "fixed_ips",
            "server_name",
            "host",
            "status",
            "id",
        ],
        formatters: IndexMap::from([
            ("fixed_ips", Formatter::simple(formatter::fixed_ips)),
            (
                "network_name",
                Formatter::reference(ResourceKind::Network, &["network_id"], "name"),
            ),
            (
                "server_name",
                Formatter::reference(ResourceKind::Server, &["device_id"], "name"),
            ),
            ("host", Formatter::alias("binding:host_id")),
        ]),
        dependencies: &[ResourceKind::Network, ResourceKind::Server],
        delete_method: "delete_port",
    }
}

fn network() -> ResourceDescriptor {
    ResourceDescriptor {
        kind: ResourceKind::Network,
        service: Service::Network,
        list_method: "list_networks",
        response_path: "networks",
        id_field: "id",
        list_arguments: None,
        default_columns: &["name", "status", "subnet_count", "shared", "project_name", "id"],
        formatters: IndexMap::from([
            ("subnet_count", Formatter::renamed("subnets", formatter::array_len)),
            (
                "project_name",
                Formatter::reference(ResourceKind::Project, &["project_id"], "name"),
            ),
        ]),
        dependencies: &[ResourceKind::Project],
        delete_method: "delete_network",
    }
}

fn baremetal_node() -> ResourceDescriptor {
    ResourceDescriptor {
        kind: ResourceKind::BaremetalNode,
        service: Service::Baremetal,
        list_method: "list_nodes",
        response_path: "nodes",
        id_field: "uuid",
        list_arguments: None,
        default_columns: &[
            "name",
            "power_state",
            "provision_state",
            "maintenance",
            "instance_name",
            "uuid",
        ],
        formatters: IndexMap::from([(
            "instance_name",
            Formatter::reference(ResourceKind::Server, &["instance_uuid"], "name"),
        )]),
        dependencies: &[ResourceKind::Server],
        delete_method: "delete_node",
    }
}

fn volume() -> ResourceDescriptor {
    ResourceDescriptor {
        kind: ResourceKind::Volume,
        service: Service::Volume,
        list_method: "list_volumes",
        response_path: "volumes",
        id_field: "id",
        list_arguments: None,
        default_columns: &["name", "status", "size", "attached_to", "id"],
        formatters: IndexMap::from([
            ("attached_to", Formatter::computed(formatter::attached_servers)),
            ("created", Formatter::renamed("created_at", formatter::date_only)),
        ]),
        dependencies: &[ResourceKind::Server],
        delete_method: "delete_volume",
    }
}

fn project() -> ResourceDescriptor {
    ResourceDescriptor {
        kind: ResourceKind::Project,
        service: Service::Identity,
        list_method: "list_user_projects",
        response_path: "projects",
        id_field: "id",
        list_arguments: Some(project_arguments),
        default_columns: &["name", "enabled", "domain_id", "description", "id"],
        formatters: IndexMap::new(),
        dependencies: &[],
        delete_method: "delete_project",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_kind() {
        let registry = Registry::global();
        for kind in ResourceKind::ALL {
            let descriptor = registry.get(kind).expect("kind should be registered");
            assert_eq!(descriptor.kind, kind);
            assert_eq!(registry.lookup(kind.as_str()).unwrap().kind, kind);
        }
    }

    #[test]
    fn test_builtin_registry_validates() {
        Registry::builtin().validate().expect("builtin registry is valid");
    }

    #[test]
    fn test_no_kind_depends_on_itself() {
        let registry = Registry::global();
        for kind in registry.kinds() {
            let descriptor = registry.get(kind).unwrap();
            assert!(
                !descriptor.dependencies.contains(&kind),
                "{kind} depends on itself"
            );
        }
    }

    #[test]
    fn test_lookup_unknown_kind_lists_valid_kinds() {
        let err = Registry::global().lookup("router").unwrap_err();
        match err {
            OstackError::UnknownKind { kind, valid } => {
                assert_eq!(kind, "router");
                assert!(valid.contains(&"baremetal-node".to_string()));
                assert_eq!(valid.len(), ResourceKind::ALL.len());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fetch_set_starts_with_target() {
        let descriptor = Registry::global().get(ResourceKind::Port).unwrap();
        assert_eq!(
            descriptor.fetch_set(),
            vec![ResourceKind::Port, ResourceKind::Network, ResourceKind::Server]
        );
    }

    #[test]
    fn test_project_arguments_need_user_id() {
        let descriptor = Registry::global().get(ResourceKind::Project).unwrap();

        let err = descriptor.list_arguments(&Context::default()).unwrap_err();
        assert!(matches!(err, OstackError::MissingContext("user_id")));

        let context = Context::new(Some("u1".to_string()), None);
        assert_eq!(
            descriptor.list_arguments(&context).unwrap(),
            json!({"user_id": "u1"})
        );
    }

    #[test]
    fn test_validate_detects_cycles() {
        let mut a = project();
        a.dependencies = &[ResourceKind::Server];
        let mut b = server();
        b.dependencies = &[ResourceKind::Project];

        let err = Registry::from_descriptors([a, b]).validate().unwrap_err();
        assert!(err.to_string().contains("dependency cycle"));
    }

    #[test]
    fn test_validate_detects_unregistered_dependency() {
        let err = Registry::from_descriptors([server()]).validate().unwrap_err();
        assert!(err.to_string().contains("unregistered"));
    }
}
