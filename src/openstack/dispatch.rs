//! Method dispatch
//!
//! Maps the listing and delete method names used by the registry to concrete
//! OpenStack REST paths, relative to each service's endpoint.

use crate::provider::Service;
use anyhow::{Context, Result};
use serde_json::Value;

/// Parameters consumed by the path, never sent as query arguments
const PATH_PARAMS: &[&str] = &["user_id"];

/// Relative path (with query string) for a listing method
pub fn list_path(service: Service, method: &str, params: &Value) -> Result<String> {
    let path = match (service, method) {
        (Service::Compute, "list_servers") => "servers/detail".to_string(),
        (Service::Image, "list_images") => "v2/images".to_string(),
        (Service::Network, "list_ports") => "v2.0/ports".to_string(),
        (Service::Network, "list_networks") => "v2.0/networks".to_string(),
        (Service::Baremetal, "list_nodes") => "v1/nodes/detail".to_string(),
        (Service::Volume, "list_volumes") => "volumes/detail".to_string(),
        (Service::Identity, "list_user_projects") => {
            let user_id = get_param_str(params, "user_id")?;
            format!("v3/users/{}/projects", urlencoding::encode(&user_id))
        }
        _ => return Err(anyhow::anyhow!("Unknown list method: {}.{}", service, method)),
    };

    Ok(add_query_params(&path, params))
}

/// Relative path for deleting one resource
pub fn delete_path(service: Service, method: &str, id: &str) -> Result<String> {
    let collection = match (service, method) {
        (Service::Compute, "delete_server") => "servers",
        (Service::Image, "delete_image") => "v2/images",
        (Service::Network, "delete_port") => "v2.0/ports",
        (Service::Network, "delete_network") => "v2.0/networks",
        (Service::Baremetal, "delete_node") => "v1/nodes",
        (Service::Volume, "delete_volume") => "volumes",
        (Service::Identity, "delete_project") => "v3/projects",
        _ => return Err(anyhow::anyhow!("Unknown delete method: {}.{}", service, method)),
    };

    Ok(format!("{}/{}", collection, urlencoding::encode(id)))
}

/// Microversion headers requested per service
pub fn microversion_headers(service: Service) -> &'static [(&'static str, &'static str)] {
    match service {
        // 2.47 embeds the flavor (with original_name) in server details
        Service::Compute => &[("OpenStack-API-Version", "compute 2.47")],
        // node names need >= 1.5
        Service::Baremetal => &[("X-OpenStack-Ironic-API-Version", "latest")],
        _ => &[],
    }
}

fn get_param_str(params: &Value, key: &str) -> Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .context(format!("Missing required parameter: {}", key))
}

fn add_query_params(path: &str, params: &Value) -> String {
    let Value::Object(map) = params else {
        return path.to_string();
    };

    let mut query_parts: Vec<String> = Vec::new();

    for (key, value) in map {
        if PATH_PARAMS.contains(&key.as_str()) {
            continue;
        }

        match value {
            Value::String(s) => {
                query_parts.push(format!("{}={}", key, urlencoding::encode(s)));
            }
            Value::Number(n) => {
                query_parts.push(format!("{}={}", key, n));
            }
            Value::Bool(b) => {
                query_parts.push(format!("{}={}", key, b));
            }
            Value::Array(arr) => {
                for item in arr {
                    if let Value::String(s) = item {
                        query_parts.push(format!("{}={}", key, urlencoding::encode(s)));
                    }
                }
            }
            _ => {}
        }
    }

    if query_parts.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query_parts.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_paths() {
        assert_eq!(
            list_path(Service::Compute, "list_servers", &json!({})).unwrap(),
            "servers/detail"
        );
        assert_eq!(
            list_path(Service::Image, "list_images", &json!({"limit": "1000"})).unwrap(),
            "v2/images?limit=1000"
        );
    }

    #[test]
    fn test_user_projects_path_consumes_user_id() {
        let path = list_path(
            Service::Identity,
            "list_user_projects",
            &json!({"user_id": "a b"}),
        )
        .unwrap();
        assert_eq!(path, "v3/users/a%20b/projects");
    }

    #[test]
    fn test_user_projects_requires_user_id() {
        assert!(list_path(Service::Identity, "list_user_projects", &json!({})).is_err());
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        assert!(list_path(Service::Compute, "list_routers", &json!({})).is_err());
        assert!(delete_path(Service::Image, "delete_server", "x").is_err());
    }

    #[test]
    fn test_delete_paths_encode_id() {
        assert_eq!(
            delete_path(Service::Compute, "delete_server", "s1").unwrap(),
            "servers/s1"
        );
        assert_eq!(
            delete_path(Service::Baremetal, "delete_node", "n/1").unwrap(),
            "v1/nodes/n%2F1"
        );
    }

    #[test]
    fn test_query_params_support_arrays() {
        let path = add_query_params("v2.0/ports", &json!({"status": ["ACTIVE", "DOWN"]}));
        assert_eq!(path, "v2.0/ports?status=ACTIVE&status=DOWN");
    }
}
