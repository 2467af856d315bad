//! OpenStack API interaction module
//!
//! # Module Structure
//!
//! - [`client`] - Main client, implements [`Provider`](crate::provider::Provider)
//! - [`dispatch`] - Method names to REST paths
//! - [`http`] - HTTP utilities for REST API calls
//! - [`identity`] - Token introspection for the acting user and project
//!
//! # Example
//!
//! ```ignore
//! use ostack::openstack::client::OpenStackClient;
//!
//! async fn example(cloud: &CloudConfig) -> anyhow::Result<()> {
//!     let client = OpenStackClient::new(cloud)?;
//!     let servers = client.get(Service::Compute, "servers/detail").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod dispatch;
pub mod http;
pub mod identity;

pub use client::OpenStackClient;
