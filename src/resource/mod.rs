//! Resource abstraction layer
//!
//! Each OpenStack resource kind is described declaratively by a
//! [`ResourceDescriptor`]: how to list it, which other kinds must be fetched to
//! resolve its cross-references, which columns it shows by default and how each
//! column is computed.
//!
//! # Architecture
//!
//! - [`registry`] - Static descriptor table, one entry per [`ResourceKind`]
//! - [`formatter`] - Column formatters (simple, renamed, cross-referencing)
//! - [`fetcher`] - Lists one kind through a [`Provider`](crate::provider::Provider)
//! - [`resolve`] - Turns fetched collections into filtered output rows
//! - [`delete`] - Best-effort bulk deletion
//!
//! # Example
//!
//! ```ignore
//! use ostack::resource::{resolve, ListRequest, Registry};
//!
//! async fn list_servers(client: &OpenStackClient, context: &Context) -> ostack::Result<()> {
//!     let request = ListRequest::new(vec![], vec![]);
//!     let resolved = resolve("server", &request, Registry::global(), client, context).await?;
//!     println!("{} servers", resolved.rows.len());
//!     Ok(())
//! }
//! ```

pub mod delete;
pub mod fetcher;
pub mod formatter;
pub mod registry;
pub mod resolve;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One resource as returned by the provider
pub type RawResource = Map<String, Value>;

/// Resources of one kind keyed by ID, in provider order
pub type ResourceCollection = IndexMap<String, RawResource>;

/// Every collection fetched during one invocation
pub type Collections = HashMap<ResourceKind, ResourceCollection>;

pub use delete::{delete, DeleteFailure, DeleteReport, DeleteTarget, DeleteTargets};
pub use fetcher::{fetch, fetch_with_dependencies};
pub use formatter::{Formatter, Lookup, UNKNOWN};
pub use registry::{Registry, ResourceDescriptor, ResourceKind};
pub use resolve::{resolve, resolve_rows, valid_fields, ListRequest, Matcher, OutputRow, Resolved};
