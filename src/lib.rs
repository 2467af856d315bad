//! ostack - query and bulk-manage OpenStack resources
//!
//! The [`resource`] module holds the resource registry and the resolution
//! engine; [`openstack`] is the REST provider they run against.

pub mod config;
pub mod error;
pub mod openstack;
pub mod output;
pub mod provider;
pub mod resource;

pub use error::{OstackError, Result};
