//! ZCL (Zigbee Cluster Library) foundation types
//!
//! This crate provides the shared ZCL vocabulary used by the attribute
//! reporting engine: data-type tags, multi-byte value decoding, cluster and
//! attribute identifiers, and the collaborator traits for attribute lookup
//! and binding queries.

pub mod attribute;
pub mod cluster;
pub mod types;

pub use attribute::{Attribute, AttributeStore, BindingTable, InMemoryAttributes, InMemoryBindings};
pub use types::DataType;
