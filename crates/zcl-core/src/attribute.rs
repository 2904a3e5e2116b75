//! Attribute records and the collaborator traits supplied by the stack

use crate::types::DataType;
use bytes::Bytes;
use dashmap::{DashMap, DashSet};

/// A typed attribute value as held by the attribute storage layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute ID within its cluster
    pub id: u16,
    /// ZCL data type tag
    pub data_type: DataType,
    /// Current value, little-endian wire encoding
    pub value: Bytes,
}

impl Attribute {
    #[must_use]
    pub fn new(id: u16, data_type: DataType, value: impl Into<Bytes>) -> Self {
        Self {
            id,
            data_type,
            value: value.into(),
        }
    }
}

/// Attribute lookup, supplied by the attribute storage layer
pub trait AttributeStore: Send + Sync {
    /// Find the current value of an attribute, or `None` if the
    /// cluster/attribute is not registered on the endpoint.
    fn find(&self, endpoint: u8, cluster_id: u16, attr_id: u16) -> Option<Attribute>;
}

/// Destination binding query, supplied by the stack's binding table
pub trait BindingTable: Send + Sync {
    /// Whether a destination binding exists for (cluster, endpoint).
    fn has_binding(&self, cluster_id: u16, endpoint: u8) -> bool;
}

/// In-memory attribute registry keyed by (endpoint, cluster, attribute)
#[derive(Debug, Default)]
pub struct InMemoryAttributes {
    attrs: DashMap<(u8, u16, u16), Attribute>,
}

impl InMemoryAttributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite an attribute value
    pub fn set(&self, endpoint: u8, cluster_id: u16, attr: Attribute) {
        self.attrs.insert((endpoint, cluster_id, attr.id), attr);
    }

    /// Update the value of an already-registered attribute
    pub fn set_value(&self, endpoint: u8, cluster_id: u16, attr_id: u16, value: impl Into<Bytes>) {
        if let Some(mut entry) = self.attrs.get_mut(&(endpoint, cluster_id, attr_id)) {
            entry.value = value.into();
        }
    }
}

impl AttributeStore for InMemoryAttributes {
    fn find(&self, endpoint: u8, cluster_id: u16, attr_id: u16) -> Option<Attribute> {
        self.attrs
            .get(&(endpoint, cluster_id, attr_id))
            .map(|r| r.value().clone())
    }
}

/// In-memory binding table keyed by (cluster, endpoint)
#[derive(Debug, Default)]
pub struct InMemoryBindings {
    bindings: DashSet<(u16, u8)>,
}

impl InMemoryBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, cluster_id: u16, endpoint: u8) {
        self.bindings.insert((cluster_id, endpoint));
    }

    pub fn unbind(&self, cluster_id: u16, endpoint: u8) {
        self.bindings.remove(&(cluster_id, endpoint));
    }
}

impl BindingTable for InMemoryBindings {
    fn has_binding(&self, cluster_id: u16, endpoint: u8) -> bool {
        self.bindings.contains(&(cluster_id, endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup() {
        let store = InMemoryAttributes::new();
        store.set(1, 0x0702, Attribute::new(0x0301, DataType::Uint24, vec![1, 0, 0]));

        let attr = store.find(1, 0x0702, 0x0301).unwrap();
        assert_eq!(attr.data_type, DataType::Uint24);
        assert!(store.find(1, 0x0702, 0x0302).is_none());
        assert!(store.find(2, 0x0702, 0x0301).is_none());
    }

    #[test]
    fn test_set_value_updates_existing_only() {
        let store = InMemoryAttributes::new();
        store.set(1, 0x0B04, Attribute::new(0x0505, DataType::Uint16, vec![0, 0]));
        store.set_value(1, 0x0B04, 0x0505, vec![0x10, 0x01]);
        assert_eq!(store.find(1, 0x0B04, 0x0505).unwrap().value.as_ref(), &[0x10, 0x01]);

        // No-op for unregistered attribute
        store.set_value(1, 0x0B04, 0x0508, vec![1, 0]);
        assert!(store.find(1, 0x0B04, 0x0508).is_none());
    }

    #[test]
    fn test_binding_table() {
        let bindings = InMemoryBindings::new();
        assert!(!bindings.has_binding(0x0702, 1));
        bindings.bind(0x0702, 1);
        assert!(bindings.has_binding(0x0702, 1));
        bindings.unbind(0x0702, 1);
        assert!(!bindings.has_binding(0x0702, 1));
    }
}
