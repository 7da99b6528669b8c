// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Namespace table.

use hashbrown::HashMap;

/// URI of namespace 0.
pub const OPC_UA_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

/// Maps namespace URIs to the indexes used in node ids.
#[derive(Debug, Clone)]
pub struct NamespaceMap {
    known_namespaces: HashMap<String, u16>,
}

impl Default for NamespaceMap {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceMap {
    /// A map holding only namespace 0.
    pub fn new() -> Self {
        let mut known_namespaces = HashMap::new();
        known_namespaces.insert(OPC_UA_NAMESPACE_URI.to_owned(), 0u16);
        Self { known_namespaces }
    }

    /// Add a namespace and return its index. Adding a known namespace returns
    /// the existing index.
    pub fn add_namespace(&mut self, namespace: &str) -> u16 {
        if let Some(ns) = self.known_namespaces.get(namespace) {
            return *ns;
        }
        let next = self
            .known_namespaces
            .values()
            .max()
            .map(|m| m + 1)
            .unwrap_or_default();
        self.known_namespaces.insert(namespace.to_owned(), next);
        next
    }

    /// Index of `ns`, if known.
    pub fn get_index(&self, ns: &str) -> Option<u16> {
        self.known_namespaces.get(ns).copied()
    }

    /// All known namespaces.
    pub fn known_namespaces(&self) -> &HashMap<String, u16> {
        &self.known_namespaces
    }
}
