// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! The context passed to every encode and decode call.

use std::sync::Arc;

use crate::{DecodingOptions, NamespaceMap, TypeRegistry};

/// Borrowed encoding context: the namespace table, the type registry used to
/// resolve `ExtensionObject` bodies, and the decoding limits.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    namespaces: &'a NamespaceMap,
    registry: &'a TypeRegistry,
    options: DecodingOptions,
}

impl<'a> Context<'a> {
    /// Create a new context.
    pub fn new(
        namespaces: &'a NamespaceMap,
        registry: &'a TypeRegistry,
        options: DecodingOptions,
    ) -> Self {
        Self {
            namespaces,
            registry,
            options,
        }
    }

    /// Decoding limits.
    pub fn options(&self) -> &DecodingOptions {
        &self.options
    }

    /// Type registry.
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Namespace table.
    pub fn namespaces(&self) -> &'a NamespaceMap {
        self.namespaces
    }
}

/// Owned version of [`Context`], kept by long lived components such as a
/// secure channel.
#[derive(Debug, Clone)]
pub struct ContextOwned {
    namespaces: NamespaceMap,
    registry: Arc<TypeRegistry>,
    options: DecodingOptions,
}

impl ContextOwned {
    /// Create a new context.
    pub fn new(
        namespaces: NamespaceMap,
        registry: Arc<TypeRegistry>,
        options: DecodingOptions,
    ) -> Self {
        Self {
            namespaces,
            registry,
            options,
        }
    }

    /// Create a context using the core type registry.
    pub fn new_default(namespaces: NamespaceMap, options: DecodingOptions) -> Self {
        Self::new(namespaces, TypeRegistry::core(), options)
    }

    /// Borrow as a [`Context`]. Each borrowed context starts with a fresh
    /// recursion gauge.
    pub fn context(&self) -> Context<'_> {
        Context {
            namespaces: &self.namespaces,
            registry: &self.registry,
            options: self.options.clone(),
        }
    }

    /// Namespace table.
    pub fn namespaces(&self) -> &NamespaceMap {
        &self.namespaces
    }

    /// Mutable namespace table.
    pub fn namespaces_mut(&mut self) -> &mut NamespaceMap {
        &mut self.namespaces
    }

    /// Type registry.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Replace the type registry.
    pub fn set_registry(&mut self, registry: Arc<TypeRegistry>) {
        self.registry = registry;
    }

    /// Decoding limits.
    pub fn options(&self) -> &DecodingOptions {
        &self.options
    }

    /// Mutable decoding limits.
    pub fn options_mut(&mut self) -> &mut DecodingOptions {
        &mut self.options
    }
}

impl Default for ContextOwned {
    fn default() -> Self {
        Self::new_default(Default::default(), Default::default())
    }
}
