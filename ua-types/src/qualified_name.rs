// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `QualifiedName`.

use std::fmt::Display;

use crate::string::UAString;

/// A name qualified by a namespace index.
#[derive(
    PartialEq,
    Debug,
    Clone,
    Eq,
    Hash,
    Default,
    crate::BinaryEncodable,
    crate::BinaryDecodable,
    crate::XmlEncodable,
    crate::XmlDecodable,
    crate::XmlType,
)]
pub struct QualifiedName {
    /// The namespace index.
    pub namespace_index: u16,
    /// The name.
    pub name: UAString,
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace_index > 0 {
            write!(f, "{}:{}", self.namespace_index, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(value: &str) -> Self {
        Self::new(0, value)
    }
}

impl QualifiedName {
    /// Create a new qualified name.
    pub fn new(namespace_index: u16, name: impl Into<UAString>) -> QualifiedName {
        QualifiedName {
            namespace_index,
            name: name.into(),
        }
    }

    /// The null qualified name.
    pub fn null() -> QualifiedName {
        QualifiedName {
            namespace_index: 0,
            name: UAString::null(),
        }
    }

    /// `true` if namespace is 0 and the name is null.
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && self.name.is_null()
    }

    /// Parse `ns:name`. Anything that does not start with a numeric prefix is
    /// taken as a name in namespace 0.
    pub fn parse(raw: &str) -> QualifiedName {
        match raw.split_once(':') {
            Some((ns, name)) => match ns.parse::<u16>() {
                Ok(ns) => QualifiedName::new(ns, name),
                Err(_) => QualifiedName::new(0, raw),
            },
            None => QualifiedName::new(0, raw),
        }
    }
}
