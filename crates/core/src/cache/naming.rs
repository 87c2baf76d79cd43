//! Namespace naming scheme and generation identity.
//!
//! Every generation owns three namespaces, one per role, named
//! `<product>-v<schema>-<buildId>-<role>`. Anything starting with
//! `<product>-` is recognized as belonging to the layer, so stale
//! generations can be garbage-collected without knowing their tags.

use serde::{Deserialize, Serialize};

/// Bumped only when the namespace layout itself changes shape.
pub const NAMING_SCHEMA: u32 = 1;

/// Role a namespace plays within one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceRole {
    Static,
    Dynamic,
    Api,
}

impl NamespaceRole {
    pub const ALL: [NamespaceRole; 3] = [NamespaceRole::Static, NamespaceRole::Dynamic, NamespaceRole::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            NamespaceRole::Static => "static",
            NamespaceRole::Dynamic => "dynamic",
            NamespaceRole::Api => "api",
        }
    }
}

impl std::fmt::Display for NamespaceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier for one deployed generation, e.g. a build timestamp.
///
/// Created once per deployment and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three namespace names for one generation of one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSet {
    product: String,
    tag: VersionTag,
}

impl NamespaceSet {
    pub fn new(product: impl Into<String>, tag: VersionTag) -> Self {
        Self { product: product.into(), tag }
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn tag(&self) -> &VersionTag {
        &self.tag
    }

    /// Namespace name for a role within this generation.
    pub fn name_for(&self, role: NamespaceRole) -> String {
        format!("{}-v{}-{}-{}", self.product, NAMING_SCHEMA, self.tag, role)
    }

    /// All three namespace names for this generation.
    pub fn all(&self) -> [String; 3] {
        NamespaceRole::ALL.map(|role| self.name_for(role))
    }

    /// Whether a namespace name belongs to this generation.
    pub fn contains(&self, name: &str) -> bool {
        NamespaceRole::ALL.iter().any(|role| self.name_for(*role) == name)
    }
}

/// Whether a namespace name belongs to this caching layer at all,
/// regardless of generation. Used for garbage collection on activation.
pub fn is_layer_namespace(product: &str, name: &str) -> bool {
    name.len() > product.len() && name.starts_with(product) && name.as_bytes()[product.len()] == b'-'
}
