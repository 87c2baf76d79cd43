//! SQLite-backed namespace store for the offline layer.
//!
//! This module provides the versioned, named cache namespaces behind the
//! strategy engine, with async access via tokio-rusqlite. It supports:
//!
//! - Request-identity keys using SHA-256 hashing
//! - Namespace create/enumerate/delete with cascading entry deletion
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - The pending mutation queue's persistence

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod mutations;
pub mod naming;

pub use crate::Error;

pub use connection::StoreDb;
pub use entries::{CachedEntry, StoredResponse};
pub use mutations::{MutationStatus, PendingMutation};
pub use naming::{is_layer_namespace, NamespaceRole, NamespaceSet, VersionTag};
