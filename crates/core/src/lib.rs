//! Core types and shared functionality for the holdfast offline layer.
//!
//! This crate provides:
//! - The versioned namespace store with SQLite backend
//! - The request/response model seen by the interception layer
//! - Layered configuration
//! - Unified error types

pub mod cache;
pub mod config;
pub mod error;
pub mod request;

pub use cache::{CachedEntry, NamespaceRole, NamespaceSet, StoreDb, StoredResponse, VersionTag};
pub use config::AppConfig;
pub use error::Error;
pub use request::{Destination, Method, Request};
