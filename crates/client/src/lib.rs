//! Network client for the holdfast offline layer.
//!
//! This crate provides the HTTP fetch pipeline behind the [`fetch::Net`]
//! trait, plus URL canonicalization for request identity.

pub mod fetch;

pub use fetch::{canonicalize, FetchConfig, FetchedResponse, Net, NetClient};
