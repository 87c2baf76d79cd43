//! Request classification.
//!
//! Maps an incoming request to a caching policy bucket: which strategy
//! runs it and which namespace role it reads/writes. Rules are evaluated
//! in order, first match wins.

use holdfast_core::request::{Destination, Request};
use holdfast_core::NamespaceRole;

/// One of the three request-handling algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

/// Outcome of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// The layer handles the request with the given strategy and namespace.
    Handle { strategy: Strategy, role: NamespaceRole },
    /// The request uses a scheme the layer cannot cache; it passes
    /// through to the network unmodified.
    Passthrough,
}

/// Classify a request into a (strategy, namespace role) pair.
///
/// 1. Non-http(s) schemes pass through entirely.
/// 2. `/api/` paths are network-first against the api namespace.
/// 3. Stylesheets and scripts are stale-while-revalidate against static.
/// 4. Images and fonts are cache-first against static.
/// 5. Documents (and anything else) are network-first against dynamic.
pub fn classify(request: &Request) -> RouteDecision {
    if !request.has_interceptable_scheme() {
        return RouteDecision::Passthrough;
    }

    if request.url.path().starts_with("/api/") {
        return RouteDecision::Handle { strategy: Strategy::NetworkFirst, role: NamespaceRole::Api };
    }

    match request.destination {
        Destination::Style | Destination::Script => {
            RouteDecision::Handle { strategy: Strategy::StaleWhileRevalidate, role: NamespaceRole::Static }
        }
        Destination::Image | Destination::Font => {
            RouteDecision::Handle { strategy: Strategy::CacheFirst, role: NamespaceRole::Static }
        }
        Destination::Document | Destination::Other => {
            RouteDecision::Handle { strategy: Strategy::NetworkFirst, role: NamespaceRole::Dynamic }
        }
    }
}
