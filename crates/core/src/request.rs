//! Request model seen by the interception layer.
//!
//! The host application hands every outbound request to the layer as a
//! [`Request`]. The destination is supplied by the host (it knows what
//! kind of resource it is asking for); the layer never guesses.

use crate::Error;
use serde::{Deserialize, Serialize};
use url::Url;

/// HTTP method of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Only GET responses are ever persisted to a namespace.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Method::Get)
    }

    /// Mutating methods are candidates for the deferred mutation queue.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch | Method::Delete)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of resource the request is for, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Other,
}

/// An intercepted outbound request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Build a GET request for a URL that is already canonical.
    pub fn get(url: Url, destination: Destination) -> Self {
        Self { method: Method::Get, url, destination, body: None }
    }

    pub fn new(method: Method, url: Url, destination: Destination, body: Option<Vec<u8>>) -> Self {
        Self { method, url, destination, body }
    }

    /// Whether the request uses a scheme the layer intercepts at all.
    ///
    /// Extension pseudo-schemes and the like pass through unmodified.
    pub fn has_interceptable_scheme(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// Resolve a site-relative path (e.g. a manifest asset) against an origin.
    pub fn for_asset(origin: &Url, path: &str) -> Result<Self, Error> {
        if !path.starts_with('/') {
            return Err(Error::InvalidRequest(format!("asset path must be absolute: {path}")));
        }
        let url = origin
            .join(path)
            .map_err(|e| Error::InvalidRequest(format!("cannot resolve {path}: {e}")))?;
        Ok(Self::get(url, Destination::Other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_cacheable() {
        assert!(Method::Get.is_cacheable());
        assert!(!Method::Head.is_cacheable());
        assert!(!Method::Post.is_cacheable());
    }

    #[test]
    fn test_method_mutation() {
        assert!(Method::Post.is_mutation());
        assert!(Method::Delete.is_mutation());
        assert!(!Method::Get.is_mutation());
    }

    #[test]
    fn test_interceptable_scheme() {
        let req = Request::get(Url::parse("https://app.example/api/docs").unwrap(), Destination::Other);
        assert!(req.has_interceptable_scheme());

        let ext = Request::get(
            Url::parse("chrome-extension://abcdef/page.html").unwrap(),
            Destination::Document,
        );
        assert!(!ext.has_interceptable_scheme());
    }

    #[test]
    fn test_for_asset_resolves_against_origin() {
        let origin = Url::parse("https://app.example").unwrap();
        let req = Request::for_asset(&origin, "/app.js").unwrap();
        assert_eq!(req.url.as_str(), "https://app.example/app.js");
        assert_eq!(req.method, Method::Get);
    }

    #[test]
    fn test_for_asset_rejects_relative() {
        let origin = Url::parse("https://app.example").unwrap();
        let result = Request::for_asset(&origin, "app.js");
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }
}
