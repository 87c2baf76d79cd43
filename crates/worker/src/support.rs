//! Scripted network for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use holdfast_client::{FetchedResponse, Net};
use holdfast_core::request::Request;
use holdfast_core::Error;

/// A `Net` implementation serving scripted responses by URL.
///
/// Unrouted URLs fail with `NetworkUnavailable`, which doubles as the
/// offline simulation. Every fetch attempt is counted.
#[derive(Default)]
pub struct FakeNet {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    calls: AtomicUsize,
}

impl FakeNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for a URL.
    pub fn respond(&self, url: &str, status: u16, body: &[u8]) {
        self.routes
            .lock()
            .expect("routes lock poisoned")
            .insert(url.to_string(), (status, body.to_vec()));
    }

    /// Remove a scripted response, making the URL unreachable again.
    pub fn drop_route(&self, url: &str) {
        self.routes.lock().expect("routes lock poisoned").remove(url);
    }

    /// Number of fetch attempts made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Net for FakeNet {
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let routes = self.routes.lock().expect("routes lock poisoned");
        match routes.get(request.url.as_str()) {
            Some((status, body)) => Ok(FetchedResponse {
                status: *status,
                headers: vec![("content-type".to_string(), "application/octet-stream".to_string())],
                body: Bytes::from(body.clone()),
                fetch_ms: 0,
            }),
            None => Err(Error::NetworkUnavailable(format!("no route to {}", request.url))),
        }
    }
}
