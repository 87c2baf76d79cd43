//! The three caching strategies.
//!
//! Each strategy is an async contract over (request, namespace) ->
//! response. Persistence is uniform across all three: only a GET
//! response with status exactly 200 is ever written to a namespace.
//!
//! Stale-while-revalidate hands its background refresh back to the
//! caller as a task handle; the host may await it or drop it.

use std::sync::Arc;

use holdfast_core::cache::{CachedEntry, NamespaceRole, NamespaceSet, StoreDb, StoredResponse};
use holdfast_core::request::{Destination, Request};
use holdfast_core::Error;
use holdfast_client::{FetchedResponse, Net};
use tokio::task::JoinHandle;
use url::Url;

use crate::classify::Strategy;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
    Cache,
    Network,
    Fallback,
}

/// A response produced by a strategy, plus any background work it spawned.
#[derive(Debug)]
pub struct Served {
    pub response: StoredResponse,
    pub source: ServeSource,
    /// Set by stale-while-revalidate when a cached entry was returned
    /// and a refresh is in flight.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Served {
    fn cached(response: StoredResponse) -> Self {
        Self { response, source: ServeSource::Cache, revalidation: None }
    }

    fn network(response: StoredResponse) -> Self {
        Self { response, source: ServeSource::Network, revalidation: None }
    }

    fn fallback(response: StoredResponse) -> Self {
        Self { response, source: ServeSource::Fallback, revalidation: None }
    }
}

/// Executes strategies against one generation's namespaces.
pub struct StrategyEngine {
    store: StoreDb,
    net: Arc<dyn Net>,
    set: NamespaceSet,
    origin: Url,
    fallback_path: String,
}

impl StrategyEngine {
    pub fn new(
        store: StoreDb, net: Arc<dyn Net>, set: NamespaceSet, origin: Url, fallback_path: impl Into<String>,
    ) -> Self {
        Self { store, net, set, origin, fallback_path: fallback_path.into() }
    }

    pub fn namespace_set(&self) -> &NamespaceSet {
        &self.set
    }

    /// Run a strategy for a request against the namespace for `role`.
    pub async fn handle(&self, request: &Request, strategy: Strategy, role: NamespaceRole) -> Result<Served, Error> {
        let namespace = self.set.name_for(role);
        match strategy {
            Strategy::CacheFirst => self.cache_first(request, &namespace).await,
            Strategy::NetworkFirst => self.network_first(request, &namespace).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request, &namespace).await,
        }
    }

    /// Cache hit -> return it with zero network I/O. Miss -> fetch,
    /// store a 200, return; on fetch failure a document gets the
    /// offline fallback, everything else propagates.
    async fn cache_first(&self, request: &Request, namespace: &str) -> Result<Served, Error> {
        let key = CachedEntry::key_for(request);
        if let Some(entry) = self.store.get_entry(namespace, &key).await? {
            tracing::debug!(url = %request.url, "cache-first hit");
            return Ok(Served::cached(entry.response));
        }

        match self.net.fetch(request).await {
            Ok(fetched) => {
                self.maybe_store(namespace, request, &fetched).await?;
                Ok(Served::network(fetched.to_stored()))
            }
            Err(err) => self.fail_or_fallback(request, err).await,
        }
    }

    /// Network wins when it answers at all; a GET 200 is stored on the
    /// way out. On fetch failure fall back to cache, then to the
    /// offline fallback for documents.
    async fn network_first(&self, request: &Request, namespace: &str) -> Result<Served, Error> {
        match self.net.fetch(request).await {
            Ok(fetched) => {
                self.maybe_store(namespace, request, &fetched).await?;
                Ok(Served::network(fetched.to_stored()))
            }
            Err(err) => {
                let key = CachedEntry::key_for(request);
                if let Some(entry) = self.store.get_entry(namespace, &key).await? {
                    tracing::debug!(url = %request.url, "network failed, serving cached entry");
                    return Ok(Served::cached(entry.response));
                }
                self.fail_or_fallback(request, err).await
            }
        }
    }

    /// Serve the cached entry immediately and refresh it in the
    /// background; a refresh failure leaves the entry untouched. On a
    /// miss, await the network inline.
    async fn stale_while_revalidate(&self, request: &Request, namespace: &str) -> Result<Served, Error> {
        let key = CachedEntry::key_for(request);
        match self.store.get_entry(namespace, &key).await? {
            Some(entry) => {
                let handle = self.spawn_revalidation(request.clone(), namespace.to_string());
                Ok(Served { response: entry.response, source: ServeSource::Cache, revalidation: Some(handle) })
            }
            None => {
                let fetched = self.net.fetch(request).await?;
                self.maybe_store(namespace, request, &fetched).await?;
                Ok(Served::network(fetched.to_stored()))
            }
        }
    }

    fn spawn_revalidation(&self, request: Request, namespace: String) -> JoinHandle<()> {
        let store = self.store.clone();
        let net = Arc::clone(&self.net);
        tokio::spawn(async move {
            match net.fetch(&request).await {
                Ok(fetched) if request.method.is_cacheable() && fetched.is_storable() => {
                    let entry = CachedEntry::new(&request, fetched.to_stored());
                    if let Err(err) = store.put_entry(&namespace, &entry).await {
                        tracing::warn!(%err, url = %request.url, "revalidation store failed");
                    }
                }
                Ok(fetched) => {
                    tracing::debug!(status = fetched.status, url = %request.url, "revalidation response not storable");
                }
                Err(err) => {
                    tracing::debug!(%err, url = %request.url, "revalidation failed, keeping cached entry");
                }
            }
        })
    }

    async fn maybe_store(&self, namespace: &str, request: &Request, fetched: &FetchedResponse) -> Result<(), Error> {
        if request.method.is_cacheable() && fetched.is_storable() {
            let entry = CachedEntry::new(request, fetched.to_stored());
            self.store.put_entry(namespace, &entry).await?;
        }
        Ok(())
    }

    /// Terminal failure path: documents are masked by the offline
    /// fallback when it is cached; everything else propagates.
    async fn fail_or_fallback(&self, request: &Request, err: Error) -> Result<Served, Error> {
        if request.destination == Destination::Document {
            let fallback = Request::for_asset(&self.origin, &self.fallback_path)?;
            let key = CachedEntry::key_for(&fallback);
            let static_ns = self.set.name_for(NamespaceRole::Static);
            if let Some(entry) = self.store.get_entry(&static_ns, &key).await? {
                tracing::debug!(url = %request.url, "serving offline fallback");
                return Ok(Served::fallback(entry.response));
            }
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::FakeNet;
    use holdfast_core::cache::VersionTag;
    use holdfast_core::request::Method;

    const STATIC_NS: &str = "holdfast-v1-test-static";
    const DYNAMIC_NS: &str = "holdfast-v1-test-dynamic";
    const API_NS: &str = "holdfast-v1-test-api";

    async fn engine() -> (StrategyEngine, Arc<FakeNet>, StoreDb) {
        let store = StoreDb::open_in_memory().await.unwrap();
        for ns in [STATIC_NS, DYNAMIC_NS, API_NS] {
            store.open_namespace(ns).await.unwrap();
        }
        let net = Arc::new(FakeNet::new());
        let set = NamespaceSet::new("holdfast", VersionTag::new("test"));
        let engine = StrategyEngine::new(
            store.clone(),
            net.clone() as Arc<dyn Net>,
            set,
            Url::parse("https://app.example").unwrap(),
            "/offline.html",
        );
        (engine, net, store)
    }

    fn get(url: &str, destination: Destination) -> Request {
        Request::get(Url::parse(url).unwrap(), destination)
    }

    async fn seed(store: &StoreDb, namespace: &str, request: &Request, body: &[u8]) {
        let entry = CachedEntry::new(
            request,
            StoredResponse { status: 200, headers: Vec::new(), body: body.to_vec() },
        );
        store.put_entry(namespace, &entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_first_hit_makes_no_network_call() {
        let (engine, net, store) = engine().await;
        let request = get("https://app.example/icon-192.png", Destination::Image);
        seed(&store, STATIC_NS, &request, b"png bytes").await;

        let served = engine
            .handle(&request, Strategy::CacheFirst, NamespaceRole::Static)
            .await
            .unwrap();

        assert_eq!(served.source, ServeSource::Cache);
        assert_eq!(served.response.body, b"png bytes");
        assert_eq!(net.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_miss_fetches_and_stores() {
        let (engine, net, store) = engine().await;
        let request = get("https://app.example/icon-192.png", Destination::Image);
        net.respond("https://app.example/icon-192.png", 200, b"fresh png");

        let served = engine
            .handle(&request, Strategy::CacheFirst, NamespaceRole::Static)
            .await
            .unwrap();

        assert_eq!(served.source, ServeSource::Network);
        assert_eq!(net.calls(), 1);

        let stored = store
            .get_entry(STATIC_NS, &CachedEntry::key_for(&request))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.response.body, b"fresh png");
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_non_200() {
        let (engine, net, store) = engine().await;
        let request = get("https://app.example/gone.png", Destination::Image);
        net.respond("https://app.example/gone.png", 404, b"not found");

        let served = engine
            .handle(&request, Strategy::CacheFirst, NamespaceRole::Static)
            .await
            .unwrap();

        assert_eq!(served.response.status, 404);
        assert!(store
            .get_entry(STATIC_NS, &CachedEntry::key_for(&request))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cache_first_subresource_failure_propagates() {
        let (engine, _net, _store) = engine().await;
        let request = get("https://app.example/icon-192.png", Destination::Image);

        let result = engine.handle(&request, Strategy::CacheFirst, NamespaceRole::Static).await;
        assert!(matches!(result, Err(Error::NetworkUnavailable(_))));
    }

    #[tokio::test]
    async fn test_network_first_stores_get_200() {
        let (engine, net, store) = engine().await;
        let request = get("https://app.example/api/docs", Destination::Other);
        net.respond("https://app.example/api/docs", 200, b"[1,2,3]");

        let served = engine
            .handle(&request, Strategy::NetworkFirst, NamespaceRole::Api)
            .await
            .unwrap();

        assert_eq!(served.source, ServeSource::Network);
        let stored = store
            .get_entry(API_NS, &CachedEntry::key_for(&request))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.response.body, b"[1,2,3]");
    }

    #[tokio::test]
    async fn test_network_first_never_stores_post() {
        let (engine, net, store) = engine().await;
        let request = Request::new(
            Method::Post,
            Url::parse("https://app.example/api/docs").unwrap(),
            Destination::Other,
            Some(b"{}".to_vec()),
        );
        net.respond("https://app.example/api/docs", 200, b"created");

        let served = engine
            .handle(&request, Strategy::NetworkFirst, NamespaceRole::Api)
            .await
            .unwrap();

        assert_eq!(served.response.body, b"created");
        assert!(store
            .get_entry(API_NS, &CachedEntry::key_for(&request))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_network_first_never_stores_non_200() {
        let (engine, net, store) = engine().await;
        let request = get("https://app.example/api/docs", Destination::Other);
        net.respond("https://app.example/api/docs", 500, b"oops");

        let served = engine
            .handle(&request, Strategy::NetworkFirst, NamespaceRole::Api)
            .await
            .unwrap();

        assert_eq!(served.response.status, 500);
        assert!(store
            .get_entry(API_NS, &CachedEntry::key_for(&request))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cache() {
        let (engine, _net, store) = engine().await;
        let request = get("https://app.example/api/docs", Destination::Other);
        seed(&store, API_NS, &request, b"cached list").await;

        let served = engine
            .handle(&request, Strategy::NetworkFirst, NamespaceRole::Api)
            .await
            .unwrap();

        assert_eq!(served.source, ServeSource::Cache);
        assert_eq!(served.response.body, b"cached list");
    }

    #[tokio::test]
    async fn test_network_first_document_total_failure_serves_fallback() {
        let (engine, _net, store) = engine().await;
        let fallback = Request::for_asset(&Url::parse("https://app.example").unwrap(), "/offline.html").unwrap();
        seed(&store, STATIC_NS, &fallback, b"<h1>offline</h1>").await;

        let request = get("https://app.example/docs/readme", Destination::Document);
        let served = engine
            .handle(&request, Strategy::NetworkFirst, NamespaceRole::Dynamic)
            .await
            .unwrap();

        assert_eq!(served.source, ServeSource::Fallback);
        assert_eq!(served.response.body, b"<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_network_first_subresource_total_failure_propagates() {
        let (engine, _net, _store) = engine().await;
        let request = get("https://app.example/api/docs", Destination::Other);

        let result = engine.handle(&request, Strategy::NetworkFirst, NamespaceRole::Api).await;
        assert!(matches!(result, Err(Error::NetworkUnavailable(_))));
    }

    #[tokio::test]
    async fn test_network_first_document_failure_without_fallback_propagates() {
        let (engine, _net, _store) = engine().await;
        let request = get("https://app.example/docs/readme", Destination::Document);

        let result = engine.handle(&request, Strategy::NetworkFirst, NamespaceRole::Dynamic).await;
        assert!(matches!(result, Err(Error::NetworkUnavailable(_))));
    }

    #[tokio::test]
    async fn test_swr_serves_stale_then_refreshes() {
        let (engine, net, store) = engine().await;
        let request = get("https://app.example/app.js", Destination::Script);
        seed(&store, STATIC_NS, &request, b"old bundle").await;
        net.respond("https://app.example/app.js", 200, b"new bundle");

        let served = engine
            .handle(&request, Strategy::StaleWhileRevalidate, NamespaceRole::Static)
            .await
            .unwrap();

        // the stale entry is returned immediately, refresh still pending
        assert_eq!(served.source, ServeSource::Cache);
        assert_eq!(served.response.body, b"old bundle");

        served.revalidation.unwrap().await.unwrap();

        let refreshed = store
            .get_entry(STATIC_NS, &CachedEntry::key_for(&request))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.response.body, b"new bundle");
        assert_eq!(net.calls(), 1);
    }

    #[tokio::test]
    async fn test_swr_refresh_failure_keeps_entry() {
        let (engine, _net, store) = engine().await;
        let request = get("https://app.example/app.js", Destination::Script);
        seed(&store, STATIC_NS, &request, b"old bundle").await;

        let served = engine
            .handle(&request, Strategy::StaleWhileRevalidate, NamespaceRole::Static)
            .await
            .unwrap();
        served.revalidation.unwrap().await.unwrap();

        let kept = store
            .get_entry(STATIC_NS, &CachedEntry::key_for(&request))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.response.body, b"old bundle");
    }

    #[tokio::test]
    async fn test_swr_non_200_refresh_keeps_entry() {
        let (engine, net, store) = engine().await;
        let request = get("https://app.example/app.js", Destination::Script);
        seed(&store, STATIC_NS, &request, b"old bundle").await;
        net.respond("https://app.example/app.js", 502, b"bad gateway");

        let served = engine
            .handle(&request, Strategy::StaleWhileRevalidate, NamespaceRole::Static)
            .await
            .unwrap();
        served.revalidation.unwrap().await.unwrap();

        let kept = store
            .get_entry(STATIC_NS, &CachedEntry::key_for(&request))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.response.body, b"old bundle");
    }

    #[tokio::test]
    async fn test_swr_miss_awaits_network() {
        let (engine, net, store) = engine().await;
        let request = get("https://app.example/styles.css", Destination::Style);
        net.respond("https://app.example/styles.css", 200, b"body{}");

        let served = engine
            .handle(&request, Strategy::StaleWhileRevalidate, NamespaceRole::Static)
            .await
            .unwrap();

        assert_eq!(served.source, ServeSource::Network);
        assert!(served.revalidation.is_none());
        assert!(store
            .get_entry(STATIC_NS, &CachedEntry::key_for(&request))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_swr_miss_propagates_failure() {
        let (engine, _net, _store) = engine().await;
        let request = get("https://app.example/styles.css", Destination::Style);

        let result = engine
            .handle(&request, Strategy::StaleWhileRevalidate, NamespaceRole::Static)
            .await;
        assert!(matches!(result, Err(Error::NetworkUnavailable(_))));
    }

    #[tokio::test]
    async fn test_stored_entry_round_trips_byte_identical() {
        let (engine, net, store) = engine().await;
        let body: Vec<u8> = (0u8..=255).collect();
        let request = get("https://app.example/api/blob", Destination::Other);
        net.respond("https://app.example/api/blob", 200, &body);

        let served = engine
            .handle(&request, Strategy::NetworkFirst, NamespaceRole::Api)
            .await
            .unwrap();
        assert_eq!(served.response.body, body);

        let stored = store
            .get_entry(API_NS, &CachedEntry::key_for(&request))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.response.body, body);
    }
}
