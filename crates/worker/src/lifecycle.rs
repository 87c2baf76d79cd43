//! Generation lifecycle: install, activate, takeover.
//!
//! A generation moves Installing -> Waiting -> Activating -> Active and
//! is Superseded once a newer generation claims the clients. Namespaces
//! are created during install and deleted during the *next* generation's
//! activation; a generation never mutates another generation's caches.

use std::sync::{Arc, Mutex, RwLock};

use holdfast_core::cache::{is_layer_namespace, CachedEntry, NamespaceRole, NamespaceSet, StoreDb, VersionTag};
use holdfast_core::request::Request;
use holdfast_core::Error;
use holdfast_client::Net;
use url::Url;

/// Lifecycle states of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Active,
    Superseded,
}

/// Tracks which generation controls the running application instances.
#[derive(Default)]
pub struct ClientRegistry {
    controller: RwLock<Option<VersionTag>>,
    clients: RwLock<Vec<String>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application instance (e.g. an open window).
    pub fn connect(&self, client_id: impl Into<String>) {
        self.clients.write().expect("clients lock poisoned").push(client_id.into());
    }

    /// The tag currently controlling all clients, if any generation
    /// has activated yet.
    pub fn controller(&self) -> Option<VersionTag> {
        self.controller.read().expect("controller lock poisoned").clone()
    }

    /// Route all current and future clients to `tag`. Returns how many
    /// clients were re-claimed.
    pub fn claim(&self, tag: VersionTag) -> usize {
        *self.controller.write().expect("controller lock poisoned") = Some(tag);
        self.clients.read().expect("clients lock poisoned").len()
    }
}

/// One versioned deployment of the layer and its namespace set.
pub struct Generation {
    set: NamespaceSet,
    state: Mutex<LifecycleState>,
}

impl Generation {
    pub fn new(set: NamespaceSet) -> Self {
        Self { set, state: Mutex::new(LifecycleState::Installing) }
    }

    pub fn set(&self) -> &NamespaceSet {
        &self.set
    }

    /// Current state. An Active generation whose tag no longer matches
    /// the registry controller has been superseded by a newer one.
    pub fn state(&self, registry: &ClientRegistry) -> LifecycleState {
        let state = *self.state.lock().expect("state lock poisoned");
        if state == LifecycleState::Active
            && registry.controller().as_ref() != Some(self.set.tag())
        {
            return LifecycleState::Superseded;
        }
        state
    }

    fn transition(&self, next: LifecycleState) {
        let mut state = self.state.lock().expect("state lock poisoned");
        tracing::debug!(tag = %self.set.tag(), from = ?*state, to = ?next, "lifecycle transition");
        *state = next;
    }
}

/// Result of the install phase's best-effort pre-population.
#[derive(Debug, Default)]
pub struct PrepopulationReport {
    pub attempted: usize,
    pub stored: usize,
    /// (asset path, failure reason) for every asset that didn't make it.
    pub failed: Vec<(String, String)>,
}

/// Result of an activation.
#[derive(Debug, Default)]
pub struct ActivationReport {
    /// Namespaces of prior generations deleted during takeover.
    pub purged: Vec<String>,
    /// Clients re-claimed to this generation.
    pub claimed: usize,
}

/// Drives generations through install and activation.
pub struct LifecycleCoordinator {
    store: StoreDb,
    net: Arc<dyn Net>,
    clients: Arc<ClientRegistry>,
    origin: Url,
    manifest: Vec<String>,
    // activation is enumerate-then-delete-then-claim and must not
    // interleave with another activation
    activation_lock: tokio::sync::Mutex<()>,
}

impl LifecycleCoordinator {
    pub fn new(
        store: StoreDb, net: Arc<dyn Net>, clients: Arc<ClientRegistry>, origin: Url, manifest: Vec<String>,
    ) -> Self {
        Self { store, net, clients, origin, manifest, activation_lock: tokio::sync::Mutex::new(()) }
    }

    pub fn store(&self) -> &StoreDb {
        &self.store
    }

    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    /// Install a generation: create its namespaces and pre-populate the
    /// static one from the manifest, best-effort. The generation reaches
    /// Waiting regardless of partial pre-population failure.
    pub async fn install(&self, generation: &Generation) -> Result<PrepopulationReport, Error> {
        generation.transition(LifecycleState::Installing);

        for name in generation.set().all() {
            self.store.open_namespace(&name).await?;
        }

        let static_ns = generation.set().name_for(NamespaceRole::Static);
        let mut report = PrepopulationReport { attempted: self.manifest.len(), ..Default::default() };

        for path in &self.manifest {
            match self.prepopulate_asset(&static_ns, path).await {
                Ok(()) => report.stored += 1,
                Err(err) => {
                    tracing::warn!(%err, path, "precache asset failed, continuing");
                    report.failed.push((path.clone(), err.to_string()));
                }
            }
        }

        generation.transition(LifecycleState::Waiting);
        tracing::info!(
            tag = %generation.set().tag(),
            stored = report.stored,
            failed = report.failed.len(),
            "install complete, generation waiting"
        );
        Ok(report)
    }

    async fn prepopulate_asset(&self, namespace: &str, path: &str) -> Result<(), Error> {
        let request = Request::for_asset(&self.origin, path)?;
        let fetched = self.net.fetch(&request).await?;
        if !fetched.is_storable() {
            return Err(Error::NetworkUnavailable(format!("status {} for {path}", fetched.status)));
        }
        let entry = CachedEntry::new(&request, fetched.to_stored());
        self.store.put_entry(namespace, &entry).await
    }

    /// Take over: delete every layer namespace that doesn't belong to
    /// this generation, then claim all clients. The deletion pass
    /// completes before claiming, so no client ever observes a
    /// half-purged cache set. Idempotent on an Active generation.
    pub async fn activate(&self, generation: &Generation) -> Result<ActivationReport, Error> {
        let _guard = self.activation_lock.lock().await;

        match generation.state(&self.clients) {
            LifecycleState::Active => return Ok(ActivationReport::default()),
            LifecycleState::Waiting | LifecycleState::Activating => {}
            state => {
                return Err(Error::InvalidRequest(format!("cannot activate from {state:?}")));
            }
        }

        generation.transition(LifecycleState::Activating);

        let mut purged = Vec::new();
        let product = generation.set().product();
        for name in self.store.list_namespaces().await? {
            if is_layer_namespace(product, &name) && !generation.set().contains(&name) {
                self.store.delete_namespace(&name).await?;
                purged.push(name);
            }
        }

        // re-assert this generation's namespaces in case a hard reset
        // removed them while it was waiting
        for name in generation.set().all() {
            self.store.open_namespace(&name).await?;
        }

        let claimed = self.clients.claim(generation.set().tag().clone());
        generation.transition(LifecycleState::Active);

        tracing::info!(
            tag = %generation.set().tag(),
            purged = purged.len(),
            claimed,
            "activation complete, generation active"
        );
        Ok(ActivationReport { purged, claimed })
    }

    /// Delete every namespace regardless of generation. A no-op on an
    /// empty store.
    pub async fn purge_all(&self) -> Result<u64, Error> {
        let deleted = self.store.delete_all_namespaces().await?;
        tracing::info!(deleted, "purged all namespaces");
        Ok(deleted)
    }
}
