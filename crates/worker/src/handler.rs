//! Request interception entry point.
//!
//! This is the surface the host application hands every outbound
//! request to. Classification picks the strategy, the engine runs it,
//! and failed mutations are captured for deferred replay before the
//! failure is surfaced.

use holdfast_core::request::Request;
use holdfast_core::Error;

use crate::classify::{classify, RouteDecision};
use crate::queue::MutationQueue;
use crate::strategy::{Served, StrategyEngine};

/// What interception did with a request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The layer produced a response.
    Served(Served),
    /// The request is outside the layer's jurisdiction; the host must
    /// send it to the network unmodified.
    Passthrough,
}

/// The interception layer for one generation.
pub struct OfflineWorker {
    engine: StrategyEngine,
    queue: MutationQueue,
}

impl OfflineWorker {
    pub fn new(engine: StrategyEngine, queue: MutationQueue) -> Self {
        Self { engine, queue }
    }

    pub fn engine(&self) -> &StrategyEngine {
        &self.engine
    }

    /// Intercept one request.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        match classify(request) {
            RouteDecision::Passthrough => {
                tracing::trace!(url = %request.url, "passing through uninterceptable request");
                Ok(FetchOutcome::Passthrough)
            }
            RouteDecision::Handle { strategy, role } => {
                match self.engine.handle(request, strategy, role).await {
                    Ok(served) => Ok(FetchOutcome::Served(served)),
                    Err(err) => {
                        if request.method.is_mutation() && matches!(err, Error::NetworkUnavailable(_)) {
                            self.queue.capture(request).await?;
                        }
                        Err(err)
                    }
                }
            }
        }
    }
}
