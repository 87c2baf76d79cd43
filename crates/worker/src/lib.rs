//! The holdfast interception worker.
//!
//! The host application embeds [`handler::OfflineWorker`] and hands it
//! every outbound request; the [`lifecycle::LifecycleCoordinator`]
//! drives generations through install and takeover; [`control`] applies
//! the out-of-band commands. The `holdfast` binary wires these together
//! and services the control channel over stdio.

pub mod classify;
pub mod control;
pub mod handler;
pub mod lifecycle;
pub mod queue;
pub mod strategy;

#[cfg(test)]
pub(crate) mod support;

pub use classify::{classify, RouteDecision, Strategy};
pub use control::{ControlAck, ControlMessage};
pub use handler::{FetchOutcome, OfflineWorker};
pub use lifecycle::{
    ActivationReport, ClientRegistry, Generation, LifecycleCoordinator, LifecycleState, PrepopulationReport,
};
pub use queue::MutationQueue;
pub use strategy::{Served, ServeSource, StrategyEngine};
