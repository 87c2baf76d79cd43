//! Out-of-band control channel.
//!
//! The application never touches the cache directly; it sends one of
//! two commands. Both are idempotent, and an acknowledgement is only
//! produced once the side effects have fully applied.

use serde::{Deserialize, Serialize};

use holdfast_core::Error;

use crate::lifecycle::{Generation, LifecycleCoordinator, LifecycleState};

/// Commands accepted from the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Force a Waiting generation to activate immediately.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    /// Delete every namespace regardless of generation (hard reset).
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,
}

/// Acknowledgement sent back once a command's side effects are applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlAck {
    pub command: ControlMessage,
    /// False when the command was a no-op (e.g. SKIP_WAITING while
    /// already active).
    pub applied: bool,
    pub detail: String,
}

/// Apply a control command against the running generation.
pub async fn handle(
    coordinator: &LifecycleCoordinator, generation: &Generation, message: ControlMessage,
) -> Result<ControlAck, Error> {
    match message {
        ControlMessage::SkipWaiting => match generation.state(coordinator.clients()) {
            LifecycleState::Waiting => {
                let report = coordinator.activate(generation).await?;
                Ok(ControlAck {
                    command: message,
                    applied: true,
                    detail: format!(
                        "activated {}, purged {} stale namespaces",
                        generation.set().tag(),
                        report.purged.len()
                    ),
                })
            }
            LifecycleState::Active => Ok(ControlAck {
                command: message,
                applied: false,
                detail: "already active".into(),
            }),
            state => Ok(ControlAck {
                command: message,
                applied: false,
                detail: format!("ignored in state {state:?}"),
            }),
        },
        ControlMessage::ClearCache => {
            let deleted = coordinator.purge_all().await?;
            Ok(ControlAck {
                command: message,
                applied: true,
                detail: format!("deleted {deleted} namespaces"),
            })
        }
    }
}
