//! holdfast worker entry point.
//!
//! Boots a generation through install (and takeover when configured),
//! then services the control channel: newline-delimited JSON commands
//! on stdin, acknowledgements on stdout. Logging goes to stderr to keep
//! the command stream clean.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use holdfast_client::{FetchConfig, Net, NetClient};
use holdfast_core::cache::{NamespaceSet, VersionTag};
use holdfast_core::{AppConfig, StoreDb};
use holdfast_worker::{control, ClientRegistry, Generation, LifecycleCoordinator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(product = %config.product, build_id = %config.build_id, "starting holdfast worker");

    let store = StoreDb::open(&config.db_path).await?;
    let net: Arc<dyn Net> = Arc::new(NetClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })?);

    let clients = Arc::new(ClientRegistry::new());
    let coordinator = LifecycleCoordinator::new(
        store,
        net,
        Arc::clone(&clients),
        config.origin_url()?,
        config.precache_manifest.clone(),
    );
    let generation = Generation::new(NamespaceSet::new(&config.product, VersionTag::new(&config.build_id)));

    let report = coordinator.install(&generation).await?;
    tracing::info!(
        stored = report.stored,
        failed = report.failed.len(),
        "install finished, generation waiting"
    );

    if config.immediate_takeover {
        let report = coordinator.activate(&generation).await?;
        tracing::info!(purged = report.purged.len(), "immediate takeover complete");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<control::ControlMessage>(line) {
            Ok(message) => {
                let ack = control::handle(&coordinator, &generation, message).await?;
                let mut out = serde_json::to_vec(&ack)?;
                out.push(b'\n');
                stdout.write_all(&out).await?;
                stdout.flush().await?;
            }
            Err(err) => tracing::warn!(%err, "unrecognized control message"),
        }
    }

    Ok(())
}
