//! Shared tokio runtime for the synchronous pipeline
//!
//! The orchestration itself is blocking. Subprocess timeouts, Ctrl-C handling
//! and opendal's blocking layer all need a runtime to drive them, so a single
//! multi-threaded runtime is created lazily and shared.

use std::io;
use std::sync::OnceLock;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get the shared runtime, building it on first use
pub fn runtime() -> io::Result<&'static Runtime> {
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt);
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("db-backup-manager-rt")
        .enable_all()
        .build()?;

    Ok(RUNTIME.get_or_init(|| rt))
}

/// Cancel `token` when the process receives Ctrl-C
pub fn cancel_on_interrupt(token: CancellationToken) -> io::Result<()> {
    runtime()?.spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, cancelling current run");
                token.cancel();
            }
            Err(e) => debug!("Unable to listen for Ctrl-C: {}", e),
        }
    });
    Ok(())
}
