//! File watcher: re-run the ingestion pass when files under a local source
//! change.
//!
//! Uses the notify crate to watch the directory and debounces events; each
//! quiet period after a change runs one full pass on a blocking worker.

mod watcher;

pub use watcher::is_relevant_change;

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{FikiError, Result};
use crate::ingest::IngestionCoordinator;

/// Run the file watcher: spawn the watcher thread, then run a pass for every
/// debounced change signal. Returns when the watcher thread exits.
pub async fn run_watcher(
    coordinator: Arc<IngestionCoordinator>,
    root: PathBuf,
    debounce_ms: u64,
) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let rx = Arc::new(Mutex::new(rx));

    log::info!("Watching {} for changes (debounce {} ms)", root.display(), debounce_ms);

    std::thread::spawn(move || {
        if let Err(e) = watcher::run_watcher_thread(&root, debounce_ms, tx) {
            log::error!("watcher thread error: {}", e);
        }
    });

    loop {
        let rx_clone = Arc::clone(&rx);
        let signal = tokio::task::spawn_blocking(move || {
            rx_clone
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .recv()
        })
        .await
        .map_err(|e| FikiError::Watch(format!("watcher task join: {}", e)))?;

        if signal.is_err() {
            break;
        }

        log::info!("watch: content changed, refreshing");
        let running = Arc::clone(&coordinator);
        let outcome = tokio::task::spawn_blocking(move || running.run_pass())
            .await
            .map_err(|e| FikiError::Watch(format!("refresh task join: {}", e)))?;

        match outcome {
            Ok(index) => log::info!("watch: {} pages live", index.page_count()),
            Err(FikiError::PassInProgress) => {
                log::info!("watch: a pass is already running, skipping this change")
            }
            Err(e) => log::error!("watch: refresh failed, keeping previous snapshot: {}", e),
        }
    }
    Ok(())
}
