//! Watcher thread: notify + debounce, one signal per burst of changes.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};

use crate::error::{FikiError, Result};

/// Whether any changed path is visible content under `root`
pub fn is_relevant_change(root: &Path, paths: &[PathBuf]) -> bool {
    paths.iter().any(|path| {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        !relative.components().any(|c| {
            c.as_os_str()
                .to_str()
                .map(|s| s.starts_with('.'))
                .unwrap_or(false)
        })
    })
}

/// Watch `root` and send one `()` over `tx` once changes have been quiet for
/// `debounce_ms`. Returns when the receiving side hangs up or the watcher fails.
pub fn run_watcher_thread(root: &Path, debounce_ms: u64, tx: mpsc::Sender<()>) -> Result<()> {
    let root = root.to_path_buf();
    let debounce = Duration::from_millis(debounce_ms);

    let (event_tx, event_rx) = mpsc::channel::<Vec<PathBuf>>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(ev) = res {
            let _ = event_tx.send(ev.paths);
        }
    })
    .map_err(|e| FikiError::Watch(e.to_string()))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| FikiError::Watch(e.to_string()))?;

    let mut pending: Option<Instant> = None;

    loop {
        match event_rx.recv_timeout(debounce) {
            Ok(paths) => {
                if is_relevant_change(&root, &paths) {
                    pending = Some(Instant::now());
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let ready = pending
                    .map(|last| last.elapsed() >= debounce)
                    .unwrap_or(false);
                if ready {
                    pending = None;
                    if tx.send(()).is_err() {
                        return Ok(());
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
