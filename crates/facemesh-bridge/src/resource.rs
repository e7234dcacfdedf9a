//! Process-wide asset search root.
//!
//! The engine resolves graph assets against one global directory. The
//! bridge tracks which directory is set and how many contexts depend on
//! it: the first context pins the root, later contexts must name the same
//! directory, and the root is free to change again once every context
//! holding it is gone.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{BridgeError, Result};
use crate::graph::GraphEngine;

#[derive(Debug, Default)]
struct RootState {
    dir: Option<PathBuf>,
    live: usize,
}

/// Tracks the directory registered with the engine and its users.
#[derive(Debug, Default)]
pub struct AssetRoot {
    state: Mutex<RootState>,
}

impl AssetRoot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `dir` with the engine (if needed) and take a lease on it.
    pub fn acquire<E: GraphEngine + ?Sized>(
        self: &Arc<Self>,
        engine: &E,
        dir: &Path,
    ) -> Result<AssetRootLease> {
        let mut state = self.state.lock();

        match state.dir.clone() {
            Some(current) if current == dir => {}
            Some(current) if state.live > 0 => {
                warn!(
                    "Refusing resource directory {} while {} context(s) use {}",
                    dir.display(),
                    state.live,
                    current.display()
                );
                return Err(BridgeError::ResourceRootConflict {
                    current,
                    requested: dir.to_path_buf(),
                    live: state.live,
                });
            }
            _ => {
                engine.set_resource_dir(dir)?;
                info!("Asset root set to {}", dir.display());
                state.dir = Some(dir.to_path_buf());
            }
        }

        state.live += 1;
        Ok(AssetRootLease {
            root: Arc::clone(self),
        })
    }

    /// Directory currently registered with the engine, if any.
    pub fn current(&self) -> Option<PathBuf> {
        self.state.lock().dir.clone()
    }

    /// Number of outstanding leases.
    pub fn live(&self) -> usize {
        self.state.lock().live
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);
    }
}

/// Keeps the asset root pinned while a context is alive.
#[derive(Debug)]
pub struct AssetRootLease {
    root: Arc<AssetRoot>,
}

impl Drop for AssetRootLease {
    fn drop(&mut self) {
        self.root.release();
    }
}
