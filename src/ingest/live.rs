//! The published index set.
//!
//! Readers call [`LiveIndex::load`] and keep the returned `Arc` for as long as
//! they need a consistent view; a publish swaps the pointer in one step, so a
//! reader sees pass N or pass N-1 and never a mix.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::index::IndexSet;

pub struct LiveIndex {
    current: ArcSwap<IndexSet>,
    generation: AtomicU64,
}

impl LiveIndex {
    /// Empty index set, generation 0 (nothing published yet)
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(IndexSet::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Current snapshot. Wait-free.
    #[inline]
    pub fn load(&self) -> Arc<IndexSet> {
        self.current.load_full()
    }

    /// Replace the live snapshot. Returns the new generation.
    pub fn publish(&self, index: Arc<IndexSet>) -> u64 {
        self.current.store(index);
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of successful publishes so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for LiveIndex {
    fn default() -> Self {
        Self::new()
    }
}
