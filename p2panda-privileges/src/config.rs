// SPDX-License-Identifier: MIT OR Apache-2.0

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a reconciler.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Fold leaf-level decisions into aggregates when a session is committed.
    pub(crate) consolidate: bool,
}

impl Config {
    pub fn new() -> Self {
        Self { consolidate: true }
    }

    /// Keep decisions on leaf level when committing, for example to inspect expanded state.
    pub fn with_consolidation(mut self, consolidate: bool) -> Self {
        self.consolidate = consolidate;
        self
    }

    pub fn consolidate(&self) -> bool {
        self.consolidate
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
