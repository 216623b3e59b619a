//! Runtime Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Time budget per queue per scheduler tick (milliseconds)
    pub frame_budget_ms: u64,

    /// Content rebuilds tried before a render is declared unstable
    pub max_rebuild_attempts: usize,

    /// Re-render immediately on attribute writes and prop sets made outside
    /// a render pass
    pub sync_updates: bool,

    /// Queue discovered occurrences on the mount queue instead of mounting
    /// them inline
    pub defer_mounts: bool,

    /// Minify component styles with lightningcss
    pub minify_styles: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_budget_ms: 16, // ~one frame
            max_rebuild_attempts: 4,
            sync_updates: true,
            defer_mounts: true,
            minify_styles: false,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }

    pub fn with_frame_budget_ms(mut self, ms: u64) -> Self {
        self.frame_budget_ms = ms;
        self
    }

    pub fn with_max_rebuild_attempts(mut self, attempts: usize) -> Self {
        self.max_rebuild_attempts = attempts;
        self
    }

    pub fn with_sync_updates(mut self, sync: bool) -> Self {
        self.sync_updates = sync;
        self
    }

    pub fn with_defer_mounts(mut self, defer: bool) -> Self {
        self.defer_mounts = defer;
        self
    }

    pub fn with_minify_styles(mut self, minify: bool) -> Self {
        self.minify_styles = minify;
        self
    }
}
