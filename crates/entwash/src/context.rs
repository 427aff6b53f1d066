//! Execution environment configuration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for an [`Env`](crate::Env).
///
/// Controls recursion limits, interruption, randomness and the string
/// semantics of the runtime. Can be loaded from a JSON document via
/// [`EnvConfig::from_json`]; absent fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Maximum call depth (stack overflow protection)
    pub max_call_depth: usize,

    /// Seed for the environment's random source; `None` seeds from the OS
    pub rng_seed: Option<u64>,

    /// Whether string literals created by the environment are unicode
    pub unicode_semantics: bool,

    /// Nesting depth after which dumps stop descending
    pub max_dump_depth: usize,

    /// Container nesting accepted by `unserialize`
    pub max_unserialize_depth: usize,

    /// Interrupt flag - set to true to abort execution at the next call
    #[serde(skip)]
    pub interrupt: Arc<AtomicBool>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            rng_seed: None,
            unicode_semantics: true,
            max_dump_depth: 64,
            max_unserialize_depth: 512,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl EnvConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Set a custom call depth limit.
    pub fn with_max_call_depth(mut self, max_depth: usize) -> Self {
        self.max_call_depth = max_depth;
        self
    }

    /// Seed the random source for reproducible shuffles.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Enable unicode string semantics.
    pub fn with_unicode(mut self, enabled: bool) -> Self {
        self.unicode_semantics = enabled;
        self
    }

    /// Limit how deeply `unserialize` descends into nested containers.
    pub fn with_max_unserialize_depth(mut self, max_depth: usize) -> Self {
        self.max_unserialize_depth = max_depth;
        self
    }

    /// Check if execution has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Request interruption of execution.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    /// Reset the interrupt flag.
    pub fn reset_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }
}
