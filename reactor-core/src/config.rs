//! Engine configuration.
//!
//! Built in code or parsed from JSON:
//!
//! ```json
//! { "flush_policy": "isolate_and_continue" }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What a flush does when a computation's body panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Stop at the first failure. Computations of the batch that were not
    /// attempted yet are reported back in the error.
    #[default]
    AbortBatch,

    /// Keep running the rest of the batch and report every failure at the end.
    IsolateAndContinue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub flush_policy: FlushPolicy,
}

impl EngineConfig {
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }
}
