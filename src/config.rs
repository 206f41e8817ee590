//! Engine configuration.
//!
//! [`Config`] carries every tunable the engine consumes: the resolution
//! policy, container recursion limits, window caps and the latency warning
//! threshold. It can be built in code with the `with_*` methods or loaded
//! from YAML.
//!
//! ```rust
//! use quince::{Config, ResolutionPolicy};
//!
//! let config = Config::from_yaml("policy: keep-all\nmax-container-depth: 2\n")?;
//! assert_eq!(config.policy, ResolutionPolicy::KeepAll);
//! assert_eq!(config.max_container_depth, 2);
//! assert_eq!(config.latency_warning.as_millis(), 500);
//! # Ok::<(), quince::Error>(())
//! ```

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How competing matches are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionPolicy {
    /// Suppress formats another matched format has priority over
    #[default]
    BestMatch,
    /// Report every matched format
    KeepAll,
}

/// Configuration consumed by an [`Identifier`](crate::Identifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Resolution policy
    pub policy: ResolutionPolicy,
    /// Container nesting levels whose members are identified
    pub max_container_depth: usize,
    /// Identification time above which a warning is raised
    #[serde(with = "millis")]
    pub latency_warning: Duration,
    /// Head window size for signatures with unbounded BOF offsets
    pub max_bof_window: usize,
    /// Tail window size for signatures with unbounded EOF offsets
    pub max_eof_window: usize,
    /// Bytes from either end of its region in which a floating pattern
    /// may start
    pub max_var_scan: usize,
    /// Members identified per container
    pub max_container_members: usize,
    /// Largest member read fully into memory
    pub max_member_buffer: usize,
    /// Report extension and MIME matches when no content matched
    pub extension_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: ResolutionPolicy::BestMatch,
            max_container_depth: 4,
            latency_warning: Duration::from_millis(500),
            max_bof_window: 64 * 1024,
            max_eof_window: 64 * 1024,
            max_var_scan: 64 * 1024,
            max_container_members: 256,
            max_member_buffer: 16 * 1024 * 1024,
            extension_fallback: true,
        }
    }
}

impl Config {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn with_max_container_depth(mut self, depth: usize) -> Self {
        self.max_container_depth = depth;
        self
    }

    #[inline]
    pub fn with_latency_warning(mut self, threshold: Duration) -> Self {
        self.latency_warning = threshold;
        self
    }

    /// Set both window caps for unbounded anchored patterns.
    #[inline]
    pub fn with_window_caps(mut self, bof: usize, eof: usize) -> Self {
        self.max_bof_window = bof;
        self.max_eof_window = eof;
        self
    }

    #[inline]
    pub fn with_max_var_scan(mut self, scan: usize) -> Self {
        self.max_var_scan = scan;
        self
    }

    #[inline]
    pub fn with_max_container_members(mut self, members: usize) -> Self {
        self.max_container_members = members;
        self
    }

    #[inline]
    pub fn with_max_member_buffer(mut self, bytes: usize) -> Self {
        self.max_member_buffer = bytes;
        self
    }

    #[inline]
    pub fn with_extension_fallback(mut self, enabled: bool) -> Self {
        self.extension_fallback = enabled;
        self
    }

    /// Parse a YAML document; absent keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse configuration: {e}")))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize configuration: {e}")))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
