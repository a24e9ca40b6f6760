//! Configuration surface for the pieces of `DirectoryEnvironment` the spec
//! treats as server/global settings rather than per-request state.
//!
//! Full configuration loading (listeners, TLS, storage paths, ...) is out of
//! scope per spec.md §1; this models only the two knobs the pipeline itself
//! reads: whether schema checking is enabled, and the server's writability
//! mode.

use serde::{Deserialize, Serialize};

/// A server- or backend-level writability gate (spec.md §4.1 step 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WritabilityMode {
    Enabled,
    Disabled,
    InternalOnly,
}

impl Default for WritabilityMode {
    fn default() -> Self {
        WritabilityMode::Enabled
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEnvironmentConfig {
    #[serde(default = "default_true")]
    pub check_schema: bool,
    #[serde(default)]
    pub writability_mode: WritabilityMode,
}

fn default_true() -> bool {
    true
}

impl Default for DirectoryEnvironmentConfig {
    fn default() -> Self {
        DirectoryEnvironmentConfig {
            check_schema: true,
            writability_mode: WritabilityMode::default(),
        }
    }
}

impl DirectoryEnvironmentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
