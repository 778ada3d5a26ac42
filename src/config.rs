// In: src/config.rs

//! The single source of truth for voxpipe configuration.
//!
//! `VoxpipeConfig` is created once at the application boundary (usually from a
//! JSON document) and then handed to the bridge as a shared, read-only
//! `Arc<VoxpipeConfig>`.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

//==================================================================================
// I. Core Configuration Enums
//==================================================================================

/// How a pipeline description is turned into stages.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// **Default:** every step must name a known stage and the description must
    /// re-serialize to itself. Anything else is an error.
    #[default]
    Strict,

    /// Unknown steps are dropped with a warning and the rest of the pipeline is
    /// built. The dropped names are still reported by the builder.
    Lenient,
}

//==================================================================================
// II. The Unified VoxpipeConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct VoxpipeConfig {
    /// The pipeline description used when the caller does not supply one.
    #[serde(default = "default_pipeline")]
    pub pipeline: String,

    /// Thread hint forwarded to every stage. Clamped to the available parallelism.
    #[serde(default = "default_n_threads")]
    pub n_threads: usize,

    #[serde(default)]
    pub build_mode: BuildMode,
}

impl Default for VoxpipeConfig {
    fn default() -> Self {
        Self {
            pipeline: default_pipeline(),
            n_threads: default_n_threads(),
            build_mode: BuildMode::default(),
        }
    }
}

impl VoxpipeConfig {
    /// Parses a configuration document. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Helper for `serde` to provide the default pipeline description.
fn default_pipeline() -> String {
    "bitswap1->lz4".to_string()
}

fn default_n_threads() -> usize {
    1
}
