//! Compactor configuration
//!
//! Loaded from TOML; every field is optional and falls back to its default.
//!
//! ```toml
//! verify_each_step = true
//! trace_layout = false
//! free_glyph = "."
//! ```

use crate::core::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompactorConfig {
    /// Run a full structural audit of the list after every compaction step
    pub verify_each_step: bool,

    /// Render the disk layout into each trace event
    pub trace_layout: bool,

    /// Character used for free units when rendering a layout
    pub free_glyph: char,
}

impl CompactorConfig {
    pub const DEFAULT_FREE_GLYPH: char = '.';

    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Enable per-step verification
    pub fn verified(mut self) -> Self {
        self.verify_each_step = true;
        self
    }
}

impl Default for CompactorConfig {
    fn default() -> Self {
        CompactorConfig {
            verify_each_step: false,
            trace_layout: false,
            free_glyph: Self::DEFAULT_FREE_GLYPH,
        }
    }
}
