//! Editor tuning knobs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read editor config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid editor config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Editor configuration.
///
/// Distances are in screen pixels and are converted to logical units with
/// the stage scale at the time of each event, so handles keep their
/// on-screen size at any zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Grab radius of vertex handles.
    pub vertex_handle_radius: f64,
    /// How far outside a contour a click still counts as hitting its body.
    pub edge_hit_tolerance: f64,
    /// Colour hint given to new drafts.
    pub default_color: Option<[u8; 4]>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            vertex_handle_radius: 8.0,
            edge_hit_tolerance: 4.0,
            default_color: None,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
