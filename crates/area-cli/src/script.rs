//! Replay script format.

use std::path::Path;

use anyhow::{Context, Result};
use area_core::{AreaMetadata, CanvasEvent, StageTransform};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Script {
    /// Stage snapshot in effect until the first `stage` step.
    #[serde(default)]
    pub stage: StageTransform,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Input { event: CanvasEvent },
    Stage(StageTransform),
    Metadata { index: usize, metadata: AreaMetadata },
    Save { index: usize },
    SaveAll,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing script {}", path.display()))
    }
}
