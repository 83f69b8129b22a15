use std::fmt;

use thiserror::Error;

use crate::store::EditorMode;

/// What an out-of-range index was pointing into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTarget {
    Polygon,
    Vertex,
}

impl fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexTarget::Polygon => f.write_str("polygon"),
            IndexTarget::Vertex => f.write_str("vertex"),
        }
    }
}

/// Rejected editor store commands. The store is unchanged after any of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("cannot {action} while {mode}")]
    InvalidTransition {
        mode: EditorMode,
        action: &'static str,
    },

    #[error("a polygon needs at least 3 points to close, it has {vertices}")]
    GeometryInvalid { vertices: usize },

    #[error("{target} index {index} out of range (len {len})")]
    IndexOutOfRange {
        target: IndexTarget,
        index: usize,
        len: usize,
    },

    #[error("polygon {index} already has a save in flight")]
    SubmitInFlight { index: usize },
}
