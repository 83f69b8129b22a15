//! Area annotation core library
//!
//! Client-side engine for drawing, editing and persisting polygonal areas on a
//! pannable/zoomable map canvas.
//!
//! Layers, leaf first:
//! - `geometry`: pure point/polygon math
//! - `transform`: screen ↔ logical map coordinates
//! - `store`: the per-canvas editor state machine
//! - `interaction`: raw canvas events → store commands
//! - `persistence`: submit closed polygons and reconcile the response

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod persistence;
pub mod polygon;
pub mod store;
pub mod transform;

pub use config::{ConfigError, EditorConfig};
pub use error::{EditorError, IndexTarget};
pub use geometry::{BoundingBox, Point, bounding_box, bounding_extent, centroid, is_closable};
pub use interaction::{
    CanvasEvent, Command, InteractionLayer, InteractionOutcome, Key, Notice, PointerButton,
};
pub use persistence::{
    AreaRepository, InMemoryAreaRepository, LogSink, NoticeSink, PersistenceBridge,
    RecordingSink, SaveError, SaveReport, SavedRecord, SubmitPayload,
};
pub use polygon::{AreaMetadata, Polygon, PolygonId};
pub use store::{EditorMode, PolygonStore, SharedPolygonStore, SubmitTicket};
pub use transform::{StageTransform, logical_to_screen, screen_to_logical};
