//! Per-canvas editor state: the committed polygon set, the draft under
//! construction and the polygon under edit.
//!
//! Three modes, mutually exclusive:
//! - Idle: nothing in progress
//! - Drawing: `is_addable`, clicks append to the draft
//! - Editing(i): vertices of polygon `i` may be moved
//!
//! A command that would enter one mode from another is rejected, never
//! queued. Every rejected command leaves the store exactly as it was.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::error::{EditorError, IndexTarget};
use crate::geometry::{self, Point};
use crate::persistence::{SavedRecord, SubmitPayload};
use crate::polygon::{AreaMetadata, Polygon, PolygonId};

/// Which interaction mode the store is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "index", rename_all = "snake_case")]
pub enum EditorMode {
    Idle,
    Drawing,
    Editing(usize),
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorMode::Idle => f.write_str("idle"),
            EditorMode::Drawing => f.write_str("drawing"),
            EditorMode::Editing(index) => write!(f, "editing polygon {index}"),
        }
    }
}

/// Snapshot of a polygon taken when a save is started.
///
/// The response is matched back to the store by `id`, so edits and removals
/// made while the request is in flight are respected.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTicket {
    pub id: PolygonId,
    pub payload: SubmitPayload,
}

/// Editor session state for one canvas.
#[derive(Debug, Clone, Default)]
pub struct PolygonStore {
    polygons: Vec<Polygon>,
    edit_index: Option<usize>,
    is_addable: bool,
    draft: Option<Polygon>,
    next_local_id: u64,
    version: u64,
    draft_metadata: AreaMetadata,
    /// Ids captured by `prepare_submit` whose response has not come back.
    in_flight: HashSet<PolygonId>,
}

impl PolygonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose new drafts start from the configured metadata.
    pub fn with_config(config: &EditorConfig) -> Self {
        Self {
            draft_metadata: AreaMetadata {
                color: config.default_color,
                ..AreaMetadata::default()
            },
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn mode(&self) -> EditorMode {
        match (self.edit_index, self.is_addable) {
            (Some(index), _) => EditorMode::Editing(index),
            (None, true) => EditorMode::Drawing,
            (None, false) => EditorMode::Idle,
        }
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn polygon(&self, index: usize) -> Option<&Polygon> {
        self.polygons.get(index)
    }

    pub fn draft(&self) -> Option<&Polygon> {
        self.draft.as_ref()
    }

    pub fn edit_index(&self) -> Option<usize> {
        self.edit_index
    }

    pub fn is_addable(&self) -> bool {
        self.is_addable
    }

    /// Bumped on every successful mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn index_of(&self, id: &PolygonId) -> Option<usize> {
        self.polygons.iter().position(|p| &p.id == id)
    }

    pub fn is_submitting(&self, id: &PolygonId) -> bool {
        self.in_flight.contains(id)
    }

    /// Save control gate: something to save and nothing uncommitted.
    pub fn can_save(&self) -> bool {
        !self.polygons.is_empty() && !self.is_addable && self.edit_index.is_none()
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    /// Enter drawing mode.
    pub fn begin_draft(&mut self) -> Result<(), EditorError> {
        if self.edit_index.is_some() || self.is_addable || self.draft.is_some() {
            return Err(self.reject("begin a draft"));
        }

        self.is_addable = true;
        self.touch();
        tracing::debug!("[store] drawing started");
        Ok(())
    }

    /// Append a vertex to the draft, creating the draft on the first point.
    ///
    /// Duplicate points are stored as given. Returns the draft's vertex count.
    pub fn add_point(&mut self, point: Point) -> Result<usize, EditorError> {
        if !self.is_addable {
            return Err(self.reject("add a point"));
        }

        let count = if let Some(draft) = self.draft.as_mut() {
            draft.points.push(point);
            draft.points.len()
        } else {
            let id = self.allocate_id();
            self.draft = Some(Polygon::new(id, vec![point], self.draft_metadata.clone()));
            1
        };

        self.touch();
        tracing::debug!(vertices = count, x = point.x, y = point.y, "[store] point added");
        Ok(count)
    }

    /// Drop the most recent draft vertex. Stays in drawing mode even when the
    /// draft becomes empty. Returns the remaining vertex count.
    pub fn undo_last_point(&mut self) -> Result<usize, EditorError> {
        if !self.is_addable {
            return Err(self.reject("undo a point"));
        }

        let Some(draft) = self.draft.as_mut() else {
            return Ok(0);
        };
        draft.points.pop();
        let remaining = draft.points.len();
        if remaining == 0 {
            self.draft = None;
        }

        self.touch();
        Ok(remaining)
    }

    /// Promote the draft into the committed set. Returns its index.
    pub fn close_draft(&mut self) -> Result<usize, EditorError> {
        if !self.is_addable {
            return Err(self.reject("close a draft"));
        }

        let vertices = self.draft.as_ref().map_or(0, Polygon::len);
        let Some(draft) = self.draft.take_if(|d| geometry::is_closable(&d.points)) else {
            tracing::debug!(vertices, "[store] draft not closable");
            return Err(EditorError::GeometryInvalid { vertices });
        };

        self.polygons.push(draft);
        self.is_addable = false;
        self.touch();

        let index = self.polygons.len() - 1;
        tracing::debug!(index, vertices, "[store] draft closed");
        Ok(index)
    }

    /// Discard the draft and leave drawing mode. Always succeeds.
    pub fn cancel_draft(&mut self) {
        let discarded = self.draft.take();
        if discarded.is_some() || self.is_addable {
            self.touch();
        }
        self.is_addable = false;
        tracing::debug!(
            vertices = discarded.as_ref().map_or(0, Polygon::len),
            "[store] draft cancelled"
        );
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Start editing the committed polygon at `index`.
    pub fn begin_edit(&mut self, index: usize) -> Result<(), EditorError> {
        if self.is_addable || self.draft.is_some() || self.edit_index.is_some() {
            return Err(self.reject("begin editing"));
        }
        self.check_polygon_index(index)?;

        self.edit_index = Some(index);
        self.touch();
        tracing::debug!(index, "[store] editing started");
        Ok(())
    }

    /// Move one vertex of the polygon under edit.
    pub fn move_vertex(
        &mut self,
        index: usize,
        vertex: usize,
        point: Point,
    ) -> Result<(), EditorError> {
        if self.edit_index != Some(index) {
            return Err(self.reject("move a vertex"));
        }
        self.check_polygon_index(index)?;

        let points = &mut self.polygons[index].points;
        let len = points.len();
        let Some(slot) = points.get_mut(vertex) else {
            return Err(EditorError::IndexOutOfRange {
                target: IndexTarget::Vertex,
                index: vertex,
                len,
            });
        };
        *slot = point;

        self.touch();
        Ok(())
    }

    /// Leave edit mode, freezing the current vertex positions.
    /// Returns the index that was being edited.
    pub fn end_edit(&mut self) -> Option<usize> {
        let index = self.edit_index.take();
        if let Some(index) = index {
            self.touch();
            tracing::debug!(index, "[store] editing finished");
        }
        index
    }

    // ------------------------------------------------------------------
    // Committed set
    // ------------------------------------------------------------------

    /// Remove a committed polygon. Clears the edit if it targeted that
    /// polygon and keeps it pointing at the same polygon otherwise.
    pub fn remove_polygon(&mut self, index: usize) -> Result<Polygon, EditorError> {
        self.check_polygon_index(index)?;

        let removed = self.polygons.remove(index);
        self.edit_index = match self.edit_index {
            Some(edit) if edit == index => None,
            Some(edit) if edit > index => Some(edit - 1),
            other => other,
        };

        self.touch();
        tracing::debug!(index, id = %removed.id, "[store] polygon removed");
        Ok(removed)
    }

    /// Replace the metadata of a committed polygon.
    pub fn set_metadata(&mut self, index: usize, metadata: AreaMetadata) -> Result<(), EditorError> {
        self.check_polygon_index(index)?;
        self.polygons[index].metadata = metadata;
        self.touch();
        Ok(())
    }

    /// Replace the saved part of the committed set with previously saved
    /// areas. Polygons that were never saved are kept after them.
    ///
    /// Records with fewer than 3 points cannot be committed and are skipped.
    /// Returns the number of polygons loaded.
    pub fn load_saved<I>(&mut self, records: I) -> Result<usize, EditorError>
    where
        I: IntoIterator<Item = SavedRecord>,
    {
        if self.mode() != EditorMode::Idle {
            return Err(self.reject("load saved areas"));
        }

        let mut polygons = Vec::new();
        for record in records {
            let polygon = record.into_polygon();
            if !polygon.is_closable() {
                tracing::warn!(
                    id = %polygon.id,
                    vertices = polygon.len(),
                    "[store] skipping saved area with too few points"
                );
                continue;
            }
            polygons.push(polygon);
        }
        let loaded = polygons.len();

        let unsaved: Vec<Polygon> = self
            .polygons
            .drain(..)
            .filter(|p| !p.id.is_saved())
            .collect();
        if !unsaved.is_empty() {
            tracing::info!(count = unsaved.len(), "[store] keeping unsaved polygons");
        }
        polygons.extend(unsaved);

        self.polygons = polygons;
        self.touch();
        Ok(loaded)
    }

    // ------------------------------------------------------------------
    // Persistence hand-off
    // ------------------------------------------------------------------

    /// Snapshot the polygon at `index` for submission and mark its id in
    /// flight. The id stays marked until `reconcile_saved` or
    /// `abandon_submit` is called for it.
    pub fn prepare_submit(&mut self, index: usize) -> Result<SubmitTicket, EditorError> {
        if self.mode() != EditorMode::Idle {
            return Err(self.reject("submit"));
        }
        self.check_polygon_index(index)?;

        let polygon = &self.polygons[index];
        if !polygon.is_closable() {
            return Err(EditorError::GeometryInvalid {
                vertices: polygon.len(),
            });
        }

        if self.in_flight.contains(&polygon.id) {
            tracing::warn!(index, id = %polygon.id, "[store] save already in flight");
            return Err(EditorError::SubmitInFlight { index });
        }

        let ticket = SubmitTicket {
            id: polygon.id.clone(),
            payload: SubmitPayload::from_polygon(polygon),
        };
        self.in_flight.insert(ticket.id.clone());
        Ok(ticket)
    }

    /// Forget a submission that failed. The polygon is left untouched.
    pub fn abandon_submit(&mut self, id: &PolygonId) {
        self.in_flight.remove(id);
    }

    /// Apply a save response to the polygon that was submitted as `id`.
    ///
    /// Returns false, leaving the polygons untouched, when that polygon no
    /// longer exists or another polygon already carries the saved id. Only
    /// the identity is replaced; points and metadata keep whatever the
    /// operator has done since the submit.
    pub fn reconcile_saved(&mut self, id: &PolygonId, record: &SavedRecord) -> bool {
        self.in_flight.remove(id);

        let Some(index) = self.index_of(id) else {
            tracing::warn!(%id, saved_id = %record.id, "[store] dropping stale save response");
            return false;
        };

        let saved_id = PolygonId::Saved(record.id.clone());
        if &saved_id != id && self.index_of(&saved_id).is_some() {
            tracing::warn!(
                %id,
                saved_id = %record.id,
                "[store] dropping save response, saved id already present"
            );
            return false;
        }

        self.polygons[index].id = saved_id;
        self.touch();
        tracing::debug!(index, saved_id = %record.id, "[store] polygon reconciled");
        true
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn allocate_id(&mut self) -> PolygonId {
        self.next_local_id += 1;
        PolygonId::Local(self.next_local_id)
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn reject(&self, action: &'static str) -> EditorError {
        let mode = self.mode();
        tracing::warn!(%mode, action, "[store] rejected transition");
        EditorError::InvalidTransition { mode, action }
    }

    fn check_polygon_index(&self, index: usize) -> Result<(), EditorError> {
        if index < self.polygons.len() {
            Ok(())
        } else {
            Err(EditorError::IndexOutOfRange {
                target: IndexTarget::Polygon,
                index,
                len: self.polygons.len(),
            })
        }
    }
}

/// Cloneable handle to one canvas's store.
///
/// Lets the view, the interaction layer and an in-flight save reach the same
/// state. Never hold a guard across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedPolygonStore {
    inner: Arc<RwLock<PolygonStore>>,
}

impl SharedPolygonStore {
    pub fn new(store: PolygonStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, PolygonStore> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, PolygonStore> {
        self.inner.write()
    }

    /// Version for change detection.
    pub fn version(&self) -> u64 {
        self.inner.read().version()
    }
}
