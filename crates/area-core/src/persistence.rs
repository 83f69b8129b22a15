//! Persistence bridge: submit closed polygons to the area backend and fold the
//! response back into the store.
//!
//! The store is never locked across the network round-trip. The operator can
//! keep editing while a save is in flight; the response is matched back by
//! the id captured at submit time and dropped if that polygon is gone.

use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EditorError;
use crate::geometry::Point;
use crate::interaction::Notice;
use crate::polygon::{AreaMetadata, Polygon, PolygonId};
use crate::store::{SharedPolygonStore, SubmitTicket};

// ============================================================================
// Wire types
// ============================================================================

/// Outbound body of a save request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitPayload {
    /// Backend id when re-saving an area that was saved before.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub points: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SubmitPayload {
    pub fn from_polygon(polygon: &Polygon) -> Self {
        Self {
            id: match &polygon.id {
                PolygonId::Saved(id) => Some(id.clone()),
                PolygonId::Local(_) => None,
            },
            points: polygon.points.iter().copied().map(<[f64; 2]>::from).collect(),
            entity_id: polygon.metadata.entity_id.clone(),
            name: polygon.metadata.name.clone(),
        }
    }
}

/// A saved area as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecord {
    pub id: String,
    pub points: Vec<[f64; 2]>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl SavedRecord {
    pub fn into_polygon(self) -> Polygon {
        Polygon::new(
            PolygonId::Saved(self.id),
            self.points.into_iter().map(Point::from).collect(),
            AreaMetadata {
                name: self.name,
                entity_id: self.entity_id,
                color: None,
            },
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    #[error("save rejected: {0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("not ready to save: {0}")]
    NotReady(&'static str),

    #[error(transparent)]
    Store(#[from] EditorError),
}

// ============================================================================
// Seams
// ============================================================================

/// Backend that stores areas. Transport, auth and routes live behind it.
pub trait AreaRepository {
    fn save(
        &self,
        payload: SubmitPayload,
    ) -> impl Future<Output = Result<SavedRecord, SaveError>> + Send;

    fn list(&self) -> impl Future<Output = Result<Vec<SavedRecord>, SaveError>> + Send;
}

/// Where operator-facing notices go (toasts in a UI).
pub trait NoticeSink {
    fn notify(&self, notice: Notice);
}

/// Collects notices; cloning shares the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl NoticeSink for RecordingSink {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

/// Emits notices through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NoticeSink for LogSink {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::NotEnoughVertices { count } => {
                tracing::warn!(count, "A polygon needs at least 3 points");
            }
            Notice::SaveFailed { message } => tracing::error!("Saving area failed: {message}"),
            Notice::LoadFailed { message } => tracing::error!("Loading areas failed: {message}"),
        }
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Outcome of [`PersistenceBridge::submit_pending`].
#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<SavedRecord>,
    /// First failure; nothing after it was attempted.
    pub failed: Option<SaveError>,
}

pub struct PersistenceBridge<R, N> {
    repository: R,
    notices: N,
}

impl<R, N> PersistenceBridge<R, N>
where
    R: AreaRepository,
    N: NoticeSink,
{
    pub fn new(repository: R, notices: N) -> Self {
        Self {
            repository,
            notices,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Save the committed polygon at `index`.
    ///
    /// On success the polygon (if still present) takes the backend id. On
    /// failure the store is left as it was and one notice is emitted. There
    /// is no retry.
    pub async fn submit(
        &self,
        store: &SharedPolygonStore,
        index: usize,
    ) -> Result<SavedRecord, SaveError> {
        let ticket = store.write().prepare_submit(index).map_err(refusal)?;
        self.send(store, ticket).await
    }

    /// Save every polygon that has never been saved, one at a time, stopping
    /// at the first failure.
    pub async fn submit_pending(&self, store: &SharedPolygonStore) -> SaveReport {
        let pending: Vec<PolygonId> = store
            .read()
            .polygons()
            .iter()
            .filter(|p| !p.id.is_saved())
            .map(|p| p.id.clone())
            .collect();

        let mut report = SaveReport::default();
        for id in pending {
            let ticket = {
                let mut guard = store.write();
                let Some(index) = guard.index_of(&id) else {
                    // Removed while earlier saves were in flight.
                    continue;
                };
                guard.prepare_submit(index)
            };

            let result = match ticket.map_err(refusal) {
                Ok(ticket) => self.send(store, ticket).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(record) => report.saved.push(record),
                Err(err) => {
                    report.failed = Some(err);
                    break;
                }
            }
        }
        report
    }

    /// Replace the store's committed set with what the backend has.
    pub async fn hydrate(&self, store: &SharedPolygonStore) -> Result<usize, SaveError> {
        let records = match self.repository.list().await {
            Ok(records) => records,
            Err(err) => {
                self.notices.notify(Notice::LoadFailed {
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        let loaded = store.write().load_saved(records)?;
        tracing::info!(loaded, "[persistence] areas loaded");
        Ok(loaded)
    }

    async fn send(
        &self,
        store: &SharedPolygonStore,
        ticket: SubmitTicket,
    ) -> Result<SavedRecord, SaveError> {
        let SubmitTicket { id, payload } = ticket;
        tracing::debug!(%id, vertices = payload.points.len(), "[persistence] submitting area");

        match self.repository.save(payload).await {
            Ok(record) => {
                if store.write().reconcile_saved(&id, &record) {
                    tracing::info!(local_id = %id, saved_id = %record.id, "[persistence] area saved");
                }
                Ok(record)
            }
            Err(err) => {
                store.write().abandon_submit(&id);
                tracing::warn!(%id, error = %err, "[persistence] save failed");
                self.notices.notify(Notice::SaveFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

/// Map a store refusal to the error a save caller sees.
fn refusal(err: EditorError) -> SaveError {
    match err {
        EditorError::InvalidTransition { .. } => {
            SaveError::NotReady("finish drawing or editing before saving")
        }
        EditorError::GeometryInvalid { .. } => {
            SaveError::NotReady("an area needs at least 3 points")
        }
        EditorError::SubmitInFlight { .. } => {
            SaveError::NotReady("this area is already being saved")
        }
        err @ EditorError::IndexOutOfRange { .. } => SaveError::Store(err),
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local area backend for tests and offline tooling.
///
/// Clones share storage. `fail_with` makes every following save fail until
/// cleared.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAreaRepository {
    records: Arc<RwLock<Vec<SavedRecord>>>,
    failure: Arc<RwLock<Option<SaveError>>>,
}

impl InMemoryAreaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail subsequent saves with `error`, or succeed again with `None`.
    pub fn fail_with(&self, error: Option<SaveError>) {
        *self.failure.write() = error;
    }

    pub fn records(&self) -> Vec<SavedRecord> {
        self.records.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<SavedRecord> {
        self.records.read().iter().find(|r| r.id == id).cloned()
    }

    fn store_record(&self, payload: SubmitPayload) -> Result<SavedRecord, SaveError> {
        if let Some(err) = self.failure.read().clone() {
            return Err(err);
        }
        if payload.points.len() < crate::geometry::MIN_CLOSED_VERTICES {
            return Err(SaveError::Rejected(
                "an area needs at least 3 points".to_string(),
            ));
        }

        let record = SavedRecord {
            id: payload
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            points: payload.points,
            entity_id: payload.entity_id,
            name: payload.name,
        };

        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(record)
    }
}

impl AreaRepository for InMemoryAreaRepository {
    async fn save(&self, payload: SubmitPayload) -> Result<SavedRecord, SaveError> {
        self.store_record(payload)
    }

    async fn list(&self) -> Result<Vec<SavedRecord>, SaveError> {
        if let Some(err) = self.failure.read().clone() {
            return Err(err);
        }
        Ok(self.records())
    }
}
