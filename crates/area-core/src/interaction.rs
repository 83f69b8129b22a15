//! Canvas input → store commands.
//!
//! The layer keeps only gesture state (which vertex is being dragged). All
//! area state lives in the [`PolygonStore`] passed in with each event, and
//! every event carries the stage snapshot it happened under.

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::geometry::Point;
use crate::store::{EditorMode, PolygonStore, SharedPolygonStore};
use crate::transform::{StageTransform, screen_to_logical};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Escape,
    Enter,
    Backspace,
    Delete,
    #[serde(other)]
    Other,
}

/// Raw input from the rendering surface.
///
/// `pointer` is the position relative to the surface origin, `None` when the
/// surface could not report one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasEvent {
    PointerDown {
        pointer: Option<Point>,
        #[serde(default)]
        button: PointerButton,
    },
    PointerMove {
        pointer: Option<Point>,
    },
    PointerUp {
        pointer: Option<Point>,
    },
    DoubleClick {
        pointer: Option<Point>,
    },
    Key {
        key: Key,
    },
    /// Explicit "close polygon" control.
    CloseRequested,
    /// Explicit "cancel" control.
    CancelRequested,
}

/// Store command applied in response to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    BeginDraft { first_point: Point },
    AddPoint { point: Point, vertices: usize },
    UndoPoint { remaining: usize },
    CloseDraft { index: usize },
    CancelDraft,
    BeginEdit { index: usize },
    SwitchEdit { from: usize, to: usize },
    EndEdit { index: usize },
    StartVertexDrag { index: usize, vertex: usize },
    MoveVertex { index: usize, vertex: usize, point: Point },
    EndVertexDrag { index: usize, vertex: usize },
    RemovePolygon { index: usize },
}

/// Non-fatal message for the operator (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    NotEnoughVertices { count: usize },
    SaveFailed { message: String },
    LoadFailed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionOutcome {
    /// The event had no effect in the current mode.
    Ignored,
    Applied(Command),
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VertexDrag {
    index: usize,
    vertex: usize,
}

/// Translates canvas events into [`PolygonStore`] commands.
#[derive(Debug, Clone, Default)]
pub struct InteractionLayer {
    config: EditorConfig,
    drag: Option<VertexDrag>,
}

impl InteractionLayer {
    pub fn new(config: EditorConfig) -> Self {
        Self { config, drag: None }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Forget any gesture in progress.
    pub fn reset(&mut self) {
        self.drag = None;
    }

    /// Handle one event against a shared store, holding the write lock only
    /// for the duration of the event.
    pub fn handle_shared(
        &mut self,
        store: &SharedPolygonStore,
        event: &CanvasEvent,
        stage: &StageTransform,
    ) -> InteractionOutcome {
        let mut guard = store.write();
        self.handle(&mut guard, event, stage)
    }

    pub fn handle(
        &mut self,
        store: &mut PolygonStore,
        event: &CanvasEvent,
        stage: &StageTransform,
    ) -> InteractionOutcome {
        match event {
            CanvasEvent::PointerDown {
                pointer,
                button: PointerButton::Primary,
            } => self.pointer_down(store, *pointer, stage),
            CanvasEvent::PointerDown {
                button: PointerButton::Secondary,
                ..
            } => InteractionOutcome::Ignored,
            CanvasEvent::PointerMove { pointer } => self.pointer_move(store, *pointer, stage),
            CanvasEvent::PointerUp { pointer } => self.pointer_up(store, *pointer, stage),
            CanvasEvent::DoubleClick { .. } | CanvasEvent::CloseRequested => Self::close(store),
            CanvasEvent::CancelRequested => self.cancel(store),
            CanvasEvent::Key { key } => match key {
                Key::Enter => Self::close(store),
                Key::Escape => self.cancel(store),
                Key::Backspace => Self::undo_point(store),
                Key::Delete => self.remove_edited(store),
                Key::Other => InteractionOutcome::Ignored,
            },
        }
    }

    fn pointer_down(
        &mut self,
        store: &mut PolygonStore,
        pointer: Option<Point>,
        stage: &StageTransform,
    ) -> InteractionOutcome {
        // A press always starts a new gesture, even if the last release never
        // reached the canvas.
        self.reset();
        let Some(point) = locate(pointer, stage) else {
            return InteractionOutcome::Ignored;
        };

        match store.mode() {
            EditorMode::Drawing => match store.add_point(point) {
                Ok(vertices) => InteractionOutcome::Applied(Command::AddPoint { point, vertices }),
                Err(err) => contract_violation(&err),
            },
            EditorMode::Idle => {
                if let Some(index) = self.polygon_at(store, point, stage) {
                    return match store.begin_edit(index) {
                        Ok(()) => InteractionOutcome::Applied(Command::BeginEdit { index }),
                        Err(err) => contract_violation(&err),
                    };
                }
                let started = store.begin_draft().and_then(|()| store.add_point(point));
                match started {
                    Ok(_) => InteractionOutcome::Applied(Command::BeginDraft { first_point: point }),
                    Err(err) => {
                        store.cancel_draft();
                        contract_violation(&err)
                    }
                }
            }
            EditorMode::Editing(index) => {
                let radius = stage.screen_distance_to_logical(self.config.vertex_handle_radius);
                let handle = store
                    .polygon(index)
                    .and_then(|polygon| polygon.vertex_at(point, radius));
                if let Some(vertex) = handle {
                    self.drag = Some(VertexDrag { index, vertex });
                    return InteractionOutcome::Applied(Command::StartVertexDrag { index, vertex });
                }

                match self.polygon_at(store, point, stage) {
                    Some(hit) if hit == index => InteractionOutcome::Ignored,
                    Some(hit) => {
                        store.end_edit();
                        match store.begin_edit(hit) {
                            Ok(()) => InteractionOutcome::Applied(Command::SwitchEdit {
                                from: index,
                                to: hit,
                            }),
                            Err(err) => contract_violation(&err),
                        }
                    }
                    None => {
                        store.end_edit();
                        InteractionOutcome::Applied(Command::EndEdit { index })
                    }
                }
            }
        }
    }

    fn pointer_move(
        &mut self,
        store: &mut PolygonStore,
        pointer: Option<Point>,
        stage: &StageTransform,
    ) -> InteractionOutcome {
        let Some(drag) = self.drag else {
            return InteractionOutcome::Ignored;
        };
        if store.mode() != EditorMode::Editing(drag.index) {
            self.reset();
            return InteractionOutcome::Ignored;
        }
        let Some(point) = locate(pointer, stage) else {
            return InteractionOutcome::Ignored;
        };

        match store.move_vertex(drag.index, drag.vertex, point) {
            Ok(()) => InteractionOutcome::Applied(Command::MoveVertex {
                index: drag.index,
                vertex: drag.vertex,
                point,
            }),
            Err(err) => {
                self.reset();
                contract_violation(&err)
            }
        }
    }

    fn pointer_up(
        &mut self,
        store: &mut PolygonStore,
        pointer: Option<Point>,
        stage: &StageTransform,
    ) -> InteractionOutcome {
        let Some(drag) = self.drag.take() else {
            return InteractionOutcome::Ignored;
        };

        if let Some(point) = locate(pointer, stage) {
            if let Err(err) = store.move_vertex(drag.index, drag.vertex, point) {
                return contract_violation(&err);
            }
        }

        InteractionOutcome::Applied(Command::EndVertexDrag {
            index: drag.index,
            vertex: drag.vertex,
        })
    }

    fn close(store: &mut PolygonStore) -> InteractionOutcome {
        if store.mode() != EditorMode::Drawing {
            return InteractionOutcome::Ignored;
        }

        match store.close_draft() {
            Ok(index) => InteractionOutcome::Applied(Command::CloseDraft { index }),
            Err(EditorError::GeometryInvalid { vertices }) => {
                InteractionOutcome::Notice(Notice::NotEnoughVertices { count: vertices })
            }
            Err(err) => contract_violation(&err),
        }
    }

    fn cancel(&mut self, store: &mut PolygonStore) -> InteractionOutcome {
        match store.mode() {
            EditorMode::Drawing => {
                store.cancel_draft();
                InteractionOutcome::Applied(Command::CancelDraft)
            }
            EditorMode::Editing(index) => {
                self.reset();
                store.end_edit();
                InteractionOutcome::Applied(Command::EndEdit { index })
            }
            EditorMode::Idle => InteractionOutcome::Ignored,
        }
    }

    fn undo_point(store: &mut PolygonStore) -> InteractionOutcome {
        if store.mode() != EditorMode::Drawing {
            return InteractionOutcome::Ignored;
        }
        match store.undo_last_point() {
            Ok(remaining) => InteractionOutcome::Applied(Command::UndoPoint { remaining }),
            Err(err) => contract_violation(&err),
        }
    }

    fn remove_edited(&mut self, store: &mut PolygonStore) -> InteractionOutcome {
        let EditorMode::Editing(index) = store.mode() else {
            return InteractionOutcome::Ignored;
        };
        self.reset();
        match store.remove_polygon(index) {
            Ok(_) => InteractionOutcome::Applied(Command::RemovePolygon { index }),
            Err(err) => contract_violation(&err),
        }
    }

    /// Topmost (most recently committed) polygon under `point`.
    fn polygon_at(
        &self,
        store: &PolygonStore,
        point: Point,
        stage: &StageTransform,
    ) -> Option<usize> {
        let tolerance = stage.screen_distance_to_logical(self.config.edge_hit_tolerance);
        store
            .polygons()
            .iter()
            .rposition(|polygon| polygon.hit_test(point, tolerance))
    }
}

/// Logical position of a pointer event, `None` when there is no usable
/// position. The origin fallback of [`screen_to_logical`] is never used as a
/// click.
fn locate(pointer: Option<Point>, stage: &StageTransform) -> Option<Point> {
    if pointer.is_none() || stage.is_degenerate() {
        tracing::debug!("[interaction] pointer unavailable, event dropped");
        return None;
    }
    Some(screen_to_logical(pointer, stage))
}

fn contract_violation(err: &EditorError) -> InteractionOutcome {
    tracing::warn!(error = %err, "[interaction] store rejected command");
    InteractionOutcome::Ignored
}
