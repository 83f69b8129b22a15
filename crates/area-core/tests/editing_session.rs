//! End-to-end editing sessions through the public API: canvas events in,
//! saved areas out.

use std::sync::Arc;

use area_core::{
    AreaMetadata, AreaRepository, CanvasEvent, Command, EditorMode, InMemoryAreaRepository,
    InteractionLayer, InteractionOutcome, Key, Notice, PersistenceBridge, Point, PointerButton,
    PolygonId, PolygonStore, RecordingSink, SaveError, SavedRecord, SharedPolygonStore,
    StageTransform, SubmitPayload,
};
use tokio::sync::Notify;

fn click(x: f64, y: f64) -> CanvasEvent {
    CanvasEvent::PointerDown {
        pointer: Some(Point::new(x, y)),
        button: PointerButton::Primary,
    }
}

/// Draw a closed polygon from screen-space clicks.
fn draw(
    layer: &mut InteractionLayer,
    store: &SharedPolygonStore,
    stage: &StageTransform,
    clicks: &[(f64, f64)],
) -> usize {
    for &(x, y) in clicks {
        layer.handle_shared(store, &click(x, y), stage);
    }
    match layer.handle_shared(store, &CanvasEvent::Key { key: Key::Enter }, stage) {
        InteractionOutcome::Applied(Command::CloseDraft { index }) => index,
        other => panic!("expected the draft to close, got {other:?}"),
    }
}

/// Repository whose saves wait until the test releases them.
#[derive(Clone, Default)]
struct GatedRepository {
    inner: InMemoryAreaRepository,
    gate: Arc<Notify>,
}

impl AreaRepository for GatedRepository {
    async fn save(&self, payload: SubmitPayload) -> Result<SavedRecord, SaveError> {
        self.gate.notified().await;
        self.inner.save(payload).await
    }

    async fn list(&self) -> Result<Vec<SavedRecord>, SaveError> {
        self.inner.list().await
    }
}

#[tokio::test]
async fn draw_edit_and_save_on_zoomed_stage() {
    let store = SharedPolygonStore::new(PolygonStore::new());
    let mut layer = InteractionLayer::default();
    let stage = StageTransform::new(-200.0, 40.0, 0.5);

    let index = draw(
        &mut layer,
        &store,
        &stage,
        &[(-200.0, 40.0), (-150.0, 40.0), (-150.0, 90.0), (-200.0, 90.0)],
    );
    assert_eq!(index, 0);
    assert_eq!(
        store.read().polygons()[0].points,
        vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ]
    );

    // Select, then drag the third vertex out by 20 logical units.
    layer.handle_shared(&store, &click(-175.0, 65.0), &stage);
    assert_eq!(store.read().mode(), EditorMode::Editing(0));
    assert!(!store.read().can_save());

    layer.handle_shared(&store, &click(-150.0, 90.0), &stage);
    assert!(layer.is_dragging());
    layer.handle_shared(
        &store,
        &CanvasEvent::PointerMove {
            pointer: Some(Point::new(-140.0, 100.0)),
        },
        &stage,
    );
    layer.handle_shared(&store, &CanvasEvent::PointerUp { pointer: None }, &stage);
    layer.handle_shared(&store, &CanvasEvent::Key { key: Key::Escape }, &stage);

    assert_eq!(store.read().mode(), EditorMode::Idle);
    assert_eq!(store.read().polygons()[0].points[2], Point::new(120.0, 120.0));
    assert!(store.read().can_save());

    store
        .write()
        .set_metadata(
            0,
            AreaMetadata {
                name: Some("Licensed block A".to_string()),
                entity_id: Some("cluster-3".to_string()),
                color: None,
            },
        )
        .unwrap();

    let repo = InMemoryAreaRepository::new();
    let sink = RecordingSink::new();
    let bridge = PersistenceBridge::new(repo.clone(), sink.clone());
    let record = bridge.submit(&store, 0).await.unwrap();

    assert_eq!(record.points[2], [120.0, 120.0]);
    assert_eq!(record.entity_id.as_deref(), Some("cluster-3"));
    assert_eq!(store.read().polygons()[0].id, PolygonId::Saved(record.id));
    assert!(sink.notices().is_empty());
}

#[tokio::test]
async fn backend_failure_keeps_the_unsaved_polygon() {
    let store = SharedPolygonStore::default();
    let mut layer = InteractionLayer::default();
    let stage = StageTransform::IDENTITY;
    draw(&mut layer, &store, &stage, &[(0.0, 0.0), (30.0, 0.0), (0.0, 30.0)]);
    let before = store.read().polygons().to_vec();

    let repo = InMemoryAreaRepository::new();
    repo.fail_with(Some(SaveError::Rejected("duplicate area".to_string())));
    let sink = RecordingSink::new();
    let bridge = PersistenceBridge::new(repo.clone(), sink.clone());

    assert!(bridge.submit(&store, 0).await.is_err());

    assert_eq!(store.read().polygons(), before.as_slice());
    assert!(matches!(store.read().polygons()[0].id, PolygonId::Local(_)));
    let notices = sink.take();
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0], Notice::SaveFailed { .. }));

    // The operator retries by hand once the backend recovers.
    repo.fail_with(None);
    bridge.submit(&store, 0).await.unwrap();
    assert_eq!(store.read().polygons().len(), 1);
    assert!(store.read().polygons()[0].id.is_saved());
    assert!(sink.notices().is_empty());
}

#[tokio::test]
async fn late_response_for_removed_polygon_is_dropped() {
    let store = SharedPolygonStore::default();
    let mut layer = InteractionLayer::default();
    let stage = StageTransform::IDENTITY;
    draw(&mut layer, &store, &stage, &[(0.0, 0.0), (30.0, 0.0), (0.0, 30.0)]);
    draw(&mut layer, &store, &stage, &[(100.0, 0.0), (130.0, 0.0), (100.0, 30.0)]);

    let repo = GatedRepository::default();
    let gate = repo.gate.clone();
    let bridge = PersistenceBridge::new(repo, RecordingSink::new());

    let (saved, ()) = tokio::join!(bridge.submit(&store, 0), async {
        // The store stays editable while the save is in flight.
        layer.handle_shared(&store, &click(5.0, 5.0), &stage);
        layer.handle_shared(&store, &CanvasEvent::Key { key: Key::Delete }, &stage);
        gate.notify_one();
    });

    let saved = saved.unwrap();
    let guard = store.read();
    assert_eq!(guard.polygons().len(), 1);
    assert_eq!(guard.polygons()[0].points[0], Point::new(100.0, 0.0));
    assert!(matches!(guard.polygons()[0].id, PolygonId::Local(_)));
    assert!(guard.index_of(&PolygonId::Saved(saved.id)).is_none());
}

#[tokio::test]
async fn edits_during_a_save_are_kept() {
    let store = SharedPolygonStore::default();
    let mut layer = InteractionLayer::default();
    let stage = StageTransform::IDENTITY;
    draw(&mut layer, &store, &stage, &[(0.0, 0.0), (30.0, 0.0), (0.0, 30.0)]);

    let repo = GatedRepository::default();
    let gate = repo.gate.clone();
    let bridge = PersistenceBridge::new(repo, RecordingSink::new());

    let (saved, ()) = tokio::join!(bridge.submit(&store, 0), async {
        let mut guard = store.write();
        guard.begin_edit(0).unwrap();
        guard.move_vertex(0, 1, Point::new(40.0, 0.0)).unwrap();
        guard.end_edit();
        drop(guard);
        gate.notify_one();
    });

    let saved = saved.unwrap();
    assert_eq!(saved.points[1], [30.0, 0.0]);

    let guard = store.read();
    assert_eq!(guard.polygons()[0].id, PolygonId::Saved(saved.id));
    assert_eq!(guard.polygons()[0].points[1], Point::new(40.0, 0.0));
}

#[tokio::test]
async fn double_pressed_save_creates_one_record() {
    let store = SharedPolygonStore::default();
    let mut layer = InteractionLayer::default();
    let stage = StageTransform::IDENTITY;
    draw(&mut layer, &store, &stage, &[(0.0, 0.0), (30.0, 0.0), (0.0, 30.0)]);

    let repo = GatedRepository::default();
    let gate = repo.gate.clone();
    let sink = RecordingSink::new();
    let bridge = PersistenceBridge::new(repo.clone(), sink.clone());

    let (first, second, ()) = tokio::join!(
        bridge.submit(&store, 0),
        bridge.submit(&store, 0),
        async { gate.notify_one() }
    );

    let first = first.unwrap();
    assert!(matches!(second, Err(SaveError::NotReady(_))));
    assert_eq!(repo.inner.records().len(), 1);
    assert_eq!(store.read().polygons()[0].id, PolygonId::Saved(first.id.clone()));
    assert!(sink.notices().is_empty());

    // Once the first response is in, saving again updates the same record.
    gate.notify_one();
    let again = bridge.submit(&store, 0).await.unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(repo.inner.records().len(), 1);
}

#[test]
fn drawing_and_editing_are_exclusive() {
    let store = SharedPolygonStore::default();
    let mut layer = InteractionLayer::default();
    let stage = StageTransform::IDENTITY;
    draw(&mut layer, &store, &stage, &[(0.0, 0.0), (30.0, 0.0), (0.0, 30.0)]);

    let mut guard = store.write();
    guard.begin_edit(0).unwrap();
    assert!(guard.begin_draft().is_err());
    assert_eq!(guard.mode(), EditorMode::Editing(0));
    assert!(guard.draft().is_none());
}
