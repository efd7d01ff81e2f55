use duet_canvas::{DrawingSurface, History, LocalRelay, PathRecord, SurfaceConfig, MAX_HISTORY};
use egui::{Color32, Pos2};
use std::sync::Arc;

fn snapshot(len: usize) -> Vec<Arc<PathRecord>> {
    (0..len)
        .map(|i| Arc::new(PathRecord::new(Color32::BLACK, 2.0, format!("M{i} 0 L{i} 10"))))
        .collect()
}

#[test]
fn test_history_length_after_n_strokes() {
    let mut surface = DrawingSurface::new(SurfaceConfig::default(), Arc::new(LocalRelay::new()));
    for n in 1..=MAX_HISTORY + 15 {
        surface.drag_start(Pos2::new(n as f32, 1.0));
        surface.drag_update(Pos2::new(n as f32, 30.0));
        surface.drag_end();

        let history = surface.history();
        assert_eq!(history.len(), (n + 1).min(MAX_HISTORY), "after stroke {n}");
        assert_eq!(history.index(), history.len() - 1);
    }
}

#[test]
fn test_undo_then_redo_restores_sequence() {
    let mut surface = DrawingSurface::new(SurfaceConfig::default(), Arc::new(LocalRelay::new()));
    for n in 0..8 {
        surface.drag_start(Pos2::new(n as f32, 1.0));
        surface.drag_end();
    }

    // Walk the cursor back, checking the round-trip law at every position
    while surface.can_undo() {
        let before: Vec<_> = surface.paths().to_vec();
        surface.undo();
        surface.redo();
        assert_eq!(surface.paths(), before.as_slice());
        surface.undo();
    }
    assert!(surface.paths().is_empty());
}

#[test]
fn test_fifty_one_pushes_evict_the_oldest() {
    let mut history = History::new(snapshot(0));
    for i in 1..=51 {
        history.push(snapshot(i));
    }
    assert_eq!(history.len(), MAX_HISTORY);

    let mut reachable = vec![history.current().len()];
    while let Some(entry) = history.undo() {
        reachable.push(entry.len());
    }
    assert!(!reachable.contains(&0));
    assert!(!reachable.contains(&1));
    assert_eq!(*reachable.last().unwrap(), 2);
}

#[test]
fn test_new_push_discards_redo_branch() {
    let mut history = History::new(snapshot(0));
    history.push(snapshot(1));
    history.push(snapshot(2));
    history.undo();
    history.undo();
    history.push(snapshot(5));

    assert_eq!(history.len(), 2);
    assert!(!history.can_redo());
    assert_eq!(history.current().len(), 5);
}
