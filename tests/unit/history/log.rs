use super::*;
use crate::layers::layer::{LayerId, NewLayer, PixelBuffer};

// Store with one layer whose opacity each test command toggles.
fn store() -> (LayerStore, LayerId) {
    let mut s = LayerStore::new();
    let id = s
        .create_layer(NewLayer::raster("a", PixelBuffer::new(2, 2, 4).unwrap(), 0, 0), None)
        .unwrap();
    (s, id)
}

fn set_opacity(s: &mut LayerStore, id: LayerId, opacity: u8) -> Command {
    let mut p = s.layer(id).unwrap().params();
    p.opacity = opacity;
    let old = s.set_params(id, p).unwrap();
    Command::ParameterChange { layer: id, params: old }
}

fn opacity(s: &LayerStore, id: LayerId) -> u8 {
    s.layer(id).unwrap().opacity()
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(matches!(HistoryLog::new(0), Err(LayerdocError::Validation(_))));
}

#[test]
fn state_machine_walks_through_all_states() {
    let (mut s, id) = store();
    let mut log = HistoryLog::new(4).unwrap();
    assert_eq!(log.state(), HistoryState::Empty);
    assert!(log.undo(&mut s).unwrap().is_none());
    assert!(log.redo(&mut s).unwrap().is_none());

    let cmd = set_opacity(&mut s, id, 50);
    log.append("fade", cmd);
    assert_eq!(log.state(), HistoryState::HasUndo);
    let cmd = set_opacity(&mut s, id, 20);
    log.append("fade more", cmd);
    assert_eq!(log.undo_entry().map(HistoryEntry::name), Some("fade more"));

    let undone = log.undo(&mut s).unwrap().unwrap();
    assert_eq!(undone.name, "fade more");
    assert_eq!(opacity(&s, id), 50);
    assert_eq!(log.state(), HistoryState::HasBoth);

    log.undo(&mut s).unwrap();
    assert_eq!(opacity(&s, id), 100);
    assert_eq!(log.state(), HistoryState::HasRedo);
    assert_eq!(log.redo_entry().map(HistoryEntry::name), Some("fade"));

    log.redo(&mut s).unwrap();
    log.redo(&mut s).unwrap();
    assert_eq!(opacity(&s, id), 20);
    assert_eq!(log.state(), HistoryState::HasUndo);
}

#[test]
fn ring_keeps_only_capacity_entries() {
    let (mut s, id) = store();
    let mut log = HistoryLog::new(3).unwrap();
    for step in 1..=5u8 {
        let cmd = set_opacity(&mut s, id, step * 10);
        log.append(format!("step {step}"), cmd);
        assert!(log.rest_undo() + log.rest_redo() <= log.capacity());
    }
    assert_eq!(log.rest_undo(), 3);

    let mut undone = Vec::new();
    while let Some(r) = log.undo(&mut s).unwrap() {
        undone.push(r.name);
    }
    assert_eq!(undone, ["step 5", "step 4", "step 3"]);
    // Steps 1 and 2 were evicted, so the oldest reachable state is after step 2.
    assert_eq!(opacity(&s, id), 20);
    assert_eq!(log.rest_redo(), 3);
}

#[test]
fn append_clears_redo() {
    let (mut s, id) = store();
    let mut log = HistoryLog::new(4).unwrap();
    let cmd = set_opacity(&mut s, id, 10);
    log.append("a", cmd);
    let cmd = set_opacity(&mut s, id, 20);
    log.append("b", cmd);
    log.undo(&mut s).unwrap();
    assert_eq!(log.rest_redo(), 1);

    let cmd = set_opacity(&mut s, id, 30);
    log.append("c", cmd);
    assert_eq!(log.rest_redo(), 0);
    assert_eq!(log.rest_undo(), 2);
    assert!(log.redo(&mut s).unwrap().is_none());
    assert!(log.redo_entry().is_none());
}

#[test]
fn capacity_one_still_undoes_the_latest() {
    let (mut s, id) = store();
    let mut log = HistoryLog::new(1).unwrap();
    let cmd = set_opacity(&mut s, id, 10);
    log.append("a", cmd);
    let cmd = set_opacity(&mut s, id, 20);
    log.append("b", cmd);
    assert_eq!(log.rest_undo(), 1);
    assert_eq!(log.undo(&mut s).unwrap().unwrap().name, "b");
    assert_eq!(opacity(&s, id), 10);
    assert!(log.undo(&mut s).unwrap().is_none());
    log.redo(&mut s).unwrap();
    assert_eq!(opacity(&s, id), 20);
}

#[test]
fn clear_empties_the_log() {
    let (mut s, id) = store();
    let mut log = HistoryLog::new(2).unwrap();
    let cmd = set_opacity(&mut s, id, 10);
    log.append("a", cmd);
    log.clear();
    assert_eq!(log.state(), HistoryState::Empty);
    assert!(log.undo(&mut s).unwrap().is_none());
}
