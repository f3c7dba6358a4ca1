// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end editing scenarios driven through the public editor API.

use nodeflow_graph::diff::GraphChange;
use nodeflow_graph::error::ConstraintKind;
use nodeflow_graph::{
    CanvasHit, Connection, EditorEvent, Endpoint, EngineConfig, GraphEditor, GraphSnapshot, Modifiers, Node, Point,
    PointerEvent, Port, Rect, ResizeHandle, Size,
};
use std::cell::RefCell;
use std::rc::Rc;

fn source(id: &str, x: f32, y: f32) -> Node {
    Node::new(id, "source")
        .with_position(x, y)
        .with_output(Port::output("out", "Out"))
}

fn sink(id: &str, x: f32, y: f32) -> Node {
    Node::new(id, "sink")
        .with_position(x, y)
        .with_input(Port::input("in", "In"))
}

fn record(editor: &mut GraphEditor) -> Rc<RefCell<Vec<EditorEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    editor.listen(move |event| sink.borrow_mut().push(event.clone()));
    events
}

#[test]
fn test_second_connection_into_single_input_is_rejected() {
    let mut editor = GraphEditor::default();
    editor.add_node(source("a", 0.0, 0.0)).unwrap();
    editor.add_node(source("b", 0.0, 200.0)).unwrap();
    editor.add_node(sink("c", 400.0, 100.0)).unwrap();
    editor
        .add_connection(Connection::new("ac", Endpoint::new("a", "out"), Endpoint::new("c", "in")))
        .unwrap();
    let revision = editor.store().revision();

    let err = editor
        .add_connection(Connection::new("bc", Endpoint::new("b", "out"), Endpoint::new("c", "in")))
        .unwrap_err();

    assert_eq!(err.kind(), ConstraintKind::PortCapacityExceeded);
    assert_eq!(editor.graph().connection_count(), 1);
    assert!(editor.graph().connection(&"ac".into()).is_some());
    assert_eq!(editor.store().revision(), revision);
}

#[test]
fn test_connect_gesture_into_full_input_commits_nothing() {
    let mut editor = GraphEditor::default();
    editor.add_node(source("a", 0.0, 0.0)).unwrap();
    editor.add_node(source("b", 0.0, 200.0)).unwrap();
    editor.add_node(sink("c", 400.0, 100.0)).unwrap();
    editor
        .add_connection(Connection::new("ac", Endpoint::new("a", "out"), Endpoint::new("c", "in")))
        .unwrap();

    // b.out sits at (180, 240), c.in at (400, 140)
    editor.pointer_down(PointerEvent::new(180.0, 240.0));
    editor.pointer_move(PointerEvent::new(300.0, 190.0));
    editor.pointer_move(PointerEvent::new(400.0, 140.0));
    editor.pointer_up(PointerEvent::new(400.0, 140.0));

    assert!(editor.mode().is_idle());
    assert_eq!(editor.graph().connection_count(), 1);
}

#[test]
fn test_drag_commits_grid_snapped_position() {
    let mut config = EngineConfig::default();
    config.snap.enabled = true;
    config.snap.grid_size = Some(20.0);
    let mut editor = GraphEditor::new(config).unwrap();
    editor.add_node(Node::new("n", "t").with_position(100.0, 100.0)).unwrap();
    let events = record(&mut editor);

    // grab the node 50px inside its origin, move by (17, 3)
    editor.pointer_down(PointerEvent::new(150.0, 150.0));
    editor.pointer_move(PointerEvent::new(160.0, 152.0));
    assert_eq!(editor.graph().node(&"n".into()).unwrap().position, Point::new(100.0, 100.0));
    editor.pointer_move(PointerEvent::new(167.0, 153.0));
    editor.pointer_up(PointerEvent::new(167.0, 153.0));

    assert_eq!(editor.graph().node(&"n".into()).unwrap().position, Point::new(120.0, 100.0));
    let events = events.borrow();
    assert!(events.contains(&EditorEvent::DragStarted(vec!["n".into()])));
    assert!(events.contains(&EditorEvent::DragStopped {
        nodes: vec!["n".into()],
        committed: true,
    }));
}

#[test]
fn test_removing_target_node_cascades_its_connection() {
    let mut editor = GraphEditor::default();
    editor.add_node(source("a", 0.0, 0.0)).unwrap();
    editor.add_node(sink("b", 300.0, 0.0)).unwrap();
    editor
        .add_connection(Connection::new("ab", Endpoint::new("a", "out"), Endpoint::new("b", "in")))
        .unwrap();
    editor.select_connection("ab".into(), false);
    let events = record(&mut editor);

    let diff = editor.remove_node(&"b".into());

    assert_eq!(editor.graph().connection_count(), 0);
    assert!(editor.path(&"ab".into()).is_none());
    assert!(editor.selection().is_empty());
    assert!(diff
        .changes
        .iter()
        .any(|c| matches!(c, GraphChange::ConnectionRemoved { connection, .. } if connection.id.as_str() == "ab")));
    assert!(events
        .borrow()
        .contains(&EditorEvent::ConnectionDeleted("ab".into())));

    // one undo restores both the node and its connection
    editor.undo().unwrap();
    assert!(editor.graph().contains_node(&"b".into()));
    assert!(editor.graph().connection(&"ab".into()).is_some());
    assert!(editor.path(&"ab".into()).is_some());
}

#[test]
fn test_left_edge_resize_keeps_right_edge_fixed() {
    let mut editor = GraphEditor::default();
    editor.add_node(Node::new("n", "t").with_position(100.0, 100.0)).unwrap();
    assert_eq!(
        editor.hit_test(Point::new(102.0, 140.0)),
        Some(CanvasHit::ResizeHandle("n".into(), ResizeHandle::Left))
    );

    editor.pointer_down(PointerEvent::new(102.0, 140.0));
    editor.pointer_move(PointerEvent::new(90.0, 145.0));
    editor.pointer_move(PointerEvent::new(72.0, 150.0));
    assert_eq!(
        editor.display_bounds(&"n".into()),
        Some(Rect::from_points(Point::new(70.0, 100.0), Point::new(280.0, 180.0)))
    );
    assert_eq!(editor.graph().node(&"n".into()).unwrap().position, Point::new(100.0, 100.0));
    editor.pointer_up(PointerEvent::new(72.0, 150.0));

    let node = editor.graph().node(&"n".into()).unwrap();
    assert_eq!(node.position, Point::new(70.0, 100.0));
    assert_eq!(node.size, Size::new(210.0, 80.0));

    editor.undo().unwrap();
    let node = editor.graph().node(&"n".into()).unwrap();
    assert_eq!(node.position, Point::new(100.0, 100.0));
    assert_eq!(node.size, Size::new(180.0, 80.0));
}

#[test]
fn test_top_left_resize_clamps_against_opposite_corner() {
    let mut editor = GraphEditor::default();
    editor.add_node(Node::new("n", "t").with_position(100.0, 100.0)).unwrap();

    // drag the top-left corner past the bottom-right one
    editor.pointer_down(PointerEvent::new(105.0, 105.0));
    editor.pointer_move(PointerEvent::new(200.0, 150.0));
    editor.pointer_move(PointerEvent::new(305.0, 205.0));
    editor.pointer_up(PointerEvent::new(305.0, 205.0));

    let node = editor.graph().node(&"n".into()).unwrap();
    assert_eq!(node.size, Size::new(40.0, 40.0));
    assert_eq!(node.position, Point::new(240.0, 140.0));
    assert_eq!(node.bounds().max, Point::new(280.0, 180.0));
}

#[test]
fn test_marquee_selects_contained_nodes() {
    let mut editor = GraphEditor::default();
    editor.add_node(Node::new("n1", "t").with_position(0.0, 0.0)).unwrap();
    editor.add_node(Node::new("n2", "t").with_position(200.0, 0.0)).unwrap();
    editor.add_node(Node::new("n3", "t").with_position(600.0, 0.0)).unwrap();
    let events = record(&mut editor);

    editor.pointer_down(PointerEvent::new(-10.0, -10.0));
    editor.pointer_move(PointerEvent::new(200.0, 50.0));
    assert!(editor.mode().marquee().is_some());
    editor.pointer_move(PointerEvent::new(390.0, 90.0));
    editor.pointer_up(PointerEvent::new(390.0, 90.0));

    let selected: Vec<String> = editor
        .selection()
        .nodes()
        .iter()
        .map(|id| id.as_str().to_string())
        .collect();
    assert_eq!(selected, vec!["n1", "n2"]);
    assert!(events
        .borrow()
        .iter()
        .any(|e| matches!(e, EditorEvent::SelectionChanged { nodes, .. } if nodes.len() == 2)));
}

#[test]
fn test_shift_marquee_extends_selection() {
    let mut editor = GraphEditor::default();
    editor.add_node(Node::new("n1", "t").with_position(0.0, 0.0)).unwrap();
    editor.add_node(Node::new("n3", "t").with_position(600.0, 0.0)).unwrap();
    editor.select_node("n3".into(), false);

    let shift = Modifiers::SHIFT;
    editor.pointer_down(PointerEvent::new(-10.0, -10.0).with_modifiers(shift));
    editor.pointer_move(PointerEvent::new(190.0, 90.0).with_modifiers(shift));
    editor.pointer_up(PointerEvent::new(190.0, 90.0).with_modifiers(shift));

    assert_eq!(editor.selection().nodes().len(), 2);
}

#[test]
fn test_snapshot_survives_editor_round_trip() {
    let mut editor = GraphEditor::default();
    editor.add_node(source("a", 0.0, 0.0)).unwrap();
    editor.add_node(sink("b", 300.0, 50.0)).unwrap();
    editor
        .add_connection(Connection::new("ab", Endpoint::new("a", "out"), Endpoint::new("b", "in")))
        .unwrap();
    assert!(editor
        .add_node(Node::new("bad", "t").with_position(f32::NAN, 0.0))
        .is_err());
    let json = editor.snapshot().to_json().unwrap();

    let mut restored = GraphEditor::default();
    restored
        .load_snapshot(GraphSnapshot::from_json(&json).unwrap())
        .unwrap();

    assert_eq!(restored.graph().node_count(), 2);
    let original = editor.path(&"ab".into()).unwrap();
    let copy = restored.path(&"ab".into()).unwrap();
    assert!(original.start().approx_eq(copy.start()));
    assert!(original.end().approx_eq(copy.end()));
}
