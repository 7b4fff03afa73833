//! Property tests for editor invariants.

use proptest::prelude::*;
use studio_core::transform::{normalize_degrees, resize_geometry};
use studio_core::{
    Editor, Element, ElementId, ElementPatch, Geometry, GestureKind, Point, ResizeHandle, Scene,
    ShapeKind, ZOrder,
};

const CANVAS: f64 = 1000.0;

fn arb_geometry() -> impl Strategy<Value = Geometry> {
    (0.0..900.0f64, 0.0..900.0f64, 1.0..100.0f64, 1.0..100.0f64, 0.0..360.0f64)
        .prop_map(|(x, y, w, h, r)| Geometry::new(x, y, w, h).with_rotation(r))
}

fn arb_handle() -> impl Strategy<Value = ResizeHandle> {
    prop::sample::select(ResizeHandle::ALL.to_vec())
}

fn arb_point() -> impl Strategy<Value = Point> {
    (-3000.0..3000.0f64, -3000.0..3000.0f64).prop_map(|(x, y)| Point::new(x, y))
}

#[derive(Debug, Clone)]
enum Command {
    Add(Geometry),
    Move(usize, f64, f64),
    Front(usize),
    Backward(usize),
    Delete(usize),
    Duplicate(usize),
}

fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        arb_geometry().prop_map(Command::Add),
        (0..8usize, 0.0..900.0f64, 0.0..900.0f64).prop_map(|(i, x, y)| Command::Move(i, x, y)),
        (0..8usize).prop_map(Command::Front),
        (0..8usize).prop_map(Command::Backward),
        (0..8usize).prop_map(Command::Delete),
        (0..8usize).prop_map(Command::Duplicate),
    ]
}

fn pick(editor: &Editor, index: usize) -> Option<ElementId> {
    let ids: Vec<ElementId> = editor.scene().elements().map(|e| e.id).collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

fn run(editor: &mut Editor, command: &Command) {
    match *command {
        Command::Add(g) => {
            editor.add_element(Element::shape(ShapeKind::Rectangle).with_geometry(g));
        }
        Command::Move(i, x, y) => {
            if let Some(id) = pick(editor, i) {
                editor.update_element(id, &ElementPatch::position(x, y));
            }
        }
        Command::Front(i) => {
            if let Some(id) = pick(editor, i) {
                editor.reorder(id, ZOrder::Front);
            }
        }
        Command::Backward(i) => {
            if let Some(id) = pick(editor, i) {
                editor.reorder(id, ZOrder::Backward);
            }
        }
        Command::Delete(i) => {
            if let Some(id) = pick(editor, i) {
                editor.set_selection(&[id]);
                editor.delete_selected();
            }
        }
        Command::Duplicate(i) => {
            if let Some(id) = pick(editor, i) {
                editor.set_selection(&[id]);
                editor.duplicate_selected();
            }
        }
    }
}

proptest! {
    #[test]
    fn prop_undo_redo_are_inverse(commands in prop::collection::vec(arb_command(), 1..20)) {
        let mut editor = Editor::new(Scene::new(CANVAS, CANVAS));
        for command in &commands {
            run(&mut editor, command);
        }

        if editor.can_undo() {
            let before = editor.scene().clone();
            prop_assert!(editor.undo());
            prop_assert!(editor.redo());
            prop_assert!(editor.scene().content_eq(&before));
        }

        if editor.can_undo() {
            prop_assert!(editor.undo());
            let before = editor.scene().clone();
            prop_assert!(editor.redo());
            prop_assert!(editor.undo());
            prop_assert!(editor.scene().content_eq(&before));
        }
    }

    #[test]
    fn prop_ungroup_restores_positions(geometries in prop::collection::vec(arb_geometry(), 2..6)) {
        let mut editor = Editor::new(Scene::new(CANVAS, CANVAS));
        let ids: Vec<ElementId> = geometries
            .iter()
            .map(|g| editor.add_element(Element::shape(ShapeKind::Ellipse).with_geometry(*g)))
            .collect();

        let gid = editor.group(&ids).expect("group");
        editor.ungroup(&[gid]);

        for (id, g) in ids.iter().zip(&geometries) {
            let element = editor.scene().get(*id).expect("member");
            prop_assert_eq!(element.geometry, *g);
            prop_assert!(element.group_id.is_none());
        }
    }

    #[test]
    fn prop_resize_respects_floor(
        start in arb_geometry(),
        handle in arb_handle(),
        delta in arb_point(),
        min_size in 0.5..20.0f64,
    ) {
        let g = resize_geometry(&start, handle, delta, min_size);
        prop_assert!(g.width >= min_size);
        prop_assert!(g.height >= min_size);
    }

    #[test]
    fn prop_drag_stays_on_canvas(start in arb_geometry(), to in arb_point()) {
        let mut editor = Editor::new(Scene::new(CANVAS, CANVAS));
        let id = editor.add_element(
            Element::shape(ShapeKind::Rectangle).with_geometry(start.with_rotation(0.0)),
        );
        prop_assert!(editor.start_gesture(id, GestureKind::Drag, Point::new(0.0, 0.0)));
        editor.update_gesture(to);
        editor.end_gesture();

        let g = editor.scene().get(id).expect("element").geometry;
        prop_assert!(g.x >= 0.0 && g.x <= CANVAS - g.width);
        prop_assert!(g.y >= 0.0 && g.y <= CANVAS - g.height);
    }

    #[test]
    fn prop_rotation_is_normalized(start in arb_geometry(), from in arb_point(), to in arb_point()) {
        let mut editor = Editor::new(Scene::new(CANVAS, CANVAS));
        let id = editor.add_element(Element::shape(ShapeKind::Triangle).with_geometry(start));
        prop_assert!(editor.start_gesture(id, GestureKind::Rotate, from));
        editor.update_gesture(to);
        editor.end_gesture();

        let rotation = editor.scene().get(id).expect("element").geometry.rotation;
        prop_assert!((0.0..360.0).contains(&rotation));
    }

    #[test]
    fn prop_normalize_degrees_range(degrees in -1.0e9..1.0e9f64) {
        prop_assert!((0.0..360.0).contains(&normalize_degrees(degrees)));
    }

    #[test]
    fn prop_front_is_strictly_topmost(
        geometries in prop::collection::vec(arb_geometry(), 1..8),
        target in 0..8usize,
        shuffles in prop::collection::vec((0..8usize, any::<bool>()), 0..10),
    ) {
        let mut editor = Editor::new(Scene::new(CANVAS, CANVAS));
        let ids: Vec<ElementId> = geometries
            .iter()
            .map(|g| editor.add_element(Element::shape(ShapeKind::Rectangle).with_geometry(*g)))
            .collect();
        for (index, forward) in shuffles {
            let direction = if forward { ZOrder::Forward } else { ZOrder::Backward };
            editor.reorder(ids[index % ids.len()], direction);
        }

        let id = ids[target % ids.len()];
        editor.reorder(id, ZOrder::Front);
        let top = editor.scene().get(id).expect("element").z;
        for other in editor.scene().elements().filter(|e| e.id != id) {
            prop_assert!(top > other.z);
        }
    }
}
