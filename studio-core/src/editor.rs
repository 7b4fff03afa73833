//! Editor facade: the command surface hosts drive.
//!
//! The [`Editor`] owns the scene, the undo history and the transform engine.
//! Every discrete command and every completed gesture ends in
//! [`Editor::commit`], which stores one history snapshot if the scene content
//! changed. Selection changes alone are not recorded.

use crate::align::{self, AlignMode, SnapGuide};
use crate::config::EditorConfig;
use crate::element::{Element, ElementId, ElementKind, GroupMember, Point};
use crate::group;
use crate::history::History;
use crate::scene::{ElementPatch, Scene, ZOrder};
use crate::transform::{self, GestureKind, Handle, TransformEngine, Viewport};
use crate::CoreResult;

/// Interactive editing session over one scene.
#[derive(Debug, Clone)]
pub struct Editor {
    scene: Scene,
    history: History<Scene>,
    config: EditorConfig,
    engine: TransformEngine,
    viewport: Viewport,
    guides: Vec<SnapGuide>,
    editing: Option<ElementId>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Scene::default())
    }
}

impl Editor {
    /// Create an editor over `scene` with default configuration.
    #[must_use]
    pub fn new(scene: Scene) -> Self {
        Self::with_config(scene, EditorConfig::default())
    }

    /// Create an editor with the given configuration.
    #[must_use]
    pub fn with_config(scene: Scene, config: EditorConfig) -> Self {
        let mut history = History::new(config.history_limit);
        history.save_snapshot(&scene);
        Self {
            scene,
            history,
            config,
            engine: TransformEngine::new(),
            viewport: Viewport::default(),
            guides: Vec::new(),
            editing: None,
        }
    }

    /// The live scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Set pan and zoom.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Replace the scene and start a fresh history.
    pub fn load_scene(&mut self, scene: Scene) {
        self.scene = scene;
        self.reset_transient();
        self.history.clear(&self.scene);
    }

    /// Save a snapshot if the scene content differs from the last one.
    ///
    /// Returns true if a snapshot was stored.
    pub fn commit(&mut self) -> bool {
        let unchanged = self
            .history
            .current()
            .is_some_and(|last| last.content_eq(&self.scene));
        if unchanged {
            return false;
        }
        self.history.save_snapshot(&self.scene);
        true
    }

    /// Add an element on top and select it.
    pub fn add_element(&mut self, element: Element) -> ElementId {
        let id = self.scene.add_element(element);
        self.commit();
        id
    }

    /// Apply a property patch as one undoable step.
    ///
    /// Returns false for unknown ids and patches that change nothing.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        let changed = self.scene.update_element(id, patch, self.config.min_size);
        if changed {
            self.commit();
        }
        changed
    }

    /// Apply a patch without recording history, for live property previews.
    ///
    /// Follow with [`Editor::commit_edit`] once the edit is final.
    pub fn preview_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        self.scene.update_element(id, patch, self.config.min_size)
    }

    /// Record previewed edits as one history step.
    pub fn commit_edit(&mut self) -> bool {
        self.commit()
    }

    /// Delete the selected elements. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        let ids = self.scene.selection().to_vec();
        if self.editing.is_some_and(|e| ids.contains(&e)) {
            self.editing = None;
        }
        let removed = self.scene.delete_elements(&ids).len();
        if removed > 0 {
            self.commit();
        }
        removed
    }

    /// Copy the selected elements, offset by the configured distance.
    ///
    /// Selected groups are copied with their members. The copies become the
    /// selection and are returned.
    pub fn duplicate_selected(&mut self) -> Vec<ElementId> {
        let selection = self.scene.selection().to_vec();
        let mut sources: Vec<Element> = self
            .scene
            .selected_elements()
            .filter(|e| e.group_id.map_or(true, |g| !selection.contains(&g)))
            .cloned()
            .collect();
        sources.sort_by(|a, b| a.z.total_cmp(&b.z));

        let offset = self.config.duplicate_offset;
        let mut next_z = self.scene.max_z().map_or(0.0, |z| z + 1.0);
        let mut copies = Vec::with_capacity(sources.len());

        for source in sources {
            let mut copy = shifted_copy(&source, offset);
            copy.group_id = None;

            if let ElementKind::Group { children } = &mut copy.kind {
                let group_id = copy.id;
                let mut members = Vec::with_capacity(children.len());
                for member in children.iter() {
                    let Some(original) = self.scene.get(member.id) else {
                        continue;
                    };
                    let mut child = shifted_copy(original, offset);
                    child.group_id = Some(group_id);
                    child.z = next_z;
                    next_z += 1.0;
                    members.push(GroupMember {
                        id: child.id,
                        relative_x: member.relative_x,
                        relative_y: member.relative_y,
                    });
                    self.scene.insert(child);
                }
                *children = members;
            }

            copy.z = next_z;
            next_z += 1.0;
            copies.push(self.scene.insert(copy));
        }

        if !copies.is_empty() {
            self.scene.set_selection(&copies);
            self.commit();
        }
        copies
    }

    /// Group elements into a new group.
    ///
    /// # Errors
    ///
    /// Returns a validation error if fewer than two ids are eligible.
    pub fn group(&mut self, ids: &[ElementId]) -> CoreResult<ElementId> {
        let id = group::group(&mut self.scene, ids)?;
        self.commit();
        Ok(id)
    }

    /// Group the current selection.
    ///
    /// # Errors
    ///
    /// Returns a validation error if fewer than two selected ids are eligible.
    pub fn group_selected(&mut self) -> CoreResult<ElementId> {
        let ids = self.scene.selection().to_vec();
        self.group(&ids)
    }

    /// Dissolve groups, returning the released members.
    pub fn ungroup(&mut self, group_ids: &[ElementId]) -> Vec<ElementId> {
        let released = group::ungroup(&mut self.scene, group_ids);
        self.commit();
        released
    }

    /// Change an element's paint order.
    pub fn reorder(&mut self, id: ElementId, direction: ZOrder) -> bool {
        let changed = self.scene.reorder(id, direction);
        if changed {
            self.commit();
        }
        changed
    }

    /// Align the selection.
    pub fn align_selection(&mut self, mode: AlignMode) -> bool {
        let moved = align::align_selection(&mut self.scene, mode);
        if moved {
            self.commit();
        }
        moved
    }

    /// Replace the selection. Unknown ids are dropped.
    pub fn set_selection(&mut self, ids: &[ElementId]) {
        self.scene.set_selection(ids);
    }

    /// Step back one snapshot. Any active gesture is dropped uncommitted.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            tracing::debug!("nothing to undo");
            return false;
        };
        self.scene = snapshot.clone();
        self.reset_transient();
        true
    }

    /// Step forward one snapshot. Any active gesture is dropped uncommitted.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            tracing::debug!("nothing to redo");
            return false;
        };
        self.scene = snapshot.clone();
        self.reset_transient();
        true
    }

    /// Whether undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Handle of `id` under a screen-space pointer.
    #[must_use]
    pub fn handle_at(&self, id: ElementId, screen: Point) -> Option<Handle> {
        let element = self.scene.get(id)?;
        transform::handle_at(
            &element.geometry,
            self.viewport.to_canvas(screen),
            self.viewport.safe_zoom(),
            self.config.rotate_handle_offset_px,
            self.config.handle_radius_px,
        )
    }

    /// Begin a gesture on pointer-down.
    ///
    /// Returns true if the event was consumed; hosts should then stop it
    /// from reaching canvas-level handlers such as click-to-deselect.
    pub fn start_gesture(&mut self, target: ElementId, kind: GestureKind, pointer: Point) -> bool {
        if self.engine.is_active() {
            return false;
        }
        self.engine.begin(
            &mut self.scene,
            target,
            kind,
            pointer,
            &self.viewport,
            self.editing,
        )
    }

    /// Feed a pointer move to the active gesture.
    pub fn update_gesture(&mut self, pointer: Point) {
        self.guides = self
            .engine
            .update(&mut self.scene, pointer, &self.viewport, &self.config);
    }

    /// Finish the active gesture on pointer-up.
    ///
    /// Returns true if the gesture changed the scene and a snapshot was stored.
    pub fn end_gesture(&mut self) -> bool {
        if self.engine.end().is_idle() {
            return false;
        }
        self.guides.clear();
        let committed = self.commit();
        tracing::debug!(committed, "gesture ended");
        committed
    }

    /// Whether a gesture is in progress.
    #[must_use]
    pub fn is_gesture_active(&self) -> bool {
        self.engine.is_active()
    }

    /// Snap guides of the current drag move.
    #[must_use]
    pub fn guides(&self) -> &[SnapGuide] {
        &self.guides
    }

    /// Enter text-edit mode on a text element.
    pub fn begin_text_edit(&mut self, id: ElementId) -> bool {
        let editable = self.scene.get(id).is_some_and(|e| e.is_text() && !e.locked);
        if editable {
            self.editing = Some(id);
        }
        editable
    }

    /// Leave text-edit mode.
    pub fn end_text_edit(&mut self) {
        self.editing = None;
    }

    /// Element in text-edit mode, if any.
    #[must_use]
    pub fn editing(&self) -> Option<ElementId> {
        self.editing
    }

    fn reset_transient(&mut self) {
        self.engine.end();
        self.guides.clear();
        if self.editing.is_some_and(|id| !self.scene.contains(id)) {
            self.editing = None;
        }
    }
}

fn shifted_copy(source: &Element, offset: f64) -> Element {
    let mut copy = source.clone();
    copy.id = ElementId::new();
    copy.geometry.x += offset;
    copy.geometry.y += offset;
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Geometry, ShapeKind};

    fn rect(x: f64, y: f64) -> Element {
        Element::shape(ShapeKind::Rectangle).with_geometry(Geometry::new(x, y, 100.0, 100.0))
    }

    fn editor() -> Editor {
        Editor::new(Scene::new(1000.0, 1000.0))
    }

    #[test]
    fn test_add_then_undo_redo() {
        let mut ed = editor();
        let id = ed.add_element(rect(0.0, 0.0));
        assert!(ed.undo());
        assert!(!ed.scene().contains(id));
        assert!(ed.redo());
        assert!(ed.scene().contains(id));
        assert!(!ed.redo());
    }

    #[test]
    fn test_drag_commits_one_snapshot() {
        let mut ed = editor();
        let id = ed.add_element(rect(100.0, 100.0));
        assert!(ed.start_gesture(id, GestureKind::Drag, Point::new(150.0, 150.0)));
        for step in 1..=10 {
            let d = f64::from(step) * 10.0;
            ed.update_gesture(Point::new(150.0 + d, 150.0 + d));
        }
        assert!(ed.end_gesture());
        assert_eq!(ed.scene().get(id).expect("el").geometry.x, 200.0);

        assert!(ed.undo());
        assert_eq!(ed.scene().get(id).expect("el").geometry.x, 100.0);
    }

    #[test]
    fn test_idle_gesture_commits_nothing() {
        let mut ed = editor();
        let id = ed.add_element(rect(100.0, 100.0));
        ed.set_selection(&[]);
        assert!(ed.start_gesture(id, GestureKind::Drag, Point::new(0.0, 0.0)));
        assert!(!ed.end_gesture());
        assert!(ed.undo());
        assert!(!ed.can_undo());
    }

    #[test]
    fn test_locked_and_editing_targets_are_ignored() {
        let mut ed = editor();
        let locked = ed.add_element(rect(0.0, 0.0).with_locked(true));
        assert!(!ed.start_gesture(locked, GestureKind::Drag, Point::new(0.0, 0.0)));

        let text = ed.add_element(Element::text("hi"));
        assert!(ed.begin_text_edit(text));
        assert!(!ed.start_gesture(text, GestureKind::Rotate, Point::new(0.0, 0.0)));
        ed.end_text_edit();
        assert!(ed.start_gesture(text, GestureKind::Rotate, Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_only_text_enters_edit_mode() {
        let mut ed = editor();
        let id = ed.add_element(rect(0.0, 0.0));
        assert!(!ed.begin_text_edit(id));
        assert_eq!(ed.editing(), None);
    }

    #[test]
    fn test_undo_mid_gesture_resets_to_idle() {
        let mut ed = editor();
        let id = ed.add_element(rect(100.0, 100.0));
        ed.start_gesture(id, GestureKind::Drag, Point::new(0.0, 0.0));
        ed.update_gesture(Point::new(50.0, 0.0));
        assert!(ed.undo());
        assert!(!ed.is_gesture_active());
        assert!(!ed.end_gesture());
    }

    #[test]
    fn test_duplicate_group_copies_members() {
        let mut ed = editor();
        let a = ed.add_element(rect(0.0, 0.0));
        let b = ed.add_element(rect(200.0, 200.0));
        let gid = ed.group(&[a, b]).expect("group");

        let copies = ed.duplicate_selected();
        assert_eq!(copies.len(), 1);
        let copy = ed.scene().get(copies[0]).expect("copy");
        assert_ne!(copy.id, gid);
        assert_eq!(copy.geometry.x, 10.0);
        assert_eq!(copy.children().len(), 2);
        for member in copy.children() {
            let child = ed.scene().get(member.id).expect("member");
            assert_eq!(child.group_id, Some(copy.id));
            assert_ne!(child.id, a);
            assert_ne!(child.id, b);
        }
        assert_eq!(ed.scene().len(), 6);
    }

    #[test]
    fn test_delete_selected_prunes_selection() {
        let mut ed = editor();
        ed.add_element(rect(0.0, 0.0));
        assert_eq!(ed.delete_selected(), 1);
        assert!(ed.scene().selection().is_empty());
        assert_eq!(ed.delete_selected(), 0);
    }

    #[test]
    fn test_preview_then_commit_is_one_step() {
        let mut ed = editor();
        let id = ed.add_element(rect(0.0, 0.0));
        for opacity in [0.9, 0.7, 0.5] {
            ed.preview_element(
                id,
                &ElementPatch {
                    opacity: Some(opacity),
                    ..ElementPatch::default()
                },
            );
        }
        assert!(ed.commit_edit());
        assert!(ed.undo());
        assert!((ed.scene().get(id).expect("el").opacity - 1.0).abs() < f64::EPSILON);
    }
}
