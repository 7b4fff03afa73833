//! Scene store: canonical element list, selection and canvas configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::animation::Animation;
use crate::element::{Element, ElementId, ElementKind, Paint, Point};
use crate::transform::normalize_degrees;
use crate::{CoreError, CoreResult};

/// Canvas (artboard) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    /// Canvas width in canvas units (pixels at 100% zoom).
    pub width: f64,
    /// Canvas height in canvas units.
    pub height: f64,
    /// Background paint.
    pub background: Paint,
}

impl Canvas {
    /// Create a canvas with a white background.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background: Paint::solid("#ffffff"),
        }
    }
}

/// Direction for z-order changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZOrder {
    /// Above every other element.
    Front,
    /// Below every other element.
    Back,
    /// One step up in paint order.
    Forward,
    /// One step down in paint order.
    Backward,
}

/// Sparse update for an element. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    /// New x position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// New y position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// New width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// New height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// New rotation in degrees (normalized on apply).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// New visibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// New lock state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    /// New opacity (clamped to `0.0..=1.0`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// New fill paint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Paint>,
    /// New stroke color; `Some(None)` removes the stroke.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Option<String>>,
    /// New stroke width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    /// New text content (text elements only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// New font size (text elements only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// New text color (text elements only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// New image source (image elements only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// New animation; `Some(None)` removes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<Option<Animation>>,
}

impl ElementPatch {
    /// Patch that moves an element.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that resizes an element.
    #[must_use]
    pub fn size(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Apply this patch to an element. Returns true if anything changed.
    pub fn apply(&self, element: &mut Element, min_size: f64) -> bool {
        let before = element.clone();
        let g = &mut element.geometry;
        if let Some(x) = self.x {
            g.x = x;
        }
        if let Some(y) = self.y {
            g.y = y;
        }
        if let Some(w) = self.width {
            g.width = w.max(min_size);
        }
        if let Some(h) = self.height {
            g.height = h.max(min_size);
        }
        if let Some(r) = self.rotation {
            g.rotation = normalize_degrees(r);
        }
        if let Some(v) = self.visible {
            element.visible = v;
        }
        if let Some(l) = self.locked {
            element.locked = l;
        }
        if let Some(o) = self.opacity {
            element.opacity = o.clamp(0.0, 1.0);
        }
        if let Some(ref fill) = self.fill {
            element.style.fill = fill.clone();
        }
        if let Some(ref stroke) = self.stroke {
            element.style.stroke.clone_from(stroke);
        }
        if let Some(sw) = self.stroke_width {
            element.style.stroke_width = sw.max(0.0);
        }
        if let Some(anim) = self.animation {
            element.animation = anim;
        }
        match &mut element.kind {
            ElementKind::Text {
                content,
                font_size,
                color,
                ..
            } => {
                if let Some(ref text) = self.text {
                    content.clone_from(text);
                }
                if let Some(size) = self.font_size {
                    *font_size = size.max(min_size);
                }
                if let Some(ref c) = self.color {
                    color.clone_from(c);
                }
            }
            ElementKind::Image { src } => {
                if let Some(ref s) = self.src {
                    src.clone_from(s);
                }
            }
            ElementKind::Shape { .. } | ElementKind::Group { .. } => {}
        }
        *element != before
    }
}

/// A scene containing all canvas elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// All elements in the scene, indexed by ID.
    elements: HashMap<ElementId, Element>,
    /// Element IDs in insertion order; breaks z ties.
    order: Vec<ElementId>,
    /// Currently selected element IDs.
    selection: Vec<ElementId>,
    /// Canvas size and background.
    pub canvas: Canvas,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(1080.0, 1080.0)
    }
}

impl Scene {
    /// Create a new empty scene with the given canvas size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            elements: HashMap::new(),
            order: Vec::new(),
            selection: Vec::new(),
            canvas: Canvas::new(width, height),
        }
    }

    /// Add an element on top of the scene and select it.
    ///
    /// The element keeps its id unless that id is already taken. Group
    /// membership cannot be created this way: `group_id` is cleared and a
    /// group's member list is emptied (use [`crate::group::group`]).
    pub fn add_element(&mut self, mut element: Element) -> ElementId {
        element.z = self.max_z().map_or(0.0, |z| z + 1.0);
        element.group_id = None;
        if let ElementKind::Group { children } = &mut element.kind {
            children.clear();
        }
        let id = self.insert(element);
        self.selection = vec![id];
        id
    }

    /// Insert an element as-is (z and membership untouched), assigning a
    /// fresh id on collision. Does not change the selection.
    pub(crate) fn insert(&mut self, mut element: Element) -> ElementId {
        if self.elements.contains_key(&element.id) {
            element.id = ElementId::new();
        }
        let id = element.id;
        self.order.push(id);
        self.elements.insert(id, element);
        id
    }

    /// Remove a single element without touching group links.
    pub(crate) fn remove_raw(&mut self, id: ElementId) -> Option<Element> {
        let removed = self.elements.remove(&id)?;
        self.order.retain(|eid| *eid != id);
        self.selection.retain(|eid| *eid != id);
        Some(removed)
    }

    /// Apply a sparse update. Returns false if the id is absent or nothing changed.
    ///
    /// Group geometry changes carry the members along; moving a member on
    /// its own refits its group.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch, min_size: f64) -> bool {
        let Some(before) = self.get(id).map(|e| e.geometry) else {
            tracing::debug!("update ignored for missing element {id}");
            return false;
        };
        let members = crate::group::member_geometries(self, id);
        let changed = self
            .elements
            .get_mut(&id)
            .is_some_and(|element| patch.apply(element, min_size));
        if !changed {
            return false;
        }
        let moved = self.get(id).is_some_and(|e| e.geometry != before);
        if members.is_empty() {
            if moved {
                crate::group::refresh_owner(self, id);
            }
        } else {
            crate::group::follow_frame(self, id, &before, &members, min_size);
        }
        true
    }

    /// Delete elements and prune the selection.
    ///
    /// Deleting a group releases its children rather than deleting them.
    /// Returns the removed elements; unknown ids are ignored.
    pub fn delete_elements(&mut self, ids: &[ElementId]) -> Vec<Element> {
        crate::group::unlink_deleted(self, ids);
        ids.iter().filter_map(|id| self.remove_raw(*id)).collect()
    }

    /// Get an element by ID.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Get a mutable reference to an element by ID.
    pub(crate) fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    /// Whether the scene contains the id.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Iterate over elements in insertion order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Elements in paint order: ascending z, ties by insertion order.
    #[must_use]
    pub fn paint_order(&self) -> Vec<&Element> {
        let mut elements: Vec<&Element> = self.elements().collect();
        // sort_by is stable, so equal z keeps insertion order.
        elements.sort_by(|a, b| a.z.total_cmp(&b.z));
        elements
    }

    /// Replace the selection. Unknown ids and duplicates are dropped.
    pub fn set_selection(&mut self, ids: &[ElementId]) {
        let mut selection = Vec::with_capacity(ids.len());
        for id in ids {
            if self.elements.contains_key(id) && !selection.contains(id) {
                selection.push(*id);
            }
        }
        self.selection = selection;
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Currently selected ids, in selection order.
    #[must_use]
    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    /// Whether the id is selected.
    #[must_use]
    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selection.contains(&id)
    }

    /// Currently selected elements.
    pub fn selected_elements(&self) -> impl Iterator<Item = &Element> {
        self.selection.iter().filter_map(|id| self.elements.get(id))
    }

    /// Find the topmost visible element containing the given canvas point.
    #[must_use]
    pub fn element_at(&self, point: Point) -> Option<ElementId> {
        self.paint_order()
            .into_iter()
            .rev()
            .find(|e| e.visible && !e.is_group() && e.geometry.contains_point(point))
            .map(|e| e.group_id.unwrap_or(e.id))
    }

    /// Highest z in the scene.
    #[must_use]
    pub fn max_z(&self) -> Option<f64> {
        self.elements.values().map(|e| e.z).reduce(f64::max)
    }

    /// Lowest z in the scene.
    #[must_use]
    pub fn min_z(&self) -> Option<f64> {
        self.elements.values().map(|e| e.z).reduce(f64::min)
    }

    /// Change paint order. Returns true if any z value changed.
    ///
    /// A group moves as a block with its members: they keep their relative
    /// order and the group stays at the highest member z. Reordering a
    /// single member re-syncs its group's z.
    pub fn reorder(&mut self, id: ElementId, direction: ZOrder) -> bool {
        match direction {
            ZOrder::Front => self.bring_to_front(id),
            ZOrder::Back => self.send_to_back(id),
            ZOrder::Forward => self.bring_forward(id),
            ZOrder::Backward => self.send_backward(id),
        }
    }

    /// Put the element (or group block) above every other element.
    pub fn bring_to_front(&mut self, id: ElementId) -> bool {
        self.to_end(id, true)
    }

    /// Put the element (or group block) below every other element.
    pub fn send_to_back(&mut self, id: ElementId) -> bool {
        self.to_end(id, false)
    }

    /// Move one step up by inserting between the next two elements.
    pub fn bring_forward(&mut self, id: ElementId) -> bool {
        self.step(id, true)
    }

    /// Move one step down by inserting between the previous two elements.
    pub fn send_backward(&mut self, id: ElementId) -> bool {
        self.step(id, false)
    }

    /// Ids that move together when `id` is reordered, in paint order.
    ///
    /// A group with members yields its members; anything else yields itself.
    fn block(&self, id: ElementId) -> Vec<ElementId> {
        let Some(element) = self.get(id) else {
            return Vec::new();
        };
        let members: Vec<ElementId> = element
            .children()
            .iter()
            .map(|m| m.id)
            .filter(|mid| self.contains(*mid))
            .collect();
        if members.is_empty() {
            return vec![id];
        }
        self.paint_order()
            .iter()
            .map(|e| e.id)
            .filter(|eid| members.contains(eid))
            .collect()
    }

    /// Paint order as `(id, z)`, minus `id` and its block.
    fn rest(&self, id: ElementId, block: &[ElementId]) -> Vec<(ElementId, f64)> {
        self.paint_order()
            .iter()
            .filter(|e| e.id != id && !block.contains(&e.id))
            .map(|e| (e.id, e.z))
            .collect()
    }

    fn to_end(&mut self, id: ElementId, front: bool) -> bool {
        let block = self.block(id);
        let rest = self.rest(id, &block);
        let zs: Vec<f64> = block.iter().filter_map(|b| self.get(*b)).map(|e| e.z).collect();
        let (Some(lowest), Some(highest)) = (
            zs.iter().copied().reduce(f64::min),
            zs.iter().copied().reduce(f64::max),
        ) else {
            return false;
        };
        #[allow(clippy::cast_precision_loss)]
        let n = block.len() as f64;
        let base = if front {
            match rest.iter().map(|(_, z)| *z).reduce(f64::max) {
                Some(top) if lowest <= top => top + 1.0,
                _ => return false,
            }
        } else {
            match rest.iter().map(|(_, z)| *z).reduce(f64::min) {
                Some(bottom) if highest >= bottom => bottom - n,
                _ => return false,
            }
        };
        for (index, member) in block.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let z = base + index as f64;
            self.set_z(*member, z);
        }
        self.sync_group_z(id);
        true
    }

    fn step(&mut self, id: ElementId, forward: bool) -> bool {
        if !self.contains(id) {
            return false;
        }
        for attempt in 0..2 {
            let mut block = self.block(id);
            let mut order: Vec<(ElementId, f64)> =
                self.paint_order().iter().map(|e| (e.id, e.z)).collect();
            if !forward {
                order.reverse();
                block.reverse();
            }
            let Some(last) = order.iter().rposition(|(eid, _)| block.contains(eid)) else {
                return false;
            };
            let mut ahead = order[last + 1..]
                .iter()
                .filter(|(eid, _)| *eid != id && !block.contains(eid))
                .filter(|(eid, _)| self.get(*eid).is_some_and(|e| !e.is_group()))
                .map(|(_, z)| *z);
            let Some(neighbor) = ahead.next() else {
                return false;
            };
            let sign = if forward { 1.0 } else { -1.0 };
            let beyond = ahead.next().unwrap_or(neighbor + sign);
            #[allow(clippy::cast_precision_loss)]
            let slots = (block.len() + 1) as f64;
            #[allow(clippy::cast_precision_loss)]
            let targets: Vec<f64> = (1..=block.len())
                .map(|i| neighbor + (beyond - neighbor) * i as f64 / slots)
                .collect();
            // Every target must land strictly between the neighbor and the
            // element past it; equal z values or exhausted precision need a
            // renumber first.
            let strictly_between = std::iter::once(neighbor)
                .chain(targets.iter().copied())
                .chain(std::iter::once(beyond))
                .collect::<Vec<f64>>()
                .windows(2)
                .all(|w| (w[1] - w[0]) * sign > 0.0);
            if strictly_between {
                for (member, z) in block.iter().zip(targets) {
                    self.set_z(*member, z);
                }
                self.sync_group_z(id);
                return true;
            }
            if attempt == 0 {
                self.renumber_z();
            }
        }
        false
    }

    /// Keep a group at its highest member z after `id` (the group or one of
    /// its members) was reordered.
    fn sync_group_z(&mut self, id: ElementId) {
        let Some(group_id) = self
            .get(id)
            .and_then(|e| if e.is_group() { Some(e.id) } else { e.group_id })
        else {
            return;
        };
        let top = self.get(group_id).and_then(|g| {
            g.children()
                .iter()
                .filter_map(|m| self.get(m.id))
                .map(|c| c.z)
                .reduce(f64::max)
        });
        if let Some(top) = top {
            self.set_z(group_id, top);
        }
    }

    /// Reassign integral z values in current paint order.
    fn renumber_z(&mut self) {
        let ids: Vec<ElementId> = self.paint_order().iter().map(|e| e.id).collect();
        for (index, id) in ids.into_iter().enumerate() {
            if let Some(element) = self.elements.get_mut(&id) {
                #[allow(clippy::cast_precision_loss)]
                let z = index as f64;
                element.z = z;
            }
        }
    }

    fn set_z(&mut self, id: ElementId, z: f64) -> bool {
        match self.elements.get_mut(&id) {
            Some(element) => {
                element.z = z;
                true
            }
            None => false,
        }
    }

    /// Whether two scenes hold the same elements and canvas, ignoring selection.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        self.order == other.order && self.elements == other.elements && self.canvas == other.canvas
    }

    /// Replace canvas size and background.
    pub fn set_canvas(&mut self, canvas: Canvas) {
        self.canvas = canvas;
    }

    /// Get the number of elements in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Serialize the scene to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(CoreError::Serialization)
    }

    /// Deserialize a scene from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(CoreError::Serialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Geometry, ShapeKind};

    fn rect_at(x: f64, y: f64) -> Element {
        Element::shape(ShapeKind::Rectangle).with_geometry(Geometry::new(x, y, 100.0, 100.0))
    }

    fn z_of(scene: &Scene, id: ElementId) -> f64 {
        scene.get(id).expect("element").z
    }

    #[test]
    fn test_scene_add_remove() {
        let mut scene = Scene::new(800.0, 600.0);
        assert!(scene.is_empty());

        let id = scene.add_element(Element::text("Hello"));

        assert_eq!(scene.len(), 1);
        assert!(scene.get(id).is_some());
        assert_eq!(scene.selection(), &[id]);

        let removed = scene.delete_elements(&[id]);
        assert_eq!(removed.len(), 1);
        assert!(scene.is_empty());
        assert!(scene.selection().is_empty());
    }

    #[test]
    fn test_add_stacks_on_top() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add_element(rect_at(0.0, 0.0));
        let b = scene.add_element(rect_at(10.0, 10.0));
        assert!(z_of(&scene, b) > z_of(&scene, a));
    }

    #[test]
    fn test_duplicate_id_gets_fresh_id() {
        let mut scene = Scene::new(800.0, 600.0);
        let element = rect_at(0.0, 0.0);
        let a = scene.add_element(element.clone());
        let b = scene.add_element(element);
        assert_ne!(a, b);
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn test_update_missing_is_noop() {
        let mut scene = Scene::new(800.0, 600.0);
        assert!(!scene.update_element(ElementId::new(), &ElementPatch::position(1.0, 1.0), 1.0));
    }

    #[test]
    fn test_update_normalizes_rotation_and_floors_size() {
        let mut scene = Scene::new(800.0, 600.0);
        let id = scene.add_element(rect_at(0.0, 0.0));
        let patch = ElementPatch {
            rotation: Some(-90.0),
            width: Some(-5.0),
            ..ElementPatch::default()
        };
        assert!(scene.update_element(id, &patch, 1.0));
        let g = scene.get(id).expect("element").geometry;
        assert!((g.rotation - 270.0).abs() < 1e-9);
        assert!((g.width - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_selection_filters_unknown() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add_element(rect_at(0.0, 0.0));
        scene.set_selection(&[a, ElementId::new(), a]);
        assert_eq!(scene.selection(), &[a]);
    }

    #[test]
    fn test_paint_order_ties_use_insertion_order() {
        let mut scene = Scene::new(800.0, 600.0);
        let mut first = rect_at(0.0, 0.0);
        first.z = 5.0;
        let mut second = rect_at(0.0, 0.0);
        second.z = 5.0;
        let a = scene.insert(first);
        let b = scene.insert(second);
        let order: Vec<ElementId> = scene.paint_order().iter().map(|e| e.id).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn test_front_and_back() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add_element(rect_at(0.0, 0.0));
        let b = scene.add_element(rect_at(0.0, 0.0));
        let c = scene.add_element(rect_at(0.0, 0.0));

        assert!(scene.bring_to_front(a));
        assert!(z_of(&scene, a) > z_of(&scene, b));
        assert!(z_of(&scene, a) > z_of(&scene, c));
        assert!(!scene.bring_to_front(a));

        assert!(scene.send_to_back(a));
        assert!(z_of(&scene, a) < z_of(&scene, b));
    }

    #[test]
    fn test_forward_uses_midpoint() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add_element(rect_at(0.0, 0.0));
        let b = scene.add_element(rect_at(0.0, 0.0));
        let c = scene.add_element(rect_at(0.0, 0.0));

        assert!(scene.bring_forward(a));
        assert!((z_of(&scene, a) - 1.5).abs() < 1e-9);
        assert!((z_of(&scene, b) - 1.0).abs() < 1e-9);
        assert!((z_of(&scene, c) - 2.0).abs() < 1e-9);

        // Already on top: forward from the top is a no-op.
        assert!(!scene.bring_forward(c));
    }

    #[test]
    fn test_backward_past_bottom() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add_element(rect_at(0.0, 0.0));
        let b = scene.add_element(rect_at(0.0, 0.0));
        assert!(scene.send_backward(b));
        assert!(z_of(&scene, b) < z_of(&scene, a));
        assert!(!scene.send_backward(b));
    }

    #[test]
    fn test_forward_with_tied_neighbors_renumbers() {
        let mut scene = Scene::new(800.0, 600.0);
        let mut ea = rect_at(0.0, 0.0);
        ea.z = 1.0;
        let mut eb = rect_at(0.0, 0.0);
        eb.z = 1.0;
        let mut ec = rect_at(0.0, 0.0);
        ec.z = 1.0;
        let a = scene.insert(ea);
        let b = scene.insert(eb);
        let c = scene.insert(ec);

        assert!(scene.bring_forward(a));
        let order: Vec<ElementId> = scene.paint_order().iter().map(|e| e.id).collect();
        assert_eq!(order, vec![b, a, c]);
    }

    fn paint_ids(scene: &Scene) -> Vec<ElementId> {
        scene.paint_order().iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_group_to_front_carries_members() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add_element(rect_at(0.0, 0.0));
        let b = scene.add_element(rect_at(200.0, 0.0));
        let gid = crate::group::group(&mut scene, &[a, b]).expect("group");
        let c = scene.add_element(rect_at(100.0, 0.0));

        assert!(scene.reorder(gid, ZOrder::Front));
        let order = paint_ids(&scene);
        let pos = |id| order.iter().position(|e| *e == id).expect("painted");
        assert!(pos(a) > pos(c));
        assert!(pos(b) > pos(a));
        assert!((z_of(&scene, gid) - z_of(&scene, b)).abs() < f64::EPSILON);
        assert!(!scene.reorder(gid, ZOrder::Front));

        assert!(scene.reorder(gid, ZOrder::Back));
        let order = paint_ids(&scene);
        let pos = |id| order.iter().position(|e| *e == id).expect("painted");
        assert!(pos(b) < pos(c));
        assert!(pos(a) < pos(b));
        assert!(z_of(&scene, gid) < z_of(&scene, c));
    }

    #[test]
    fn test_group_steps_past_one_neighbor() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add_element(rect_at(0.0, 0.0));
        let b = scene.add_element(rect_at(200.0, 0.0));
        let gid = crate::group::group(&mut scene, &[a, b]).expect("group");
        let c = scene.add_element(rect_at(100.0, 0.0));
        let d = scene.add_element(rect_at(300.0, 0.0));

        assert!(scene.reorder(gid, ZOrder::Forward));
        let z = |id| z_of(&scene, id);
        assert!(z(c) < z(a) && z(a) < z(b) && z(b) < z(d));
        assert!((z(gid) - z(b)).abs() < f64::EPSILON);

        assert!(scene.reorder(gid, ZOrder::Backward));
        let z = |id| z_of(&scene, id);
        assert!(z(a) < z(b) && z(b) < z(c));
    }

    #[test]
    fn test_update_group_moves_members() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add_element(rect_at(0.0, 0.0));
        let b = scene.add_element(rect_at(200.0, 200.0));
        let gid = crate::group::group(&mut scene, &[a, b]).expect("group");

        assert!(scene.update_element(gid, &ElementPatch::position(100.0, 100.0), 1.0));
        assert_eq!(scene.get(a).expect("a").geometry, Geometry::new(100.0, 100.0, 100.0, 100.0));
        assert_eq!(scene.get(b).expect("b").geometry, Geometry::new(300.0, 300.0, 100.0, 100.0));
        let children = scene.get(gid).expect("group").children();
        assert_eq!((children[1].relative_x, children[1].relative_y), (200.0, 200.0));
    }

    #[test]
    fn test_update_member_refits_group() {
        let mut scene = Scene::new(800.0, 600.0);
        let a = scene.add_element(rect_at(0.0, 0.0));
        let b = scene.add_element(rect_at(200.0, 200.0));
        let gid = crate::group::group(&mut scene, &[a, b]).expect("group");

        assert!(scene.update_element(a, &ElementPatch::position(50.0, 100.0), 1.0));
        let g = scene.get(gid).expect("group");
        assert_eq!(g.geometry, Geometry::new(50.0, 100.0, 250.0, 200.0));
        assert_eq!((g.children()[1].relative_x, g.children()[1].relative_y), (150.0, 100.0));
    }

    #[test]
    fn test_element_at_prefers_topmost() {
        let mut scene = Scene::new(800.0, 600.0);
        let _below = scene.add_element(rect_at(0.0, 0.0));
        let above = scene.add_element(rect_at(50.0, 50.0));
        assert_eq!(scene.element_at(Point::new(75.0, 75.0)), Some(above));
        assert_eq!(scene.element_at(Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut scene = Scene::new(640.0, 480.0);
        scene.add_element(rect_at(5.0, 5.0));
        scene.add_element(Element::text("caption"));
        let json = scene.to_json().expect("to json");
        let back = Scene::from_json(&json).expect("from json");
        assert_eq!(back, scene);
    }
}
