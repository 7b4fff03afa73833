//! Transform engine: handle layout, transform math and the gesture state machine.
//!
//! Pointer positions handed to the engine are in screen space. Drag and
//! resize deltas are divided by the viewport zoom; rotation compares the
//! pointer (converted to canvas space) against the element center.
//!
//! ```text
//!            pointer-down                 pointer-up
//!   Idle ───────────────▶ Dragging  ─────────────────▶ Idle (+1 snapshot)
//!        ───────────────▶ Resizing
//!        ───────────────▶ Rotating
//! ```

use serde::{Deserialize, Serialize};

use crate::align::{self, Bounds, SnapGuide};
use crate::config::EditorConfig;
use crate::element::{ElementId, Geometry, Point};
use crate::scene::Scene;

/// Normalize an angle in degrees into `[0, 360)`.
///
/// Non-finite input maps to zero.
#[must_use]
pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let r = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Rotate `point` clockwise (y grows downward) by `degrees` around `center`.
#[must_use]
pub fn rotate_point(point: Point, center: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Clamp an origin so a `width`×`height` box stays on the canvas.
///
/// Boxes larger than the canvas pin to the origin.
#[must_use]
pub fn clamp_to_canvas(x: f64, y: f64, width: f64, height: f64, canvas_w: f64, canvas_h: f64) -> (f64, f64) {
    (
        x.min(canvas_w - width).max(0.0),
        y.min(canvas_h - height).max(0.0),
    )
}

/// Pan/zoom of the view onto the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Zoom factor (1.0 = 100%).
    pub zoom: f64,
    /// Screen x of the canvas origin.
    pub pan_x: f64,
    /// Screen y of the canvas origin.
    pub pan_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Viewport {
    /// Convert a screen point to canvas coordinates.
    #[must_use]
    pub fn to_canvas(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan_x) / self.zoom,
            (screen.y - self.pan_y) / self.zoom,
        )
    }

    /// Zoom factor, guarded against zero and non-finite values.
    #[must_use]
    pub fn safe_zoom(&self) -> f64 {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom
        } else {
            1.0
        }
    }
}

/// One of the eight resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    /// Top edge.
    N,
    /// Bottom edge.
    S,
    /// Right edge.
    E,
    /// Left edge.
    W,
    /// Top-right corner.
    Ne,
    /// Top-left corner.
    Nw,
    /// Bottom-right corner.
    Se,
    /// Bottom-left corner.
    Sw,
}

impl ResizeHandle {
    /// All handles in drawing order.
    pub const ALL: [Self; 8] = [
        Self::Nw,
        Self::N,
        Self::Ne,
        Self::E,
        Self::Se,
        Self::S,
        Self::Sw,
        Self::W,
    ];

    /// Unit direction of the handle from the box center: each axis is -1, 0 or 1.
    #[must_use]
    pub fn direction(self) -> (f64, f64) {
        match self {
            Self::N => (0.0, -1.0),
            Self::S => (0.0, 1.0),
            Self::E => (1.0, 0.0),
            Self::W => (-1.0, 0.0),
            Self::Ne => (1.0, -1.0),
            Self::Nw => (-1.0, -1.0),
            Self::Se => (1.0, 1.0),
            Self::Sw => (-1.0, 1.0),
        }
    }
}

/// A handle on the selection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "handle", rename_all = "lowercase")]
pub enum Handle {
    /// A resize handle.
    Resize(ResizeHandle),
    /// The rotate handle above the top edge.
    Rotate,
}

/// Positions of all handles in canvas coordinates, rotated with the element.
///
/// The rotate handle sits `rotate_offset_px` screen pixels above the
/// unrotated top edge.
#[must_use]
pub fn handle_positions(geometry: &Geometry, zoom: f64, rotate_offset_px: f64) -> Vec<(Handle, Point)> {
    let center = geometry.center();
    let hw = geometry.width / 2.0;
    let hh = geometry.height / 2.0;
    let place = |lx: f64, ly: f64| {
        rotate_point(
            Point::new(center.x + lx, center.y + ly),
            center,
            geometry.rotation,
        )
    };

    let mut handles: Vec<(Handle, Point)> = ResizeHandle::ALL
        .iter()
        .map(|h| {
            let (dx, dy) = h.direction();
            (Handle::Resize(*h), place(dx * hw, dy * hh))
        })
        .collect();
    handles.push((Handle::Rotate, place(0.0, -hh - rotate_offset_px / zoom)));
    handles
}

/// Find the handle under a canvas-space pointer, if any.
///
/// The rotate handle wins over resize handles when both are in range.
#[must_use]
pub fn handle_at(
    geometry: &Geometry,
    pointer: Point,
    zoom: f64,
    rotate_offset_px: f64,
    radius_px: f64,
) -> Option<Handle> {
    let radius = radius_px / zoom;
    let mut best: Option<(Handle, f64)> = None;
    for (handle, pos) in handle_positions(geometry, zoom, rotate_offset_px) {
        let dist = (pos.x - pointer.x).hypot(pos.y - pointer.y);
        if dist > radius {
            continue;
        }
        if handle == Handle::Rotate {
            return Some(handle);
        }
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((handle, dist));
        }
    }
    best.map(|(h, _)| h)
}

/// Compute a resized geometry.
///
/// `delta` is the pointer movement in canvas units. It is projected into the
/// element's unrotated frame, so dragging the east handle of a rotated
/// element stretches it along its own axis. The edge or corner opposite the
/// handle stays fixed in canvas space. Width and height never drop below
/// `min_size`.
#[must_use]
pub fn resize_geometry(start: &Geometry, handle: ResizeHandle, delta: Point, min_size: f64) -> Geometry {
    let origin = Point::new(0.0, 0.0);
    let local = rotate_point(delta, origin, -start.rotation);
    let (dir_x, dir_y) = handle.direction();

    let width = (start.width + dir_x * local.x).max(min_size);
    let height = (start.height + dir_y * local.y).max(min_size);

    // Anchor: the point opposite the handle, expressed relative to the center.
    let center = start.center();
    let anchor_local = Point::new(-dir_x * start.width / 2.0, -dir_y * start.height / 2.0);
    let anchor = rotate_point(
        Point::new(center.x + anchor_local.x, center.y + anchor_local.y),
        center,
        start.rotation,
    );

    let new_anchor_local = Point::new(-dir_x * width / 2.0, -dir_y * height / 2.0);
    let offset = rotate_point(new_anchor_local, origin, start.rotation);
    let new_center = Point::new(anchor.x - offset.x, anchor.y - offset.y);

    Geometry {
        x: new_center.x - width / 2.0,
        y: new_center.y - height / 2.0,
        width,
        height,
        rotation: start.rotation,
    }
}

/// Angle in radians from `center` to `pointer`.
#[must_use]
pub fn pointer_angle(center: Point, pointer: Point) -> f64 {
    (pointer.y - center.y).atan2(pointer.x - center.x)
}

/// Rotation after moving the pointer from an angle of `start_angle` to `pointer`.
#[must_use]
pub fn rotation_from_pointer(center: Point, start_angle: f64, start_rotation: f64, pointer: Point) -> f64 {
    let current = pointer_angle(center, pointer);
    normalize_degrees(start_rotation + (current - start_angle).to_degrees())
}

/// What a gesture does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "handle", rename_all = "lowercase")]
pub enum GestureKind {
    /// Move the selection.
    Drag,
    /// Resize the target via a handle.
    Resize(ResizeHandle),
    /// Rotate the target about its center.
    Rotate,
}

/// Start state of one moving element.
#[derive(Debug, Clone, PartialEq)]
struct DragOrigin {
    id: ElementId,
    start: Geometry,
    /// Group members and their start geometries (unlocked members only).
    children: Vec<(ElementId, Geometry)>,
}

/// An active drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragGesture {
    target: ElementId,
    start_pointer: Point,
    origins: Vec<DragOrigin>,
}

/// An active resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeGesture {
    id: ElementId,
    handle: ResizeHandle,
    start_pointer: Point,
    start: Geometry,
    members: Vec<(ElementId, Geometry)>,
}

/// An active rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RotateGesture {
    id: ElementId,
    center: Point,
    start_angle: f64,
    start: Geometry,
    members: Vec<(ElementId, Geometry)>,
}

/// Gesture state machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Moving the selection.
    Dragging(DragGesture),
    /// Resizing one element.
    Resizing(ResizeGesture),
    /// Rotating one element.
    Rotating(RotateGesture),
}

impl GestureState {
    /// Whether no gesture is active.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Drives gestures against a scene.
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    state: GestureState,
}

impl TransformEngine {
    /// Create an idle engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gesture state.
    #[must_use]
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Whether a gesture is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.state.is_idle()
    }

    /// Begin a gesture on `target`. Returns true if the gesture started.
    ///
    /// Locked targets, the element being text-edited, and stale ids are
    /// ignored. For drags, the target joins the selection if it was not
    /// already selected.
    pub fn begin(
        &mut self,
        scene: &mut Scene,
        target: ElementId,
        kind: GestureKind,
        pointer: Point,
        viewport: &Viewport,
        editing: Option<ElementId>,
    ) -> bool {
        let Some(element) = scene.get(target) else {
            tracing::debug!("gesture ignored for missing element {target}");
            return false;
        };
        if element.locked || editing == Some(target) {
            return false;
        }
        let geometry = element.geometry;

        self.state = match kind {
            GestureKind::Drag => {
                if !scene.is_selected(target) {
                    scene.set_selection(&[target]);
                }
                GestureState::Dragging(DragGesture {
                    target,
                    start_pointer: pointer,
                    origins: drag_origins(scene, editing),
                })
            }
            GestureKind::Resize(handle) => GestureState::Resizing(ResizeGesture {
                id: target,
                handle,
                start_pointer: pointer,
                start: geometry,
                members: crate::group::member_geometries(scene, target),
            }),
            GestureKind::Rotate => {
                let center = geometry.center();
                GestureState::Rotating(RotateGesture {
                    id: target,
                    center,
                    start_angle: pointer_angle(center, viewport.to_canvas(pointer)),
                    start: geometry,
                    members: crate::group::member_geometries(scene, target),
                })
            }
        };
        tracing::debug!(?kind, %target, "gesture started");
        true
    }

    /// Apply a pointer move. Returns the snap guides for this move.
    pub fn update(
        &mut self,
        scene: &mut Scene,
        pointer: Point,
        viewport: &Viewport,
        config: &EditorConfig,
    ) -> Vec<SnapGuide> {
        let zoom = viewport.safe_zoom();
        match &self.state {
            GestureState::Idle => Vec::new(),
            GestureState::Dragging(drag) => {
                let delta = Point::new(
                    (pointer.x - drag.start_pointer.x) / zoom,
                    (pointer.y - drag.start_pointer.y) / zoom,
                );
                apply_drag(scene, drag, delta, zoom, config)
            }
            GestureState::Resizing(resize) => {
                let delta = Point::new(
                    (pointer.x - resize.start_pointer.x) / zoom,
                    (pointer.y - resize.start_pointer.y) / zoom,
                );
                let next = resize_geometry(&resize.start, resize.handle, delta, config.min_size);
                set_geometry(scene, resize.id, next);
                carry_members(scene, resize.id, &resize.start, &resize.members, config.min_size);
                Vec::new()
            }
            GestureState::Rotating(rotate) => {
                let rotation = rotation_from_pointer(
                    rotate.center,
                    rotate.start_angle,
                    rotate.start.rotation,
                    viewport.to_canvas(pointer),
                );
                if let Some(element) = scene.get_mut(rotate.id) {
                    if !element.locked {
                        element.geometry.rotation = rotation;
                    }
                }
                carry_members(scene, rotate.id, &rotate.start, &rotate.members, config.min_size);
                Vec::new()
            }
        }
    }

    /// End the active gesture, returning to idle. Returns the finished state.
    pub fn end(&mut self) -> GestureState {
        std::mem::take(&mut self.state)
    }
}

/// Collect the start geometry of every movable selected element.
///
/// Members of a selected group are moved by their group, so they are not
/// collected a second time.
fn drag_origins(scene: &Scene, editing: Option<ElementId>) -> Vec<DragOrigin> {
    let selected = scene.selection();
    scene
        .selected_elements()
        .filter(|e| !e.locked && Some(e.id) != editing)
        .filter(|e| e.group_id.map_or(true, |g| !selected.contains(&g)))
        .map(|e| DragOrigin {
            id: e.id,
            start: e.geometry,
            children: e
                .children()
                .iter()
                .filter_map(|m| scene.get(m.id))
                .filter(|c| !c.locked)
                .map(|c| (c.id, c.geometry))
                .collect(),
        })
        .collect()
}

fn moved_ids(drag: &DragGesture) -> Vec<ElementId> {
    drag.origins
        .iter()
        .flat_map(|o| std::iter::once(o.id).chain(o.children.iter().map(|(id, _)| *id)))
        .collect()
}

fn apply_drag(
    scene: &mut Scene,
    drag: &DragGesture,
    delta: Point,
    zoom: f64,
    config: &EditorConfig,
) -> Vec<SnapGuide> {
    let (cw, ch) = (scene.canvas.width, scene.canvas.height);
    let mut delta = delta;
    let mut guides = Vec::new();

    let primary = drag
        .origins
        .iter()
        .find(|o| o.id == drag.target)
        .or_else(|| drag.origins.first());

    if config.snap_enabled {
        if let Some(primary) = primary {
            let g = primary.start;
            let (x, y) = clamp_to_canvas(g.x + delta.x, g.y + delta.y, g.width, g.height, cw, ch);
            let moving = Bounds::new(x, y, g.width, g.height);
            let targets = snap_targets(scene, &moved_ids(drag), config.snap_to_canvas);
            let outcome = align::compute_snap(&moving, &targets, config.snap_tolerance / zoom);
            // Only the snap offset is shared; every origin clamps on its own.
            delta.x += outcome.offset_x;
            delta.y += outcome.offset_y;
            guides = outcome.guides;
        }
    }

    for origin in &drag.origins {
        let g = origin.start;
        let (gx, gy) = clamp_to_canvas(g.x + delta.x, g.y + delta.y, g.width, g.height, cw, ch);
        set_position(scene, origin.id, gx, gy);

        for (child_id, start) in &origin.children {
            // Each member clamps on its own; offsets are re-derived below.
            let (cx, cy) = clamp_to_canvas(
                start.x + delta.x,
                start.y + delta.y,
                start.width,
                start.height,
                cw,
                ch,
            );
            set_position(scene, *child_id, cx, cy);
        }
        if origin.children.is_empty() {
            crate::group::refresh_owner(scene, origin.id);
        } else {
            crate::group::rederive_offsets(scene, origin.id);
        }
    }
    guides
}

/// Bounds of visible, unlocked elements that are not moving.
fn snap_targets(scene: &Scene, moving: &[ElementId], include_canvas: bool) -> Vec<Bounds> {
    let mut targets: Vec<Bounds> = scene
        .elements()
        .filter(|e| e.visible && !e.locked && !e.is_group() && !moving.contains(&e.id))
        .map(|e| Bounds::from_geometry(&e.geometry))
        .collect();
    if include_canvas {
        targets.push(Bounds::new(0.0, 0.0, scene.canvas.width, scene.canvas.height));
    }
    targets
}

/// Bring group members along with their group's new frame, or refit the
/// owning group after one of its members changed.
fn carry_members(
    scene: &mut Scene,
    id: ElementId,
    start: &Geometry,
    members: &[(ElementId, Geometry)],
    min_size: f64,
) {
    if members.is_empty() {
        crate::group::refresh_owner(scene, id);
    } else {
        crate::group::follow_frame(scene, id, start, members, min_size);
    }
}

fn set_position(scene: &mut Scene, id: ElementId, x: f64, y: f64) {
    if let Some(element) = scene.get_mut(id) {
        if !element.locked {
            element.geometry.x = x;
            element.geometry.y = y;
        }
    }
}

fn set_geometry(scene: &mut Scene, id: ElementId, geometry: Geometry) {
    if let Some(element) = scene.get_mut(id) {
        if !element.locked {
            element.geometry = geometry;
        }
    }
}
