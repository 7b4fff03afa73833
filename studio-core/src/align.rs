//! Snap lines for drags and discrete align commands.

use serde::{Deserialize, Serialize};

use crate::element::{ElementId, Geometry};
use crate::scene::Scene;

/// Distance under which two guide coordinates count as equal.
const GUIDE_EPSILON: f64 = 1e-6;

/// Axis-aligned box used for snapping. Rotation is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Bounds {
    /// Create bounds.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Unrotated bounds of a geometry.
    #[must_use]
    pub fn from_geometry(geometry: &Geometry) -> Self {
        Self::new(geometry.x, geometry.y, geometry.width, geometry.height)
    }

    /// Left, center and right x coordinates.
    #[must_use]
    pub fn x_lines(&self) -> [f64; 3] {
        [self.x, self.x + self.width / 2.0, self.x + self.width]
    }

    /// Top, middle and bottom y coordinates.
    #[must_use]
    pub fn y_lines(&self) -> [f64; 3] {
        [self.y, self.y + self.height / 2.0, self.y + self.height]
    }

    /// Smallest bounds covering every input, or `None` when empty.
    pub fn union<I: IntoIterator<Item = Self>>(items: I) -> Option<Self> {
        items.into_iter().reduce(|a, b| {
            let x = a.x.min(b.x);
            let y = a.y.min(b.y);
            let right = (a.x + a.width).max(b.x + b.width);
            let bottom = (a.y + a.height).max(b.y + b.height);
            Self::new(x, y, right - x, bottom - y)
        })
    }
}

/// Orientation of a guide line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideOrientation {
    /// A vertical line at a fixed x.
    Vertical,
    /// A horizontal line at a fixed y.
    Horizontal,
}

/// A transient guide line in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapGuide {
    /// Line orientation.
    pub orientation: GuideOrientation,
    /// x for vertical guides, y for horizontal ones.
    pub position: f64,
    /// Start of the line along its axis.
    pub start: f64,
    /// End of the line along its axis.
    pub end: f64,
}

/// Result of a snap computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapOutcome {
    /// Horizontal correction to apply to the moving bounds.
    pub offset_x: f64,
    /// Vertical correction to apply to the moving bounds.
    pub offset_y: f64,
    /// Guides to display for the snapped position.
    pub guides: Vec<SnapGuide>,
}

/// Nearest line match within `tolerance`: returns the correction.
fn nearest(moving: [f64; 3], targets: impl Iterator<Item = [f64; 3]>, tolerance: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for lines in targets {
        for target in lines {
            for line in moving {
                let diff = target - line;
                if diff.abs() <= tolerance && best.map_or(true, |b| diff.abs() < b.abs()) {
                    best = Some(diff);
                }
            }
        }
    }
    best
}

/// Snap `moving` against `targets` within `tolerance` canvas units.
///
/// Each axis snaps independently to its nearest match. Guides cover every
/// target line the snapped bounds coincide with, merged per coordinate.
#[must_use]
pub fn compute_snap(moving: &Bounds, targets: &[Bounds], tolerance: f64) -> SnapOutcome {
    let offset_x = nearest(moving.x_lines(), targets.iter().map(Bounds::x_lines), tolerance);
    let offset_y = nearest(moving.y_lines(), targets.iter().map(Bounds::y_lines), tolerance);

    let snapped = Bounds::new(
        moving.x + offset_x.unwrap_or(0.0),
        moving.y + offset_y.unwrap_or(0.0),
        moving.width,
        moving.height,
    );

    let mut guides: Vec<SnapGuide> = Vec::new();
    for target in targets {
        if offset_x.is_some() {
            for line in coinciding(snapped.x_lines(), target.x_lines()) {
                let start = snapped.y.min(target.y);
                let end = (snapped.y + snapped.height).max(target.y + target.height);
                merge_guide(&mut guides, GuideOrientation::Vertical, line, start, end);
            }
        }
        if offset_y.is_some() {
            for line in coinciding(snapped.y_lines(), target.y_lines()) {
                let start = snapped.x.min(target.x);
                let end = (snapped.x + snapped.width).max(target.x + target.width);
                merge_guide(&mut guides, GuideOrientation::Horizontal, line, start, end);
            }
        }
    }

    SnapOutcome {
        offset_x: offset_x.unwrap_or(0.0),
        offset_y: offset_y.unwrap_or(0.0),
        guides,
    }
}

fn coinciding(moving: [f64; 3], target: [f64; 3]) -> impl Iterator<Item = f64> {
    moving
        .into_iter()
        .filter(move |m| target.iter().any(|t| (t - m).abs() < GUIDE_EPSILON))
}

fn merge_guide(
    guides: &mut Vec<SnapGuide>,
    orientation: GuideOrientation,
    position: f64,
    start: f64,
    end: f64,
) {
    if let Some(existing) = guides
        .iter_mut()
        .find(|g| g.orientation == orientation && (g.position - position).abs() < GUIDE_EPSILON)
    {
        existing.start = existing.start.min(start);
        existing.end = existing.end.max(end);
        return;
    }
    guides.push(SnapGuide {
        orientation,
        position,
        start,
        end,
    });
}

/// Edge or center to align to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignMode {
    /// Left edges.
    Left,
    /// Horizontal centers.
    Center,
    /// Right edges.
    Right,
    /// Top edges.
    Top,
    /// Vertical middles.
    Middle,
    /// Bottom edges.
    Bottom,
}

/// Align the unlocked selected elements. Returns true if anything moved.
///
/// With several elements selected the reference is the selection's bounding
/// box; a single element aligns to the canvas. Members of a selected group
/// move with the group.
pub fn align_selection(scene: &mut Scene, mode: AlignMode) -> bool {
    let selection = scene.selection().to_vec();
    let selected: Vec<(ElementId, Bounds, bool)> = scene
        .selected_elements()
        .filter(|e| e.group_id.map_or(true, |g| !selection.contains(&g)))
        .map(|e| (e.id, Bounds::from_geometry(&e.geometry), e.locked))
        .collect();

    let reference = if selected.len() == 1 {
        Bounds::new(0.0, 0.0, scene.canvas.width, scene.canvas.height)
    } else {
        match Bounds::union(selected.iter().map(|(_, b, _)| *b)) {
            Some(bounds) => bounds,
            None => return false,
        }
    };

    let mut moved = false;
    for (id, bounds, locked) in selected {
        if locked {
            continue;
        }
        let (dx, dy) = match mode {
            AlignMode::Left => (reference.x - bounds.x, 0.0),
            AlignMode::Center => (reference.x_lines()[1] - bounds.x_lines()[1], 0.0),
            AlignMode::Right => (reference.x_lines()[2] - bounds.x_lines()[2], 0.0),
            AlignMode::Top => (0.0, reference.y - bounds.y),
            AlignMode::Middle => (0.0, reference.y_lines()[1] - bounds.y_lines()[1]),
            AlignMode::Bottom => (0.0, reference.y_lines()[2] - bounds.y_lines()[2]),
        };
        if dx.abs() < GUIDE_EPSILON && dy.abs() < GUIDE_EPSILON {
            continue;
        }
        crate::group::translate(scene, id, dx, dy);
        crate::group::refresh_owner(scene, id);
        moved = true;
    }
    moved
}
