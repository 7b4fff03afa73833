//! Scene elements - the building blocks of a design template.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::animation::Animation;

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in canvas or screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate (grows downward).
    pub y: f64,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Position, size and rotation of an element in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Left edge of the unrotated box.
    pub x: f64,
    /// Top edge of the unrotated box.
    pub y: f64,
    /// Width of the box.
    pub width: f64,
    /// Height of the box.
    pub height: f64,
    /// Clockwise rotation in degrees about the box center, in `[0, 360)`.
    pub rotation: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
        }
    }
}

impl Geometry {
    /// Create an unrotated geometry.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
        }
    }

    /// Set the rotation in degrees.
    #[must_use]
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = crate::transform::normalize_degrees(degrees);
        self
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Right edge of the unrotated box.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge of the unrotated box.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if a point (in canvas coordinates) is inside the rotated box.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        let local = crate::transform::rotate_point(point, self.center(), -self.rotation);
        local.x >= self.x && local.x <= self.right() && local.y >= self.y && local.y <= self.bottom()
    }
}

/// One color stop of a gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the gradient, `0.0..=1.0`.
    pub offset: f64,
    /// CSS color string.
    pub color: String,
}

/// Gradient geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GradientKind {
    /// Linear gradient across the element box.
    Linear {
        /// Direction in degrees; 0 runs left to right, 90 top to bottom.
        angle: f64,
    },
    /// Radial gradient centered in the element box.
    Radial,
}

/// A gradient built from ordered color stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    /// Linear or radial.
    pub kind: GradientKind,
    /// Color stops in ascending offset order.
    pub stops: Vec<GradientStop>,
}

impl Gradient {
    /// Create a linear gradient from `(offset, color)` pairs.
    #[must_use]
    pub fn linear(angle: f64, stops: &[(f64, &str)]) -> Self {
        Self {
            kind: GradientKind::Linear { angle },
            stops: Self::build_stops(stops),
        }
    }

    /// Create a radial gradient from `(offset, color)` pairs.
    #[must_use]
    pub fn radial(stops: &[(f64, &str)]) -> Self {
        Self {
            kind: GradientKind::Radial,
            stops: Self::build_stops(stops),
        }
    }

    fn build_stops(stops: &[(f64, &str)]) -> Vec<GradientStop> {
        stops
            .iter()
            .map(|(offset, color)| GradientStop {
                offset: offset.clamp(0.0, 1.0),
                color: (*color).to_string(),
            })
            .collect()
    }
}

/// Fill paint: a solid color or a gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Paint {
    /// Solid CSS color.
    Solid(String),
    /// Gradient fill.
    Gradient(Gradient),
    /// No fill.
    None,
}

impl Paint {
    /// Solid color paint.
    #[must_use]
    pub fn solid(color: &str) -> Self {
        Self::Solid(color.to_string())
    }

    /// The gradient, if this paint is one.
    #[must_use]
    pub fn gradient(&self) -> Option<&Gradient> {
        match self {
            Self::Gradient(g) => Some(g),
            _ => None,
        }
    }
}

/// Visual style shared by all element kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Fill paint.
    pub fill: Paint,
    /// Stroke color, if stroked.
    pub stroke: Option<String>,
    /// Stroke width in canvas units.
    pub stroke_width: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Paint::solid("#4e79a7"),
            stroke: None,
            stroke_width: 0.0,
        }
    }
}

/// Geometric primitive of a shape element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Rectangle, optionally with rounded corners.
    Rectangle,
    /// Ellipse inscribed in the box.
    Ellipse,
    /// Isosceles triangle with its apex at the top edge center.
    Triangle,
    /// Horizontal line through the box center.
    Line,
}

/// Horizontal text anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Left aligned.
    #[default]
    Start,
    /// Centered.
    Middle,
    /// Right aligned.
    End,
}

/// A member reference held by a group element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    /// The member element.
    pub id: ElementId,
    /// Member x minus group x.
    pub relative_x: f64,
    /// Member y minus group y.
    pub relative_y: f64,
}

/// The type of content an element contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ElementKind {
    /// A text block.
    Text {
        /// Text content; `\n` separates lines.
        content: String,
        /// Font family name.
        font_family: String,
        /// Font size in canvas units.
        font_size: f64,
        /// CSS font weight (400 regular, 700 bold).
        font_weight: u16,
        /// Horizontal alignment.
        align: TextAlign,
        /// Text color as a CSS color.
        color: String,
    },

    /// A vector shape.
    Shape {
        /// Primitive to draw.
        shape: ShapeKind,
        /// Corner radius for rectangles.
        corner_radius: f64,
    },

    /// A raster image.
    Image {
        /// Image source: a `data:` URI or a file path.
        src: String,
    },

    /// A container for other elements.
    Group {
        /// Members in stacking order with their offsets from the group origin.
        children: Vec<GroupMember>,
    },
}

/// A canvas element with content, geometry and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Element content type.
    pub kind: ElementKind,
    /// Position, size and rotation.
    pub geometry: Geometry,
    /// Paint order key; higher paints later.
    pub z: f64,
    /// Hidden elements are skipped by snapping and export.
    pub visible: bool,
    /// Locked elements ignore interactive transforms.
    pub locked: bool,
    /// Opacity, `0.0..=1.0`.
    pub opacity: f64,
    /// Fill and stroke.
    pub style: Style,
    /// Optional entrance/loop animation.
    pub animation: Option<Animation>,
    /// Owning group, for group members.
    pub group_id: Option<ElementId>,
}

impl Element {
    /// Create a new element with the given kind.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            geometry: Geometry::default(),
            z: 0.0,
            visible: true,
            locked: false,
            opacity: 1.0,
            style: Style::default(),
            animation: None,
            group_id: None,
        }
    }

    /// Create a text element with default typography.
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self::new(ElementKind::Text {
            content: content.to_string(),
            font_family: "sans-serif".to_string(),
            font_size: 24.0,
            font_weight: 400,
            align: TextAlign::Start,
            color: "#1f1a17".to_string(),
        })
    }

    /// Create a shape element.
    #[must_use]
    pub fn shape(shape: ShapeKind) -> Self {
        Self::new(ElementKind::Shape {
            shape,
            corner_radius: 0.0,
        })
    }

    /// Create an image element.
    #[must_use]
    pub fn image(src: &str) -> Self {
        Self::new(ElementKind::Image {
            src: src.to_string(),
        })
    }

    /// Set the geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the style.
    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Set the fill paint.
    #[must_use]
    pub fn with_fill(mut self, fill: Paint) -> Self {
        self.style.fill = fill;
        self
    }

    /// Attach an animation.
    #[must_use]
    pub fn with_animation(mut self, animation: Animation) -> Self {
        self.animation = Some(animation);
        self
    }

    /// Set whether the element is locked.
    #[must_use]
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Whether this is a group element.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ElementKind::Group { .. })
    }

    /// Whether this is a text element.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, ElementKind::Text { .. })
    }

    /// Group members; empty for non-group elements.
    #[must_use]
    pub fn children(&self) -> &[GroupMember] {
        match &self.kind {
            ElementKind::Group { children } => children,
            _ => &[],
        }
    }

    /// Image source, for image elements.
    #[must_use]
    pub fn image_src(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Image { src } => Some(src),
            _ => None,
        }
    }

    /// Short lowercase name of the element kind.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ElementKind::Text { .. } => "text",
            ElementKind::Shape { .. } => "shape",
            ElementKind::Image { .. } => "image",
            ElementKind::Group { .. } => "group",
        }
    }
}
