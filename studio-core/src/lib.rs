//! # Studio Core
//!
//! Scene-graph manipulation engine for a 2D design-template editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  Editor                     │
//! ├─────────────────────────────────────────────┤
//! │  Transform Engine │  History                │
//! │  - Drag/resize    │  - Snapshot stack       │
//! │  - Rotate         │  - Undo / redo          │
//! │  - Handles        │                         │
//! ├─────────────────────────────────────────────┤
//! │  Scene Store      │  Grouping  │  Align     │
//! │  - Elements       │  - Group   │  - Snap    │
//! │  - Selection      │  - Ungroup │  - Guides  │
//! │  - Z-order        │            │            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Pointer events drive the [`TransformEngine`] through the [`Editor`];
//! completed gestures and discrete commands push snapshots into the
//! [`History`]. Rendering lives in `studio-export`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod align;
pub mod animation;
pub mod config;
pub mod editor;
pub mod element;
pub mod error;
pub mod group;
pub mod history;
pub mod scene;
pub mod transform;

pub use align::{AlignMode, Bounds, GuideOrientation, SnapGuide, SnapOutcome};
pub use animation::{Animation, AnimationKind};
pub use config::EditorConfig;
pub use editor::Editor;
pub use element::{
    Element, ElementId, ElementKind, Geometry, Gradient, GradientKind, GradientStop, GroupMember,
    Paint, Point, ShapeKind, Style, TextAlign,
};
pub use error::{CoreError, CoreResult};
pub use history::History;
pub use scene::{Canvas, ElementPatch, Scene, ZOrder};
pub use transform::{
    GestureKind, GestureState, Handle, ResizeHandle, TransformEngine, Viewport,
};

/// Studio core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
