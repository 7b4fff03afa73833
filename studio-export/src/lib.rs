//! # Studio Export
//!
//! Turns a [`studio_core::Scene`] into artifacts.
//!
//! ## Pipeline
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Scene    │──▶│ ImageLoader  │──▶│ ElementDrawer│──▶│ PNG/JPEG/PDF │
//! │ snapshot  │   │ (join_all)   │   │ (tiny-skia)  │   ├──────────────┤
//! └───────────┘   └──────────────┘   └──────┬───────┘   │ SvgBuilder   │
//!                                           │           └──────────────┘
//!                                           ▼
//!                               ┌────────────────────────┐
//!                               │ Recorder ─▶ mpsc ─▶    │
//!                               │ EncoderSession (task)  │
//!                               └───────────┬────────────┘
//!                                           ▼
//!                                     ArtifactSink
//! ```
//!
//! Elements that fail to load or draw are skipped and reported as
//! [`ExportWarning`]s; only a missing surface or a missing encoder is fatal.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod drawer;
pub mod encoder;
pub mod error;
pub mod export;
pub mod image;
pub mod recorder;
pub mod sink;
pub mod svg;

pub use drawer::{ElementDrawer, Surface, SvgElementDrawer};
pub use encoder::{
    select_encoder, BitrateTier, Codec, Container, EncoderBackend, EncoderOptions, EncoderProfile,
    EncoderSession, GifEncoderBackend, RecordingFormat, VideoFrameData,
};
pub use error::{ExportError, ExportResult, ExportWarning, WarningKind};
pub use export::{
    ExportArtifact, ExportConfig, ExportFormat, FrameTime, PreparedScene, SceneExporter, MM_PER_PX,
};
pub use image::{
    resolve_images, CompositeImageLoader, DataUriImageLoader, FileImageLoader, ImageFormat,
    ImageLoader, ImageState, ImageStore, LoadedImage,
};
pub use recorder::{Recorder, RecordingArtifact, RecordingOptions};
pub use sink::{ArtifactSink, DirectorySink};
pub use svg::SvgBuilder;
