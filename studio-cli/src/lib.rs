//! # Studio CLI
//!
//! Headless host for the Studio editor core: loads a scene document (JSON)
//! and runs it through the export pipeline.
//!
//! ## Usage
//!
//! ```bash
//! studio export poster.json --format pdf --scale 2
//! studio --output-dir out record intro.json --format webm --duration 3
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use studio_core::Scene;
use studio_export::{
    ArtifactSink, BitrateTier, DirectorySink, ExportConfig, ExportFormat, ExportWarning, Recorder,
    RecordingFormat, RecordingOptions, SceneExporter,
};

/// Command-line arguments for the studio binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "studio")]
#[command(about = "Export and record Studio scene documents")]
#[command(version)]
pub struct CliArgs {
    /// Directory artifacts are written into
    #[arg(long, short, global = true, env = "STUDIO_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Print the outcome as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Render a scene to PNG, JPEG, SVG or PDF
    Export(ExportArgs),
    /// Record a scene's animations to video
    Record(RecordArgs),
}

/// Arguments shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct SceneArgs {
    /// Scene document (JSON)
    pub scene: PathBuf,

    /// Output file name without extension (defaults to the scene file stem)
    #[arg(long)]
    pub stem: Option<String>,

    /// Pixels per canvas unit
    #[arg(long, default_value = "1.0")]
    pub scale: f64,

    /// Load system fonts for text rendering
    #[arg(long)]
    pub system_fonts: bool,
}

/// `studio export`.
#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Scene selection and output naming
    #[command(flatten)]
    pub scene: SceneArgs,

    /// png, jpeg, svg or pdf
    #[arg(long, short, default_value = "png")]
    pub format: ExportFormat,

    /// JPEG quality (1-100)
    #[arg(long, default_value = "85")]
    pub quality: u8,
}

/// `studio record`.
#[derive(Debug, Clone, Args)]
pub struct RecordArgs {
    /// Scene selection and output naming
    #[command(flatten)]
    pub scene: SceneArgs,

    /// webm, mp4 or gif (falls back when unavailable)
    #[arg(long, short, default_value = "webm")]
    pub format: RecordingFormat,

    /// Length in seconds
    #[arg(long, default_value = "5.0")]
    pub duration: f64,

    /// Frames per second
    #[arg(long, default_value = "30")]
    pub fps: u32,

    /// low, medium or high
    #[arg(long, default_value = "medium")]
    pub bitrate: BitrateTier,

    /// Pace frames against the wall clock
    #[arg(long)]
    pub realtime: bool,
}

impl SceneArgs {
    fn stem(&self) -> String {
        self.stem.clone().unwrap_or_else(|| {
            self.scene
                .file_stem()
                .map_or_else(|| "scene".to_string(), |s| s.to_string_lossy().into_owned())
        })
    }

    fn exporter(&self, quality: u8) -> SceneExporter {
        SceneExporter::new(ExportConfig {
            scale: self.scale,
            jpeg_quality: quality,
            load_system_fonts: self.system_fonts,
            ..ExportConfig::default()
        })
    }
}

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Where the artifact was written.
    pub location: String,
    /// Elements skipped during rendering.
    pub warnings: Vec<ExportWarning>,
}

/// Read and parse a scene document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid scene.
pub async fn load_scene(path: &Path) -> anyhow::Result<Scene> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read scene {}", path.display()))?;
    let scene = Scene::from_json(&json)
        .with_context(|| format!("Failed to parse scene {}", path.display()))?;
    tracing::debug!(path = %path.display(), elements = scene.len(), "scene loaded");
    Ok(scene)
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns an error if the scene cannot be loaded or the export fails.
pub async fn run(args: CliArgs) -> anyhow::Result<RunOutcome> {
    let sink = DirectorySink::new(&args.output_dir);
    let outcome = match args.command {
        Command::Export(export) => {
            let scene = load_scene(&export.scene.scene).await?;
            let exporter = export.scene.exporter(export.quality);
            let stem = export.scene.stem();
            let artifact = exporter
                .export_as(&scene, export.format)
                .await
                .context("Export failed")?;
            let location = sink
                .save(&artifact.bytes, &artifact.filename(&stem))
                .await
                .context("Failed to write artifact")?;
            RunOutcome {
                location,
                warnings: artifact.warnings,
            }
        }
        Command::Record(record) => {
            let scene = load_scene(&record.scene.scene).await?;
            let options = RecordingOptions {
                format: record.format,
                duration_secs: record.duration,
                fps: record.fps,
                bitrate: record.bitrate,
                file_stem: record.scene.stem(),
                realtime: record.realtime,
            };
            let mut recorder = Recorder::new(
                record.scene.exporter(ExportConfig::default().jpeg_quality),
                Arc::new(sink),
            );
            recorder
                .start_recording(&scene, options)
                .await
                .context("Failed to start recording")?;
            let artifact = recorder
                .complete_recording()
                .await
                .context("Recording failed")?
                .context("Recording produced no artifact")?;
            RunOutcome {
                location: artifact.location,
                warnings: artifact.warnings,
            }
        }
    };

    for warning in &outcome.warnings {
        tracing::warn!(%warning, "element skipped");
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use studio_core::{Element, Geometry, Paint, ShapeKind};

    fn write_scene(dir: &Path) -> PathBuf {
        let mut scene = Scene::new(40.0, 30.0);
        scene.add_element(
            Element::shape(ShapeKind::Rectangle)
                .with_geometry(Geometry::new(5.0, 5.0, 10.0, 10.0))
                .with_fill(Paint::solid("#336699")),
        );
        let path = dir.join("banner.json");
        std::fs::write(&path, scene.to_json().expect("json")).expect("write scene");
        path
    }

    #[test]
    fn test_parse_export_args() {
        let args = CliArgs::try_parse_from([
            "studio", "export", "scene.json", "--format", "jpeg", "--scale", "2", "--quality", "70",
        ])
        .expect("parse");
        let Command::Export(export) = args.command else {
            panic!("expected export");
        };
        assert_eq!(export.format, ExportFormat::Jpeg);
        assert!((export.scene.scale - 2.0).abs() < f64::EPSILON);
        assert_eq!(export.quality, 70);
        assert_eq!(export.scene.stem(), "scene");
    }

    #[test]
    fn test_parse_record_args() {
        let args = CliArgs::try_parse_from([
            "studio", "-o", "out", "record", "intro.json", "--format", "gif", "--bitrate", "high",
            "--stem", "clip",
        ])
        .expect("parse");
        assert_eq!(args.output_dir, PathBuf::from("out"));
        let Command::Record(record) = args.command else {
            panic!("expected record");
        };
        assert_eq!(record.format, RecordingFormat::Gif);
        assert_eq!(record.bitrate, BitrateTier::High);
        assert_eq!(record.fps, 30);
        assert_eq!(record.scene.stem(), "clip");
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(CliArgs::try_parse_from(["studio", "export", "s.json", "--format", "bmp"]).is_err());
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let scene = write_scene(tmp.path());
        let out = tmp.path().join("out");
        let args = CliArgs::try_parse_from([
            OsStr::new("studio"),
            OsStr::new("--output-dir"),
            out.as_os_str(),
            OsStr::new("export"),
            scene.as_os_str(),
            OsStr::new("--format"),
            OsStr::new("svg"),
        ])
        .expect("parse");

        let outcome = run(args).await.expect("run");
        assert!(outcome.warnings.is_empty());
        assert!(outcome.location.ends_with("banner.svg"));
        let svg = std::fs::read_to_string(out.join("banner.svg")).expect("svg");
        assert!(svg.contains("#336699"));
    }

    #[tokio::test]
    async fn test_record_writes_gif() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let scene = write_scene(tmp.path());
        let args = CliArgs::try_parse_from([
            OsStr::new("studio"),
            OsStr::new("--output-dir"),
            tmp.path().as_os_str(),
            OsStr::new("record"),
            scene.as_os_str(),
            OsStr::new("--duration"),
            OsStr::new("0.1"),
            OsStr::new("--fps"),
            OsStr::new("10"),
        ])
        .expect("parse");

        let outcome = run(args).await.expect("run");
        assert!(outcome.location.ends_with("banner.gif"));
        assert!(tmp.path().join("banner.gif").exists());
    }

    #[tokio::test]
    async fn test_missing_scene_is_error() {
        let err = load_scene(Path::new("/no/such/scene.json")).await;
        assert!(err.is_err());
    }
}
