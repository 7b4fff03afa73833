//! Animated recording.
//!
//! A recording runs two blocking tasks joined by a bounded channel: the frame
//! driver composites the prepared scene on a virtual clock, the encoder task
//! feeds frames into an [`EncoderSession`]. They meet again only at
//! [`Recorder::stop_recording`], which closes the channel, waits for the
//! encoder to flush and hands the finished container to the sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use studio_core::Scene;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::encoder::{
    select_encoder, BitrateTier, EncoderBackend, EncoderOptions, EncoderProfile, EncoderSession,
    GifEncoderBackend, RecordingFormat, VideoFrameData,
};
use crate::error::{ExportError, ExportResult, ExportWarning};
use crate::export::{FrameTime, PreparedScene, SceneExporter};
use crate::sink::ArtifactSink;

/// Frames the driver may run ahead of the encoder.
const FRAME_BUFFER: usize = 8;

/// Recording parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingOptions {
    /// Preferred output format.
    pub format: RecordingFormat,
    /// Length of the recording in seconds.
    pub duration_secs: f64,
    /// Frames per second.
    pub fps: u32,
    /// Bitrate tier.
    pub bitrate: BitrateTier,
    /// File name without extension.
    pub file_stem: String,
    /// Pace frames against the wall clock instead of rendering as fast as possible.
    pub realtime: bool,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            format: RecordingFormat::WebM,
            duration_secs: 5.0,
            fps: 30,
            bitrate: BitrateTier::Medium,
            file_stem: "recording".to_string(),
            realtime: false,
        }
    }
}

impl RecordingOptions {
    /// Number of frames covering the configured duration.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn total_frames(&self) -> u64 {
        let frames = (self.duration_secs * f64::from(self.fps)).ceil();
        if frames.is_finite() && frames >= 1.0 {
            frames as u64
        } else {
            1
        }
    }
}

/// A finished recording.
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    /// Container/codec actually used.
    pub profile: EncoderProfile,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// Frames encoded.
    pub frames: u64,
    /// Where the sink stored the artifact.
    pub location: String,
    /// Elements skipped while loading or drawing.
    pub warnings: Vec<ExportWarning>,
}

struct DriverReport {
    frames: u64,
    warnings: Vec<ExportWarning>,
}

struct ActiveRecording {
    profile: EncoderProfile,
    file_stem: String,
    stop: Arc<AtomicBool>,
    driver: JoinHandle<ExportResult<DriverReport>>,
    encoder: JoinHandle<ExportResult<Vec<u8>>>,
}

/// Records animated scenes into video artifacts.
pub struct Recorder {
    exporter: SceneExporter,
    backends: Vec<Arc<dyn EncoderBackend>>,
    sink: Arc<dyn ArtifactSink>,
    active: Option<ActiveRecording>,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("exporter", &self.exporter)
            .field("backends", &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>())
            .field("recording", &self.active.is_some())
            .finish_non_exhaustive()
    }
}

impl Recorder {
    /// Create a recorder with the built-in GIF backend.
    #[must_use]
    pub fn new(exporter: SceneExporter, sink: Arc<dyn ArtifactSink>) -> Self {
        Self {
            exporter,
            backends: vec![Arc::new(GifEncoderBackend)],
            sink,
            active: None,
        }
    }

    /// Replace the encoder backends, in priority order.
    #[must_use]
    pub fn with_backends(mut self, backends: Vec<Arc<dyn EncoderBackend>>) -> Self {
        self.backends = backends;
        self
    }

    /// Add a backend ahead of the existing ones.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn EncoderBackend>) -> Self {
        self.backends.insert(0, backend);
        self
    }

    /// Whether a recording is in progress.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Start recording a snapshot of `scene`.
    ///
    /// Images are loaded and the first frame is composited before this
    /// returns, so surface and encoder failures surface here.
    ///
    /// # Errors
    ///
    /// - [`ExportError::Capability`] if no backend supports the format.
    /// - [`ExportError::NoSurface`] if the canvas cannot be rasterized.
    /// - [`ExportError::Recording`] if already recording or the options are invalid.
    pub async fn start_recording(&mut self, scene: &Scene, options: RecordingOptions) -> ExportResult<()> {
        if self.active.is_some() {
            return Err(ExportError::Recording("a recording is already running".to_string()));
        }
        if options.fps == 0 || !(options.duration_secs.is_finite() && options.duration_secs > 0.0) {
            return Err(ExportError::Recording(format!(
                "invalid recording length: {}s at {} fps",
                options.duration_secs, options.fps
            )));
        }

        let (backend, profile) = select_encoder(&self.backends, options.format)?;
        let prepared = self.exporter.prepare(scene).await;
        let (first, first_warnings) = self.exporter.composite(&prepared, FrameTime::Elapsed(0.0))?;
        let first = VideoFrameData::from_surface(&first);

        let session = backend.start(&EncoderOptions {
            profile,
            width: first.width,
            height: first.height,
            fps: options.fps,
            bitrate: options.bitrate,
        })?;

        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        let encoder = tokio::task::spawn_blocking(move || run_encoder(session, rx));

        let stop = Arc::new(AtomicBool::new(false));
        let mut warnings = prepared.warnings().to_vec();
        merge_warnings(&mut warnings, first_warnings);
        let driver = {
            let exporter = self.exporter.clone();
            let stop = Arc::clone(&stop);
            let options = options.clone();
            tokio::task::spawn_blocking(move || {
                drive_frames(&exporter, &prepared, &options, first, &stop, &tx, warnings)
            })
        };

        tracing::info!(
            profile = profile.mime(),
            backend = backend.name(),
            fps = options.fps,
            frames = options.total_frames(),
            "recording started"
        );
        self.active = Some(ActiveRecording {
            profile,
            file_stem: options.file_stem,
            stop,
            driver,
            encoder,
        });
        Ok(())
    }

    /// Stop recording, flush the encoder and save the artifact.
    ///
    /// Returns `Ok(None)` when no recording is running.
    ///
    /// # Errors
    ///
    /// Returns an error if a task failed, the encoder could not finalize,
    /// or the sink rejected the artifact.
    pub async fn stop_recording(&mut self) -> ExportResult<Option<RecordingArtifact>> {
        self.finalize(true).await
    }

    /// Let the recording run to its configured duration, then finalize it
    /// like [`Recorder::stop_recording`].
    ///
    /// # Errors
    ///
    /// Same as [`Recorder::stop_recording`].
    pub async fn complete_recording(&mut self) -> ExportResult<Option<RecordingArtifact>> {
        self.finalize(false).await
    }

    async fn finalize(&mut self, interrupt: bool) -> ExportResult<Option<RecordingArtifact>> {
        let Some(active) = self.active.take() else {
            tracing::debug!("stop requested while idle");
            return Ok(None);
        };
        if interrupt {
            active.stop.store(true, Ordering::Release);
        }

        let report = active
            .driver
            .await
            .map_err(|e| ExportError::Recording(format!("frame driver failed: {e}")))??;
        let bytes = active
            .encoder
            .await
            .map_err(|e| ExportError::Recording(format!("encoder task failed: {e}")))??;

        let filename = format!("{}.{}", active.file_stem, active.profile.extension());
        let location = self.sink.save(&bytes, &filename).await?;
        tracing::info!(
            frames = report.frames,
            bytes = bytes.len(),
            %location,
            "recording finished"
        );
        Ok(Some(RecordingArtifact {
            profile: active.profile,
            bytes,
            frames: report.frames,
            location,
            warnings: report.warnings,
        }))
    }
}

fn run_encoder(
    mut session: Box<dyn EncoderSession>,
    mut rx: mpsc::Receiver<VideoFrameData>,
) -> ExportResult<Vec<u8>> {
    while let Some(frame) = rx.blocking_recv() {
        session.push_frame(frame)?;
    }
    session.finish()
}

#[allow(clippy::cast_precision_loss)]
fn drive_frames(
    exporter: &SceneExporter,
    prepared: &PreparedScene,
    options: &RecordingOptions,
    first: VideoFrameData,
    stop: &AtomicBool,
    tx: &mpsc::Sender<VideoFrameData>,
    mut warnings: Vec<ExportWarning>,
) -> ExportResult<DriverReport> {
    let total = options.total_frames();
    let fps = f64::from(options.fps);
    let started = Instant::now();

    if tx.blocking_send(first).is_err() {
        return Ok(DriverReport { frames: 0, warnings });
    }
    let mut frames = 1;

    while frames < total && !stop.load(Ordering::Acquire) {
        let elapsed = frames as f64 / fps;
        if options.realtime {
            let due = Duration::from_secs_f64(elapsed);
            if let Some(wait) = due.checked_sub(started.elapsed()) {
                std::thread::sleep(wait);
            }
        }

        let (surface, frame_warnings) = exporter.composite(prepared, FrameTime::Elapsed(elapsed))?;
        merge_warnings(&mut warnings, frame_warnings);
        if tx.blocking_send(VideoFrameData::from_surface(&surface)).is_err() {
            // Encoder gave up; its error is reported on stop.
            break;
        }
        frames += 1;
    }
    tracing::debug!(frames, "frame driver finished");
    Ok(DriverReport { frames, warnings })
}

/// Draw failures repeat every frame; keep one of each.
fn merge_warnings(into: &mut Vec<ExportWarning>, from: Vec<ExportWarning>) {
    for warning in from {
        if !into.contains(&warning) {
            into.push(warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::DirectorySink;
    use studio_core::{Element, ElementId};

    #[test]
    fn test_total_frames() {
        let options = RecordingOptions {
            duration_secs: 1.0,
            ..RecordingOptions::default()
        };
        assert_eq!(options.total_frames(), 30);
        let options = RecordingOptions {
            duration_secs: 0.01,
            fps: 10,
            ..RecordingOptions::default()
        };
        assert_eq!(options.total_frames(), 1);
    }

    #[test]
    fn test_defaults() {
        let options = RecordingOptions::default();
        assert_eq!(options.fps, 30);
        assert_eq!(options.bitrate, BitrateTier::Medium);
        assert!(!options.realtime);

        let parsed: RecordingOptions =
            serde_json::from_str(r#"{"format":"gif","bitrate":"high"}"#).expect("options");
        assert_eq!(parsed.format, RecordingFormat::Gif);
        assert_eq!(parsed.bitrate, BitrateTier::High);
        assert_eq!(parsed.fps, 30);
    }

    #[test]
    fn test_merge_warnings_dedupes() {
        let id = ElementId::new();
        let mut warnings = vec![ExportWarning::draw(id, "boom")];
        merge_warnings(
            &mut warnings,
            vec![ExportWarning::draw(id, "boom"), ExportWarning::resource(id, "gone")],
        );
        assert_eq!(warnings.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut recorder = Recorder::new(
            SceneExporter::with_defaults(),
            Arc::new(DirectorySink::new(tmp.path())),
        );
        let mut scene = Scene::new(10.0, 10.0);
        scene.add_element(Element::text("hi"));
        let options = RecordingOptions {
            fps: 0,
            ..RecordingOptions::default()
        };
        let result = recorder.start_recording(&scene, options).await;
        assert!(matches!(result, Err(ExportError::Recording(_))));
        assert!(!recorder.is_recording());
    }
}
