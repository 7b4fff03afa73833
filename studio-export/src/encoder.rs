//! Video encoder selection and the built-in GIF encoder.
//!
//! Platform encoders plug in through [`EncoderBackend`]. The recorder asks
//! [`select_encoder`] for the first container/codec pair of the requested
//! format's preference list that some backend supports.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::drawer::Surface;
use crate::error::{ExportError, ExportResult};

/// Video container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// WebM (Matroska subset).
    WebM,
    /// MPEG-4 Part 14.
    Mp4,
    /// Animated GIF.
    Gif,
}

/// Video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// VP9.
    Vp9,
    /// VP8.
    Vp8,
    /// H.264 / AVC.
    H264,
    /// AV1.
    Av1,
    /// GIF LZW frames.
    Gif,
}

/// A container/codec pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncoderProfile {
    /// Container format.
    pub container: Container,
    /// Codec inside the container.
    pub codec: Codec,
}

impl EncoderProfile {
    /// WebM with VP9.
    pub const WEBM_VP9: Self = Self::new(Container::WebM, Codec::Vp9);
    /// WebM with VP8.
    pub const WEBM_VP8: Self = Self::new(Container::WebM, Codec::Vp8);
    /// MP4 with H.264.
    pub const MP4_H264: Self = Self::new(Container::Mp4, Codec::H264);
    /// MP4 with AV1.
    pub const MP4_AV1: Self = Self::new(Container::Mp4, Codec::Av1);
    /// Animated GIF.
    pub const GIF: Self = Self::new(Container::Gif, Codec::Gif);

    /// Create a profile.
    #[must_use]
    pub const fn new(container: Container, codec: Codec) -> Self {
        Self { container, codec }
    }

    /// MIME type including the codec parameter.
    #[must_use]
    pub fn mime(&self) -> &'static str {
        match (self.container, self.codec) {
            (Container::WebM, Codec::Vp8) => "video/webm;codecs=vp8",
            (Container::WebM, Codec::Av1) => "video/webm;codecs=av01",
            (Container::WebM, _) => "video/webm;codecs=vp9",
            (Container::Mp4, Codec::Av1) => "video/mp4;codecs=av01",
            (Container::Mp4, _) => "video/mp4;codecs=avc1",
            (Container::Gif, _) => "image/gif",
        }
    }

    /// File extension without the dot.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.container {
            Container::WebM => "webm",
            Container::Mp4 => "mp4",
            Container::Gif => "gif",
        }
    }
}

/// Requested recording format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingFormat {
    /// Prefer WebM.
    WebM,
    /// Prefer MP4.
    Mp4,
    /// Prefer animated GIF.
    Gif,
}

impl RecordingFormat {
    /// Profiles to try, most preferred first.
    #[must_use]
    pub fn preferences(self) -> &'static [EncoderProfile] {
        use EncoderProfile as P;
        match self {
            Self::WebM => &[P::WEBM_VP9, P::WEBM_VP8, P::MP4_H264, P::GIF],
            Self::Mp4 => &[P::MP4_H264, P::MP4_AV1, P::WEBM_VP9, P::WEBM_VP8, P::GIF],
            Self::Gif => &[P::GIF, P::WEBM_VP9, P::WEBM_VP8, P::MP4_H264],
        }
    }
}

impl std::str::FromStr for RecordingFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webm" => Ok(Self::WebM),
            "mp4" => Ok(Self::Mp4),
            "gif" => Ok(Self::Gif),
            other => Err(ExportError::Capability(format!("unknown recording format: {other}"))),
        }
    }
}

/// Bitrate tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitrateTier {
    /// 1 Mbps.
    Low,
    /// 2.5 Mbps.
    #[default]
    Medium,
    /// 5 Mbps.
    High,
}

impl BitrateTier {
    /// Target bits per second.
    #[must_use]
    pub fn bits_per_second(self) -> u32 {
        match self {
            Self::Low => 1_000_000,
            Self::Medium => 2_500_000,
            Self::High => 5_000_000,
        }
    }
}

impl std::str::FromStr for BitrateTier {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ExportError::Recording(format!("unknown bitrate tier: {other}"))),
        }
    }
}

/// Parameters handed to an encoder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Selected profile.
    pub profile: EncoderProfile,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Bitrate tier.
    pub bitrate: BitrateTier,
}

/// One RGBA video frame (straight alpha, row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrameData {
    /// Width of the frame in pixels.
    pub width: u32,
    /// Height of the frame in pixels.
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel).
    pub data: Vec<u8>,
}

impl VideoFrameData {
    /// Create a frame from RGBA data.
    ///
    /// # Errors
    ///
    /// Returns an error if the data length doesn't match width * height * 4.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> ExportResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(ExportError::Recording(format!(
                "invalid frame data: expected {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Capture a composited surface.
    #[must_use]
    pub fn from_surface(surface: &Surface) -> Self {
        Self {
            width: surface.width(),
            height: surface.height(),
            data: surface.to_rgba(),
        }
    }
}

/// An encoder implementation.
pub trait EncoderBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Whether this backend can produce `profile`.
    fn probe(&self, profile: &EncoderProfile) -> bool;

    /// Open a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder cannot be initialized.
    fn start(&self, options: &EncoderOptions) -> ExportResult<Box<dyn EncoderSession>>;
}

/// An open encoding session. Runs on the encoder task.
pub trait EncoderSession: Send {
    /// Encode one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is rejected.
    fn push_frame(&mut self, frame: VideoFrameData) -> ExportResult<()>;

    /// Flush buffered frames and return the finished container bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if finalization fails.
    fn finish(self: Box<Self>) -> ExportResult<Vec<u8>>;
}

/// Pick the first preferred profile some backend supports.
///
/// # Errors
///
/// Returns [`ExportError::Capability`] if no backend supports any profile
/// in the format's preference list.
pub fn select_encoder(
    backends: &[Arc<dyn EncoderBackend>],
    format: RecordingFormat,
) -> ExportResult<(Arc<dyn EncoderBackend>, EncoderProfile)> {
    let preferences = format.preferences();
    for (rank, profile) in preferences.iter().enumerate() {
        if let Some(backend) = backends.iter().find(|b| b.probe(profile)) {
            if rank > 0 {
                tracing::warn!(
                    requested = ?format,
                    fallback = profile.mime(),
                    backend = backend.name(),
                    "preferred encoder unavailable, falling back"
                );
            }
            return Ok((Arc::clone(backend), *profile));
        }
    }
    Err(ExportError::Capability(format!(
        "none of {} profiles for {format:?} is supported",
        preferences.len()
    )))
}

/// Animated GIF encoder built on the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GifEncoderBackend;

impl EncoderBackend for GifEncoderBackend {
    fn name(&self) -> &str {
        "gif"
    }

    fn probe(&self, profile: &EncoderProfile) -> bool {
        profile.container == Container::Gif
    }

    fn start(&self, options: &EncoderOptions) -> ExportResult<Box<dyn EncoderSession>> {
        if options.fps == 0 {
            return Err(ExportError::Recording("fps must be positive".to_string()));
        }
        // LZW has no bitrate knob: trade palette quality for speed instead.
        let speed = match options.bitrate {
            BitrateTier::Low => 20,
            BitrateTier::Medium => 10,
            BitrateTier::High => 5,
        };
        let buffer = SharedBuffer::default();
        let mut encoder = image::codecs::gif::GifEncoder::new_with_speed(buffer.clone(), speed);
        encoder
            .set_repeat(image::codecs::gif::Repeat::Infinite)
            .map_err(|e| ExportError::Recording(format!("GIF setup failed: {e}")))?;
        Ok(Box::new(GifSession {
            encoder: Some(encoder),
            buffer,
            width: options.width,
            height: options.height,
            delay: image::Delay::from_numer_denom_ms(1000, options.fps),
        }))
    }
}

/// Write target whose bytes stay reachable after the encoder is dropped.
#[derive(Debug, Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct GifSession {
    encoder: Option<image::codecs::gif::GifEncoder<SharedBuffer>>,
    buffer: SharedBuffer,
    width: u32,
    height: u32,
    delay: image::Delay,
}

impl EncoderSession for GifSession {
    fn push_frame(&mut self, frame: VideoFrameData) -> ExportResult<()> {
        if (frame.width, frame.height) != (self.width, self.height) {
            return Err(ExportError::Recording(format!(
                "frame is {}x{}, session is {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.data)
            .ok_or_else(|| ExportError::Recording("frame buffer too small".to_string()))?;
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| ExportError::Recording("session already finished".to_string()))?;
        encoder
            .encode_frame(image::Frame::from_parts(image, 0, 0, self.delay))
            .map_err(|e| ExportError::Recording(format!("GIF frame failed: {e}")))
    }

    fn finish(mut self: Box<Self>) -> ExportResult<Vec<u8>> {
        // Dropping the encoder writes the GIF trailer.
        drop(self.encoder.take());
        Ok(self.buffer.take())
    }
}
