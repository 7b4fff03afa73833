//! Image loading for image elements.
//!
//! Every image source referenced by a scene is loaded to a terminal state
//! ([`ImageState::Ready`] or [`ImageState::Failed`]) before compositing
//! starts. Loads run concurrently through an [`ImageLoader`].

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use futures::future::join_all;

use crate::error::{ExportError, ExportResult};

/// Image encodings that can be embedded in SVG without conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// GIF (first frame is used).
    Gif,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }
        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }
        Self::Unknown
    }

    /// MIME type for data URIs.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png | Self::Unknown => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }
}

/// A decoded-and-verified image, kept in its embeddable encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// Encoded bytes in `format`.
    pub bytes: Vec<u8>,
    /// Encoding of `bytes`.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl LoadedImage {
    /// Verify that `bytes` decode as an image.
    ///
    /// Encodings that cannot be embedded directly are re-encoded as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Resource`] if the bytes are not a decodable image.
    pub fn decode(bytes: Vec<u8>) -> ExportResult<Self> {
        let img = image::load_from_memory(&bytes)
            .map_err(|e| ExportError::Resource(format!("Failed to decode image: {e}")))?;
        let (width, height) = (img.width(), img.height());

        let format = ImageFormat::from_magic_bytes(&bytes);
        if format != ImageFormat::Unknown {
            return Ok(Self {
                bytes,
                format,
                width,
                height,
            });
        }

        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| ExportError::Resource(format!("Failed to re-encode image: {e}")))?;
        Ok(Self {
            bytes: png.into_inner(),
            format: ImageFormat::Png,
            width,
            height,
        })
    }

    /// The image as a base64 `data:` URI.
    #[must_use]
    pub fn data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{encoded}", self.format.mime())
    }
}

/// Decode the payload of a `data:` URI.
///
/// Supports base64 (`data:image/png;base64,...`) and percent-encoded payloads.
///
/// # Errors
///
/// Returns [`ExportError::Resource`] if the URI is malformed.
pub fn parse_data_uri(uri: &str) -> ExportResult<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ExportError::Resource("Not a data URI".to_string()))?;
    let (metadata, payload) = rest
        .split_once(',')
        .ok_or_else(|| ExportError::Resource("Invalid data URI: missing comma".to_string()))?;

    if metadata.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ExportError::Resource(format!("Failed to decode base64: {e}")))
    } else {
        percent_decode(payload)
    }
}

fn percent_decode(input: &str) -> ExportResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| ExportError::Resource("Invalid URL encoding".to_string()))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Asynchronous image source.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Load and verify the image behind `src`.
    async fn load(&self, src: &str) -> ExportResult<LoadedImage>;
}

/// Loads base64 or percent-encoded `data:` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUriImageLoader;

#[async_trait]
impl ImageLoader for DataUriImageLoader {
    async fn load(&self, src: &str) -> ExportResult<LoadedImage> {
        LoadedImage::decode(parse_data_uri(src)?)
    }
}

/// Loads images from the local file system.
#[derive(Debug, Clone, Default)]
pub struct FileImageLoader {
    base_dir: Option<PathBuf>,
}

impl FileImageLoader {
    /// Resolve relative paths against `base_dir`.
    #[must_use]
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    fn resolve(&self, src: &str) -> PathBuf {
        let path = PathBuf::from(src.strip_prefix("file://").unwrap_or(src));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl ImageLoader for FileImageLoader {
    async fn load(&self, src: &str) -> ExportResult<LoadedImage> {
        let path = self.resolve(src);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ExportError::Resource(format!("{}: {e}", path.display())))?;
        LoadedImage::decode(bytes)
    }
}

/// Dispatches `data:` URIs and file paths to the matching loader.
#[derive(Debug, Clone, Default)]
pub struct CompositeImageLoader {
    data: DataUriImageLoader,
    files: FileImageLoader,
}

impl CompositeImageLoader {
    /// Create a loader resolving relative file paths against `base_dir`.
    #[must_use]
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self {
            data: DataUriImageLoader,
            files: FileImageLoader::new(base_dir),
        }
    }
}

#[async_trait]
impl ImageLoader for CompositeImageLoader {
    async fn load(&self, src: &str) -> ExportResult<LoadedImage> {
        if src.starts_with("data:") {
            self.data.load(src).await
        } else {
            self.files.load(src).await
        }
    }
}

/// Terminal state of one image load.
#[derive(Debug, Clone)]
pub enum ImageState {
    /// Loaded and verified.
    Ready(Arc<LoadedImage>),
    /// Loading failed with the given cause.
    Failed(String),
}

/// Load results keyed by source string.
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    entries: HashMap<String, ImageState>,
}

impl ImageStore {
    /// State of a source, if it was requested.
    #[must_use]
    pub fn get(&self, src: &str) -> Option<&ImageState> {
        self.entries.get(src)
    }

    /// The loaded image for `src`, if loading succeeded.
    #[must_use]
    pub fn ready(&self, src: &str) -> Option<&LoadedImage> {
        match self.entries.get(src) {
            Some(ImageState::Ready(image)) => Some(image),
            _ => None,
        }
    }

    /// Record a state directly.
    pub fn insert(&mut self, src: impl Into<String>, state: ImageState) {
        self.entries.insert(src.into(), state);
    }

    /// Number of tracked sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no source is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load every distinct source concurrently and wait for all of them.
pub async fn resolve_images<'a, I>(loader: &dyn ImageLoader, sources: I) -> ImageStore
where
    I: IntoIterator<Item = &'a str>,
{
    let mut unique: Vec<&str> = Vec::new();
    for src in sources {
        if !unique.contains(&src) {
            unique.push(src);
        }
    }

    let results = join_all(unique.iter().map(|src| loader.load(src))).await;

    let mut store = ImageStore::default();
    for (src, result) in unique.into_iter().zip(results) {
        let state = match result {
            Ok(image) => ImageState::Ready(Arc::new(image)),
            Err(e) => {
                tracing::warn!(%src, error = %e, "image failed to load");
                ImageState::Failed(e.to_string())
            }
        };
        store.insert(src, state);
    }
    store
}
