//! Scene export to image/document formats.
//!
//! Export happens in two steps. [`SceneExporter::prepare`] snapshots the
//! scene and loads every image to a terminal state; [`SceneExporter::composite`]
//! then draws one deterministic frame. Static exports use the final
//! animation state; recordings composite many frames from one preparation.

use std::sync::Arc;

use image::ImageEncoder;
use serde::{Deserialize, Serialize};
use studio_core::{Element, Paint, Scene};

use crate::drawer::{ElementDrawer, Surface, SvgElementDrawer};
use crate::error::{ExportError, ExportResult, ExportWarning};
use crate::image::{resolve_images, CompositeImageLoader, ImageLoader, ImageState, ImageStore};
use crate::sink::ArtifactSink;
use crate::svg::SvgBuilder;

/// Millimetres per CSS pixel at 96 DPI.
pub const MM_PER_PX: f64 = 0.264_583;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
    /// SVG vector graphics (UTF-8 XML).
    Svg,
    /// PDF document with one embedded full-page raster.
    Pdf,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
            Self::Pdf => "application/pdf",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            other => Err(ExportError::Export(format!("unknown export format: {other}"))),
        }
    }
}

/// Configuration for scene export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Pixels per canvas unit (e.g. 2.0 for retina).
    pub scale: f64,
    /// JPEG quality 1-100.
    pub jpeg_quality: u8,
    /// Replaces the canvas background when set.
    pub background: Option<Paint>,
    /// Load system fonts so text renders in raster output.
    pub load_system_fonts: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            jpeg_quality: 85,
            background: None,
            load_system_fonts: false,
        }
    }
}

/// Point in time to composite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameTime {
    /// Every animation at its end state.
    Final,
    /// Seconds since the start of a recording.
    Elapsed(f64),
}

impl FrameTime {
    /// Animation progress in seconds for an element at this time.
    #[must_use]
    pub fn progress_for(self, element: &Element) -> f64 {
        match (self, &element.animation) {
            (_, None) => 0.0,
            (Self::Final, Some(animation)) => animation.duration_secs.max(0.0),
            (Self::Elapsed(secs), Some(animation)) => animation.progress_at(secs),
        }
    }
}

/// A scene snapshot with its images loaded.
#[derive(Debug, Clone)]
pub struct PreparedScene {
    scene: Scene,
    images: Arc<ImageStore>,
    warnings: Vec<ExportWarning>,
}

impl PreparedScene {
    /// The snapshot.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Image load results.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Resource warnings from image loading.
    #[must_use]
    pub fn warnings(&self) -> &[ExportWarning] {
        &self.warnings
    }
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    /// Output format.
    pub format: ExportFormat,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// Elements that were skipped, with causes.
    pub warnings: Vec<ExportWarning>,
}

impl ExportArtifact {
    /// Suggested file name for `stem`.
    #[must_use]
    pub fn filename(&self, stem: &str) -> String {
        format!("{stem}.{}", self.format.extension())
    }
}

/// Exports a [`Scene`] to image and document formats.
#[derive(Clone)]
pub struct SceneExporter {
    config: ExportConfig,
    loader: Arc<dyn ImageLoader>,
    drawer: Arc<dyn ElementDrawer>,
}

impl std::fmt::Debug for SceneExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneExporter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SceneExporter {
    /// Create an exporter with the built-in loader and drawer.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        let drawer = SvgElementDrawer::new(config.load_system_fonts);
        Self {
            config,
            loader: Arc::new(CompositeImageLoader::default()),
            drawer: Arc::new(drawer),
        }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportConfig::default())
    }

    /// Replace the image loader.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the element drawer.
    #[must_use]
    pub fn with_drawer(mut self, drawer: Arc<dyn ElementDrawer>) -> Self {
        self.drawer = drawer;
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export a scene to the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if no surface can be allocated or encoding fails.
    /// Elements that fail to load or draw are skipped and reported in
    /// [`ExportArtifact::warnings`].
    pub async fn export_as(&self, scene: &Scene, format: ExportFormat) -> ExportResult<ExportArtifact> {
        let prepared = self.prepare(scene).await;
        let mut warnings = prepared.warnings.clone();

        let bytes = match format {
            ExportFormat::Svg => self.render_svg(&prepared).into_bytes(),
            ExportFormat::Png => {
                let surface = self.composite_into(&prepared, FrameTime::Final, &mut warnings)?;
                surface.encode_png()?
            }
            ExportFormat::Jpeg => {
                let surface = self.composite_into(&prepared, FrameTime::Final, &mut warnings)?;
                self.encode_jpeg(&surface)?
            }
            ExportFormat::Pdf => {
                let surface = self.composite_into(&prepared, FrameTime::Final, &mut warnings)?;
                Self::encode_pdf(&surface)?
            }
        };

        tracing::info!(
            format = format.extension(),
            bytes = bytes.len(),
            warnings = warnings.len(),
            "scene exported"
        );
        Ok(ExportArtifact {
            format,
            bytes,
            warnings,
        })
    }

    /// Export and hand the artifact to a sink as `{stem}.{ext}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the export or the sink fails.
    pub async fn export_to(
        &self,
        scene: &Scene,
        format: ExportFormat,
        sink: &dyn ArtifactSink,
        stem: &str,
    ) -> ExportResult<ExportArtifact> {
        let artifact = self.export_as(scene, format).await?;
        sink.save(&artifact.bytes, &artifact.filename(stem)).await?;
        Ok(artifact)
    }

    /// Snapshot the scene and load all of its images.
    pub async fn prepare(&self, scene: &Scene) -> PreparedScene {
        let sources = scene
            .elements()
            .filter(|e| e.visible)
            .filter_map(Element::image_src);
        let images = resolve_images(self.loader.as_ref(), sources).await;

        let warnings = scene
            .paint_order()
            .into_iter()
            .filter(|e| e.visible)
            .filter_map(|e| match images.get(e.image_src()?) {
                Some(ImageState::Failed(cause)) => Some(ExportWarning::resource(e.id, cause.clone())),
                _ => None,
            })
            .collect();

        PreparedScene {
            scene: scene.clone(),
            images: Arc::new(images),
            warnings,
        }
    }

    /// Draw one frame of a prepared scene.
    ///
    /// Returns the surface and the draw warnings of this frame.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NoSurface`] if the surface cannot be allocated.
    pub fn composite(
        &self,
        prepared: &PreparedScene,
        time: FrameTime,
    ) -> ExportResult<(Surface, Vec<ExportWarning>)> {
        let mut warnings = Vec::new();
        let surface = self.composite_into(prepared, time, &mut warnings)?;
        Ok((surface, warnings))
    }

    fn composite_into(
        &self,
        prepared: &PreparedScene,
        time: FrameTime,
        warnings: &mut Vec<ExportWarning>,
    ) -> ExportResult<Surface> {
        let scene = &prepared.scene;
        let mut surface = Surface::new(
            scene.canvas.width,
            scene.canvas.height,
            self.config.scale,
            Arc::clone(&prepared.images),
        )?;

        let background = self.config.background.as_ref().unwrap_or(&scene.canvas.background);
        if let Err(e) = surface.fill_background(background) {
            tracing::warn!(error = %e, "background skipped");
        }

        for (paint_index, element) in scene.paint_order().into_iter().filter(|e| e.visible).enumerate() {
            if let Some(src) = element.image_src() {
                // Failed loads were reported once by prepare().
                if prepared.images.ready(src).is_none() {
                    continue;
                }
            }
            let progress = time.progress_for(element);
            if let Err(e) = self.drawer.draw(&mut surface, element, progress, paint_index) {
                tracing::warn!(element = %element.id, error = %e, "element skipped");
                warnings.push(ExportWarning::draw(element.id, e.to_string()));
            }
        }
        Ok(surface)
    }

    /// Build the SVG document for a prepared scene.
    #[must_use]
    pub fn render_svg(&self, prepared: &PreparedScene) -> String {
        let scene = &prepared.scene;
        let (width, height) = (scene.canvas.width, scene.canvas.height);
        let mut builder = SvgBuilder::new();
        let background = self.config.background.as_ref().unwrap_or(&scene.canvas.background);
        builder.background(background, width, height);

        for element in scene.paint_order().into_iter().filter(|e| e.visible) {
            let element = match &element.animation {
                Some(animation) => animation.sample(element, FrameTime::Final.progress_for(element)),
                None => element.clone(),
            };
            builder.element(&element, &prepared.images);
        }
        builder.finish(width, height, self.config.scale)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn encode_jpeg(&self, surface: &Surface) -> ExportResult<Vec<u8>> {
        let (width, height) = (surface.width(), surface.height());
        // JPEG has no alpha: flatten onto white.
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for pixel in surface.to_rgba().chunks_exact(4) {
            let alpha = f32::from(pixel[3]) / 255.0;
            let inv = (1.0 - alpha) * 255.0;
            for channel in &pixel[..3] {
                rgb.push(f32::from(*channel).mul_add(alpha, inv).round() as u8);
            }
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut buf,
            self.config.jpeg_quality.clamp(1, 100),
        );
        encoder
            .write_image(&rgb, width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| ExportError::Export(format!("JPEG encoding failed: {e}")))?;
        Ok(buf.into_inner())
    }

    /// One page sized canvas units × 0.264583 mm. The raster is placed at
    /// 96 DPI × scale so it fills the page at any export scale.
    #[allow(clippy::cast_possible_truncation)]
    fn encode_pdf(surface: &Surface) -> ExportResult<Vec<u8>> {
        let png = surface.encode_png()?;
        let (canvas_w, canvas_h) = surface.canvas_size();
        let page_w = (canvas_w * MM_PER_PX) as f32;
        let page_h = (canvas_h * MM_PER_PX) as f32;

        let (doc, page, layer) = printpdf::PdfDocument::new(
            "Studio Export",
            printpdf::Mm(page_w),
            printpdf::Mm(page_h),
            "Layer 1",
        );
        let current_layer = doc.get_page(page).get_layer(layer);

        let decoded = printpdf::image_crate::load_from_memory(&png)
            .map_err(|e| ExportError::Export(format!("Failed to decode PNG for PDF: {e}")))?;
        let pdf_image = printpdf::Image::from_dynamic_image(&decoded);
        pdf_image.add_to_layer(
            current_layer,
            printpdf::ImageTransform {
                translate_x: Some(printpdf::Mm(0.0)),
                translate_y: Some(printpdf::Mm(0.0)),
                dpi: Some((96.0 * surface.scale()) as f32),
                ..Default::default()
            },
        );

        doc.save_to_bytes()
            .map_err(|e| ExportError::Export(format!("PDF save failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::{Animation, AnimationKind, Geometry, ShapeKind};

    fn rect(x: f64, y: f64, color: &str) -> Element {
        Element::shape(ShapeKind::Rectangle)
            .with_geometry(Geometry::new(x, y, 20.0, 20.0))
            .with_fill(Paint::solid(color))
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::Jpeg.extension(), "jpg");
        assert_eq!(ExportFormat::Svg.mime(), "image/svg+xml");
        assert_eq!("JPEG".parse::<ExportFormat>().expect("parse"), ExportFormat::Jpeg);
        assert!("bmp".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_config_fills_defaults() {
        let config: ExportConfig = serde_json::from_str(r#"{"scale":2.0}"#).expect("config");
        assert!((config.scale - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.jpeg_quality, 85);
        assert!(config.background.is_none());
    }

    #[test]
    fn test_final_time_uses_full_duration() {
        let element = rect(0.0, 0.0, "#000").with_animation(Animation::new(AnimationKind::FadeIn, 2.0));
        assert!((FrameTime::Final.progress_for(&element) - 2.0).abs() < f64::EPSILON);
        assert!((FrameTime::Elapsed(3.0).progress_for(&element) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_svg_export_empty_scene() {
        let scene = Scene::new(800.0, 600.0);
        let artifact = SceneExporter::with_defaults()
            .export_as(&scene, ExportFormat::Svg)
            .await
            .expect("svg export");
        let svg = String::from_utf8(artifact.bytes).expect("utf8");
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("width=\"800\""));
        assert!(svg.contains("fill=\"#ffffff\""));
    }

    #[tokio::test]
    async fn test_hidden_elements_are_skipped() {
        let mut scene = Scene::new(100.0, 100.0);
        let mut hidden = rect(0.0, 0.0, "#abcdef");
        hidden.visible = false;
        scene.add_element(hidden);
        let artifact = SceneExporter::with_defaults()
            .export_as(&scene, ExportFormat::Svg)
            .await
            .expect("svg");
        assert!(!String::from_utf8(artifact.bytes).expect("utf8").contains("#abcdef"));
    }

    #[tokio::test]
    async fn test_png_paint_order() {
        let mut scene = Scene::new(40.0, 40.0);
        scene.add_element(rect(0.0, 0.0, "#ff0000"));
        scene.add_element(rect(10.0, 10.0, "#0000ff"));

        let exporter = SceneExporter::with_defaults();
        let prepared = exporter.prepare(&scene).await;
        let (surface, warnings) = exporter.composite(&prepared, FrameTime::Final).expect("composite");
        assert!(warnings.is_empty());

        let rgba = surface.to_rgba();
        let at = |x: u32, y: u32| {
            let i = ((y * surface.width() + x) * 4) as usize;
            [rgba[i], rgba[i + 1], rgba[i + 2]]
        };
        assert_eq!(at(5, 5), [255, 0, 0]);
        assert_eq!(at(15, 15), [0, 0, 255]);
        assert_eq!(at(35, 35), [255, 255, 255]);
    }

    #[tokio::test]
    async fn test_jpeg_and_pdf_headers() {
        let mut scene = Scene::new(50.0, 50.0);
        scene.add_element(rect(5.0, 5.0, "#00ff00"));
        let exporter = SceneExporter::with_defaults();

        let jpeg = exporter.export_as(&scene, ExportFormat::Jpeg).await.expect("jpeg");
        assert_eq!(&jpeg.bytes[0..2], &[0xFF, 0xD8]);

        let pdf = exporter.export_as(&scene, ExportFormat::Pdf).await.expect("pdf");
        assert_eq!(&pdf.bytes[0..5], b"%PDF-");
    }

    /// Width and height in points from the first `/MediaBox` entry.
    fn media_box(pdf: &[u8]) -> (f64, f64) {
        let text = String::from_utf8_lossy(pdf);
        let start = text.find("/MediaBox").expect("media box");
        let rest = &text[start..];
        let open = rest.find('[').expect("open bracket");
        let close = rest.find(']').expect("close bracket");
        let values: Vec<f64> = rest[open + 1..close]
            .split_whitespace()
            .map(|v| v.parse().expect("number"))
            .collect();
        (values[2] - values[0], values[3] - values[1])
    }

    #[tokio::test]
    async fn test_pdf_page_ignores_scale() {
        let mut scene = Scene::new(1000.0, 1000.0);
        scene.add_element(rect(5.0, 5.0, "#00ff00"));
        let exporter = SceneExporter::new(ExportConfig {
            scale: 2.0,
            ..ExportConfig::default()
        });

        let pdf = exporter.export_as(&scene, ExportFormat::Pdf).await.expect("pdf");
        let (w, h) = media_box(&pdf.bytes);
        // 1000 × 0.264583 mm = 264.583 mm = 750 pt.
        let expected = 1000.0 * MM_PER_PX * 72.0 / 25.4;
        assert!((w - expected).abs() < 0.5, "page width {w}pt");
        assert!((h - expected).abs() < 0.5, "page height {h}pt");
    }

    #[tokio::test]
    async fn test_zero_canvas_is_no_surface() {
        let scene = Scene::new(0.0, 0.0);
        let result = SceneExporter::with_defaults().export_as(&scene, ExportFormat::Png).await;
        assert!(matches!(result, Err(ExportError::NoSurface(_))));
    }
}
