//! Raster surface and per-element drawing.

use std::sync::Arc;

use studio_core::{Element, Paint};

use crate::error::{ExportError, ExportResult};
use crate::image::ImageStore;
use crate::svg::SvgBuilder;

/// An off-screen RGBA surface sized to canvas × scale.
pub struct Surface {
    pixmap: tiny_skia::Pixmap,
    canvas_width: f64,
    canvas_height: f64,
    scale: f64,
    images: Arc<ImageStore>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl Surface {
    /// Allocate a transparent surface.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NoSurface`] if the dimensions are zero,
    /// non-finite, or too large to allocate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(
        canvas_width: f64,
        canvas_height: f64,
        scale: f64,
        images: Arc<ImageStore>,
    ) -> ExportResult<Self> {
        let px_w = (canvas_width * scale).round();
        let px_h = (canvas_height * scale).round();
        if !(px_w.is_finite() && px_h.is_finite()) || px_w < 1.0 || px_h < 1.0 {
            return Err(ExportError::NoSurface(format!(
                "invalid surface size {px_w}x{px_h}"
            )));
        }
        let pixmap = tiny_skia::Pixmap::new(px_w as u32, px_h as u32).ok_or_else(|| {
            ExportError::NoSurface(format!("cannot allocate {px_w}x{px_h} pixmap"))
        })?;
        Ok(Self {
            pixmap,
            canvas_width,
            canvas_height,
            scale,
            images,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Canvas size in canvas units.
    #[must_use]
    pub fn canvas_size(&self) -> (f64, f64) {
        (self.canvas_width, self.canvas_height)
    }

    /// Pixels per canvas unit.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Loaded images available to drawers.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Mutable access to the backing pixmap.
    pub fn pixmap_mut(&mut self) -> &mut tiny_skia::Pixmap {
        &mut self.pixmap
    }

    /// Premultiplied RGBA pixel data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Fill the surface with a background paint.
    ///
    /// # Errors
    ///
    /// Returns an error if the background cannot be rendered.
    pub fn fill_background(&mut self, paint: &Paint) -> ExportResult<()> {
        if matches!(paint, Paint::None) {
            return Ok(());
        }
        let mut builder = SvgBuilder::new();
        builder.background(paint, self.canvas_width, self.canvas_height);
        let svg = builder.finish(self.canvas_width, self.canvas_height, 1.0);
        self.render_svg(&svg, &usvg::Options::default())
    }

    /// Parse an SVG document in canvas units and composite it onto the surface.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Draw`] if the SVG cannot be parsed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn render_svg(&mut self, svg: &str, options: &usvg::Options<'_>) -> ExportResult<()> {
        let tree = usvg::Tree::from_str(svg, options)
            .map_err(|e| ExportError::Draw(format!("SVG parsing failed: {e}")))?;
        let scale = self.scale as f32;
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut self.pixmap.as_mut(),
        );
        Ok(())
    }

    /// Encode the surface as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Export`] if encoding fails.
    pub fn encode_png(&self) -> ExportResult<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| ExportError::Export(format!("PNG encoding failed: {e}")))
    }

    /// Straight-alpha RGBA copy of the surface.
    #[must_use]
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }
}

/// Draws one element onto a surface.
pub trait ElementDrawer: Send + Sync {
    /// Draw `element` as it looks `progress` seconds into its animation.
    ///
    /// `paint_index` is the element's position in paint order.
    ///
    /// # Errors
    ///
    /// A failure skips only this element; the export records a warning.
    fn draw(
        &self,
        surface: &mut Surface,
        element: &Element,
        progress: f64,
        paint_index: usize,
    ) -> ExportResult<()>;
}

/// Default drawer: renders each element as a standalone SVG with resvg.
#[derive(Debug, Clone, Default)]
pub struct SvgElementDrawer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl SvgElementDrawer {
    /// Create a drawer, optionally loading the system fonts for text.
    #[must_use]
    pub fn new(load_system_fonts: bool) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        if load_system_fonts {
            fontdb.load_system_fonts();
            tracing::debug!(faces = fontdb.len(), "loaded system fonts");
        }
        Self {
            fontdb: Arc::new(fontdb),
        }
    }

    fn options(&self) -> usvg::Options<'static> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        options
    }
}

impl ElementDrawer for SvgElementDrawer {
    fn draw(
        &self,
        surface: &mut Surface,
        element: &Element,
        progress: f64,
        _paint_index: usize,
    ) -> ExportResult<()> {
        if element.is_group() {
            return Ok(());
        }
        let sampled;
        let element = match &element.animation {
            Some(animation) => {
                sampled = animation.sample(element, progress);
                &sampled
            }
            None => element,
        };

        let (width, height) = surface.canvas_size();
        let mut builder = SvgBuilder::new();
        if !builder.element(element, surface.images()) {
            return Err(ExportError::Resource(format!(
                "image not loaded for element {}",
                element.id
            )));
        }
        let svg = builder.finish(width, height, 1.0);
        surface.render_svg(&svg, &self.options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::{Geometry, ShapeKind};

    fn surface(w: f64, h: f64) -> Surface {
        Surface::new(w, h, 1.0, Arc::new(ImageStore::default())).expect("surface")
    }

    fn pixel(surface: &Surface, x: u32, y: u32) -> [u8; 4] {
        let rgba = surface.to_rgba();
        let i = ((y * surface.width() + x) * 4) as usize;
        [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
    }

    #[test]
    fn test_zero_size_is_no_surface() {
        let err = Surface::new(0.0, 10.0, 1.0, Arc::new(ImageStore::default()));
        assert!(matches!(err, Err(ExportError::NoSurface(_))));
    }

    #[test]
    fn test_scale_sets_pixel_size() {
        let s = Surface::new(100.0, 50.0, 2.0, Arc::new(ImageStore::default())).expect("surface");
        assert_eq!((s.width(), s.height()), (200, 100));
    }

    #[test]
    fn test_background_fill() {
        let mut s = surface(10.0, 10.0);
        s.fill_background(&Paint::solid("#ff0000")).expect("fill");
        assert_eq!(pixel(&s, 5, 5), [255, 0, 0, 255]);
    }

    #[test]
    fn test_svg_drawer_paints_shape() {
        let mut s = surface(20.0, 20.0);
        let rect = Element::shape(ShapeKind::Rectangle)
            .with_geometry(Geometry::new(0.0, 0.0, 10.0, 10.0))
            .with_fill(Paint::solid("#0000ff"));
        SvgElementDrawer::default()
            .draw(&mut s, &rect, 0.0, 0)
            .expect("draw");
        assert_eq!(pixel(&s, 5, 5), [0, 0, 255, 255]);
        assert_eq!(pixel(&s, 15, 15)[3], 0);
    }

    #[test]
    fn test_unloaded_image_is_resource_error() {
        let mut s = surface(20.0, 20.0);
        let image = Element::image("nowhere.png");
        let result = SvgElementDrawer::default().draw(&mut s, &image, 0.0, 0);
        assert!(matches!(result, Err(ExportError::Resource(_))));
    }
}
