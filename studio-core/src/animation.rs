//! Animation tags and sampling.
//!
//! An [`Animation`] is attached to an element and sampled by the export
//! pipeline when recording. The drawer receives the animation progress in
//! seconds (`elapsed mod duration`) and calls [`Animation::sample`] to obtain
//! the element as it looks at that instant.

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::transform::normalize_degrees;

/// Kind of animation effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationKind {
    /// Opacity ramps from 0 to the element opacity.
    FadeIn,
    /// Slides in from one element width to the left.
    SlideInLeft,
    /// Slides up from one element height below.
    SlideInUp,
    /// Grows from the center.
    ZoomIn,
    /// Full clockwise turn per cycle.
    Spin,
    /// Gentle scale oscillation around the center.
    Pulse,
}

/// An animation tag on an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    /// Effect to apply.
    pub kind: AnimationKind,
    /// Cycle length in seconds.
    pub duration_secs: f64,
}

/// Peak scale delta of the pulse effect.
const PULSE_AMPLITUDE: f64 = 0.1;

/// Smallest scale used by zoom-in, so geometry never collapses to zero.
const MIN_ZOOM_SCALE: f64 = 0.01;

impl Animation {
    /// Create an animation.
    #[must_use]
    pub fn new(kind: AnimationKind, duration_secs: f64) -> Self {
        Self {
            kind,
            duration_secs,
        }
    }

    /// Progress in seconds at `elapsed_secs`: `elapsed mod duration`.
    ///
    /// Non-positive durations always report zero progress.
    #[must_use]
    pub fn progress_at(&self, elapsed_secs: f64) -> f64 {
        if self.duration_secs <= 0.0 || !elapsed_secs.is_finite() {
            return 0.0;
        }
        elapsed_secs.rem_euclid(self.duration_secs)
    }

    /// Fraction of the cycle completed at `progress_secs`, in `0.0..=1.0`.
    #[must_use]
    pub fn fraction(&self, progress_secs: f64) -> f64 {
        if self.duration_secs <= 0.0 {
            return 1.0;
        }
        (progress_secs / self.duration_secs).clamp(0.0, 1.0)
    }

    /// The element as drawn at `progress_secs` into the cycle.
    #[must_use]
    pub fn sample(&self, element: &Element, progress_secs: f64) -> Element {
        let t = self.fraction(progress_secs);
        let mut out = element.clone();
        let g = &mut out.geometry;
        match self.kind {
            AnimationKind::FadeIn => out.opacity *= t,
            AnimationKind::SlideInLeft => g.x -= g.width * (1.0 - t),
            AnimationKind::SlideInUp => g.y += g.height * (1.0 - t),
            AnimationKind::ZoomIn => scale_about_center(g, t.max(MIN_ZOOM_SCALE)),
            AnimationKind::Spin => g.rotation = normalize_degrees(g.rotation + 360.0 * t),
            AnimationKind::Pulse => {
                let scale = PULSE_AMPLITUDE.mul_add((std::f64::consts::TAU * t).sin(), 1.0);
                scale_about_center(g, scale);
            }
        }
        out
    }
}

fn scale_about_center(g: &mut crate::element::Geometry, scale: f64) {
    let center = g.center();
    g.width *= scale;
    g.height *= scale;
    g.x = center.x - g.width / 2.0;
    g.y = center.y - g.height / 2.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Geometry, ShapeKind};

    fn rect() -> Element {
        Element::shape(ShapeKind::Rectangle).with_geometry(Geometry::new(100.0, 100.0, 50.0, 40.0))
    }

    #[test]
    fn test_progress_wraps_modulo_duration() {
        let anim = Animation::new(AnimationKind::FadeIn, 2.0);
        assert!((anim.progress_at(0.5) - 0.5).abs() < 1e-9);
        assert!((anim.progress_at(5.0) - 1.0).abs() < 1e-9);
        assert!(anim.progress_at(4.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_is_static() {
        let anim = Animation::new(AnimationKind::SlideInLeft, 0.0);
        assert!(anim.progress_at(3.0).abs() < f64::EPSILON);
        let sampled = anim.sample(&rect(), 0.0);
        assert_eq!(sampled.geometry, rect().geometry);
    }

    #[test]
    fn test_fade_in_midpoint() {
        let anim = Animation::new(AnimationKind::FadeIn, 1.0);
        let sampled = anim.sample(&rect(), 0.5);
        assert!((sampled.opacity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_slide_in_left_starts_offset() {
        let anim = Animation::new(AnimationKind::SlideInLeft, 1.0);
        let start = anim.sample(&rect(), 0.0);
        assert!((start.geometry.x - 50.0).abs() < 1e-9);
        let end = anim.sample(&rect(), 1.0);
        assert!((end.geometry.x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_keeps_center() {
        let anim = Animation::new(AnimationKind::ZoomIn, 1.0);
        let sampled = anim.sample(&rect(), 0.5);
        assert_eq!(sampled.geometry.center(), rect().geometry.center());
        assert!((sampled.geometry.width - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_spin_stays_normalized() {
        let anim = Animation::new(AnimationKind::Spin, 1.0);
        let sampled = anim.sample(&rect(), 1.0);
        assert!(sampled.geometry.rotation >= 0.0 && sampled.geometry.rotation < 360.0);
    }
}
