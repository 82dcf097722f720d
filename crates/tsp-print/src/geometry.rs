// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print geometry: maps the pan/zoom state of the preview viewport onto a
// print canvas.
//
// The preview shows the image fitted to the viewport, then zoomed by the
// user's scale and shifted by the pan offset. Whatever part of the image is
// visible in the viewport is what gets printed, at the same relative place
// on the canvas.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use tsp_core::error::{Result, TspError};
use tsp_core::{IntRect, PixelSize, PrintType, RectF};

/// Smallest user zoom factor.
pub const MIN_SCALE: f32 = 0.5;
/// Largest user zoom factor.
pub const MAX_SCALE: f32 = 5.0;

/// Tolerance applied before flooring/ceiling source edges so float noise
/// does not grow the rectangle by a whole pixel.
const EDGE_EPSILON: f32 = 1e-3;

/// Size of the on-screen preview area, in display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl ViewportSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Pan offset of the image centre from the viewport centre.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pan {
    pub x: f32,
    pub y: f32,
}

impl Pan {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Where the visible part of the source lands on the print canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositioningInfo {
    /// Visible region of the source, in source pixels.
    pub source_rect: IntRect,
    /// Target region on the full print canvas, in canvas pixels.
    pub destination_rect: RectF,
}

/// Clamp a user zoom factor. Non-finite input resets to 1.
pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_finite() {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        1.0
    }
}

fn fit_scale(image: PixelSize, viewport: ViewportSize) -> f32 {
    (viewport.width / image.width as f32).min(viewport.height / image.height as f32)
}

/// Compute the source/destination rectangle pair for the current view.
///
/// Fails with `NothingVisible` when the image has been panned entirely out
/// of the viewport, and with `DegenerateGeometry` when any input or result
/// has no area.
#[instrument(level = "debug", skip_all, fields(
    image_w = image.width,
    image_h = image.height,
    scale = scale,
))]
pub fn compute_positioning(
    image: PixelSize,
    viewport: ViewportSize,
    scale: f32,
    pan: Pan,
    target: PixelSize,
) -> Result<PositioningInfo> {
    if image.is_empty() {
        return Err(TspError::DegenerateGeometry("source image has no pixels".into()));
    }
    if !viewport.is_usable() {
        return Err(TspError::DegenerateGeometry(format!(
            "viewport {}x{} has no area",
            viewport.width, viewport.height
        )));
    }
    if target.is_empty() {
        return Err(TspError::DegenerateGeometry("print canvas has no pixels".into()));
    }
    if !(pan.x.is_finite() && pan.y.is_finite()) {
        return Err(TspError::DegenerateGeometry("pan offset is not finite".into()));
    }

    let total = fit_scale(image, viewport) * clamp_scale(scale);
    let scaled_w = image.width as f32 * total;
    let scaled_h = image.height as f32 * total;
    let left = viewport.width / 2.0 + pan.x - scaled_w / 2.0;
    let top = viewport.height / 2.0 + pan.y - scaled_h / 2.0;
    let bounds = RectF::new(left, top, left + scaled_w, top + scaled_h);
    let view = RectF::from_size(viewport.width, viewport.height);

    let visible = bounds.intersect(&view).ok_or(TspError::NothingVisible)?;

    // Back into source pixels.
    let to_source = |v: f32, origin: f32| (v - origin) / total;
    let src_left = (to_source(visible.left, left) + EDGE_EPSILON).floor().max(0.0) as u32;
    let src_top = (to_source(visible.top, top) + EDGE_EPSILON).floor().max(0.0) as u32;
    let src_right = ((to_source(visible.right, left) - EDGE_EPSILON).ceil().max(0.0) as u32).min(image.width);
    let src_bottom = ((to_source(visible.bottom, top) - EDGE_EPSILON).ceil().max(0.0) as u32).min(image.height);
    if src_right <= src_left || src_bottom <= src_top {
        return Err(TspError::DegenerateGeometry("visible source region is empty".into()));
    }
    let source_rect = IntRect::new(src_left, src_top, src_right - src_left, src_bottom - src_top);

    // Same fractional placement on the canvas.
    let tw = target.width as f32;
    let th = target.height as f32;
    let destination_rect = RectF::new(
        visible.left / viewport.width * tw,
        visible.top / viewport.height * th,
        visible.right / viewport.width * tw,
        visible.bottom / viewport.height * th,
    );
    if destination_rect.width().round() < 1.0 || destination_rect.height().round() < 1.0 {
        return Err(TspError::DegenerateGeometry("destination region is under one pixel".into()));
    }

    debug!(?source_rect, ?destination_rect, "Positioning computed");
    Ok(PositioningInfo {
        source_rect,
        destination_rect,
    })
}

/// Interactive pinch/pan state of the print preview.
///
/// Zoom is clamped to [`MIN_SCALE`, `MAX_SCALE`]. Pan is clamped so an image
/// larger than the viewport cannot be dragged past its own edge, and an image
/// that fits cannot be dragged at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    scale: f32,
    pan: Pan,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan: Pan::default(),
        }
    }
}

impl ViewTransform {
    pub fn new(scale: f32, pan: Pan) -> Self {
        Self {
            scale: clamp_scale(scale),
            pan,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pan(&self) -> Pan {
        self.pan
    }

    /// Apply one gesture frame: multiply the zoom by `zoom`, then move by `delta`.
    pub fn apply_gesture(&mut self, zoom: f32, delta: Pan, image: PixelSize, viewport: ViewportSize) {
        self.scale = clamp_scale(self.scale * zoom);
        if image.is_empty() || !viewport.is_usable() {
            return;
        }
        let total = fit_scale(image, viewport) * self.scale;
        let max_x = ((image.width as f32 * total - viewport.width) / 2.0).max(0.0);
        let max_y = ((image.height as f32 * total - viewport.height) / 2.0).max(0.0);
        self.pan = Pan::new(
            (self.pan.x + delta.x).clamp(-max_x, max_x),
            (self.pan.y + delta.y).clamp(-max_y, max_y),
        );
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Positioning for this view onto a canvas of `target` size.
    pub fn positioning(&self, image: PixelSize, viewport: ViewportSize, target: PixelSize) -> Result<PositioningInfo> {
        compute_positioning(image, viewport, self.scale, self.pan, target)
    }
}

/// A straight guide line in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideLine {
    pub start: (f32, f32),
    pub end: (f32, f32),
}

/// Page-boundary guides drawn over the preview: none for a single sheet, two
/// horizontal lines for a sleeve, two horizontal and two vertical for a back.
pub fn grid_lines(print_type: PrintType, viewport: ViewportSize) -> Vec<GuideLine> {
    let (cols, rows) = print_type.grid();
    let (w, h) = (viewport.width, viewport.height);
    let vertical = (1..cols).map(|i| {
        let x = w * i as f32 / cols as f32;
        GuideLine {
            start: (x, 0.0),
            end: (x, h),
        }
    });
    let horizontal = (1..rows).map(|i| {
        let y = h * i as f32 / rows as f32;
        GuideLine {
            start: (0.0, y),
            end: (w, y),
        }
    });
    vertical.chain(horizontal).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: PixelSize = PixelSize::new(1200, 1800);
    const VIEW: ViewportSize = ViewportSize::new(400.0, 600.0);
    const TARGET: PixelSize = PixelSize::new(2480, 3508 * 3);

    #[test]
    fn default_view_covers_everything() {
        let info = compute_positioning(IMAGE, VIEW, 1.0, Pan::default(), TARGET).unwrap();
        assert_eq!(info.source_rect, IntRect::new(0, 0, 1200, 1800));
        assert_eq!(
            info.destination_rect,
            RectF::from_size(TARGET.width as f32, TARGET.height as f32)
        );
    }

    #[test]
    fn panned_out_of_view_is_nothing_visible() {
        for pan in [Pan::new(1000.0, 0.0), Pan::new(-401.0, 0.0), Pan::new(0.0, 600.0)] {
            let err = compute_positioning(IMAGE, VIEW, 1.0, pan, TARGET).unwrap_err();
            assert!(matches!(err, TspError::NothingVisible), "pan {pan:?}");
        }
    }

    #[test]
    fn zoom_in_shows_the_centre() {
        let info = compute_positioning(IMAGE, VIEW, 2.0, Pan::default(), TARGET).unwrap();
        assert_eq!(info.source_rect, IntRect::new(300, 450, 600, 900));
        // The visible region still fills the whole viewport.
        assert_eq!(info.destination_rect.left, 0.0);
        assert_eq!(info.destination_rect.right, TARGET.width as f32);
    }

    #[test]
    fn zoom_out_lands_in_the_middle_of_the_canvas() {
        let target = PixelSize::new(400, 600);
        let info = compute_positioning(IMAGE, VIEW, 0.5, Pan::default(), target).unwrap();
        assert_eq!(info.source_rect, IntRect::new(0, 0, 1200, 1800));
        let d = info.destination_rect;
        assert!((d.left - 100.0).abs() < 0.01);
        assert!((d.top - 150.0).abs() < 0.01);
        assert!((d.width() - 200.0).abs() < 0.01);
    }

    #[test]
    fn half_panned_keeps_the_matching_half() {
        // Image shifted right by half the viewport: its left half is visible
        // on the right half of the screen.
        let target = PixelSize::new(400, 600);
        let info = compute_positioning(IMAGE, VIEW, 1.0, Pan::new(200.0, 0.0), target).unwrap();
        assert_eq!(info.source_rect, IntRect::new(0, 0, 600, 1800));
        assert!((info.destination_rect.left - 200.0).abs() < 0.01);
        assert!((info.destination_rect.right - 400.0).abs() < 0.01);
    }

    #[test]
    fn degenerate_inputs_fail_explicitly() {
        let zero = PixelSize::new(0, 10);
        assert!(matches!(
            compute_positioning(zero, VIEW, 1.0, Pan::default(), TARGET),
            Err(TspError::DegenerateGeometry(_))
        ));
        assert!(matches!(
            compute_positioning(IMAGE, ViewportSize::new(0.0, 5.0), 1.0, Pan::default(), TARGET),
            Err(TspError::DegenerateGeometry(_))
        ));
        assert!(matches!(
            compute_positioning(IMAGE, VIEW, 1.0, Pan::default(), zero),
            Err(TspError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn scale_is_clamped() {
        assert_eq!(clamp_scale(0.1), MIN_SCALE);
        assert_eq!(clamp_scale(50.0), MAX_SCALE);
        assert_eq!(clamp_scale(f32::NAN), 1.0);
    }

    #[test]
    fn gestures_clamp_zoom_and_pan() {
        let mut view = ViewTransform::default();
        // Fitted image cannot be dragged.
        view.apply_gesture(1.0, Pan::new(50.0, 50.0), IMAGE, VIEW);
        assert!(view.pan().x.abs() < 1e-3 && view.pan().y.abs() < 1e-3);

        // At 2x the image overhangs by 200 x 300 on each side.
        view.apply_gesture(2.0, Pan::new(500.0, -20.0), IMAGE, VIEW);
        assert_eq!(view.scale(), 2.0);
        assert!((view.pan().x - 200.0).abs() < 1e-3);
        assert!((view.pan().y + 20.0).abs() < 1e-3);

        view.apply_gesture(10.0, Pan::default(), IMAGE, VIEW);
        assert_eq!(view.scale(), MAX_SCALE);

        view.reset();
        assert_eq!(view, ViewTransform::default());
    }

    #[test]
    fn guides_match_the_sheet_grid() {
        assert!(grid_lines(PrintType::Single, VIEW).is_empty());

        let sleeve = grid_lines(PrintType::Sleeve, VIEW);
        assert_eq!(sleeve.len(), 2);
        assert!(sleeve.iter().all(|l| l.start.1 == l.end.1));
        assert_eq!(sleeve[0].start, (0.0, 200.0));

        let back = grid_lines(PrintType::Back, VIEW);
        assert_eq!(back.len(), 4);
        assert_eq!(back.iter().filter(|l| l.start.0 == l.end.0).count(), 2);
    }
}
