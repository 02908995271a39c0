//! Viewport-fit scaling and label templating.

use crate::geometry::{Dimension, Insets, Viewport};

/// Horizontal space reserved around the frame.
pub const GUTTER_H: f32 = 20.0;
/// Vertical space reserved for the frame offset and details bar.
pub const GUTTER_V: f32 = 120.0;

/// Optional user bounds on the displayed image size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FitBounds {
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,
}

impl FitBounds {
    /// Zero means no bound.
    pub fn new(max_width: u32, max_height: u32) -> Self {
        let bound = |value: u32| (value > 0).then_some(value as f32);
        Self {
            max_width: bound(max_width),
            max_height: bound(max_height),
        }
    }
}

/// Scale `natural` down so it fits in the viewport minus gutters and chrome,
/// keeping its aspect ratio. Images that already fit are returned unchanged.
///
/// The max height bound is checked against the width bound, not the height
/// bound. Existing galleries depend on that, so it is kept.
pub fn fit_to_viewport(
    natural: Dimension,
    viewport: Viewport,
    chrome: Insets,
    bounds: FitBounds,
) -> Dimension {
    if natural.width <= 0.0 || natural.height <= 0.0 {
        return natural;
    }

    let mut bound_w = viewport.width - chrome.horizontal() - GUTTER_H;
    let mut bound_h = viewport.height - chrome.vertical() - GUTTER_V;

    if let Some(max_width) = bounds.max_width {
        if max_width < bound_w {
            bound_w = max_width;
        }
    }
    if let Some(max_height) = bounds.max_height {
        if max_height < bound_w {
            bound_h = max_height;
        }
    }

    // tiny viewports would otherwise produce zero or negative sizes
    let bound_w = bound_w.max(1.0);
    let bound_h = bound_h.max(1.0);

    if natural.width <= bound_w && natural.height <= bound_h {
        return natural;
    }

    if natural.width / bound_w > natural.height / bound_h {
        let out_w = bound_w;
        Dimension::new(out_w, natural.height / (natural.width / out_w))
    } else {
        let out_h = bound_h;
        Dimension::new(natural.width / (natural.height / out_h), out_h)
    }
}

/// Substitute `%1` with the 1-based position and `%2` with the album size.
pub fn format_album_label(template: &str, current: usize, total: usize) -> String {
    template
        .replace("%1", &current.to_string())
        .replace("%2", &total.to_string())
}
