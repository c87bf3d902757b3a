//! Pure resize arithmetic. No pixels are touched here.

use crate::options::{Fit, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}
impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// What to do with a decoded image to satisfy the requested box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Leave the pixels as they are.
    Keep,
    /// Resample to exactly this size.
    Scale(Size),
    /// Resample to `scaled`, then cut `size` out of it at (`x`, `y`).
    Crop { scaled: Size, x: u32, y: u32, size: Size },
    /// Resample to `scaled`, then paste onto a `canvas` at (`x`, `y`).
    Pad { scaled: Size, x: u32, y: u32, canvas: Size },
}

/// Work out the [`Layout`] for a `source` image.
///
/// The requested box is completed from the source aspect ratio when only one
/// axis is given, then clamped per axis to the source dimensions, so the
/// output never exceeds the source on either axis.
pub fn plan(source: Size, width: Option<u32>, height: Option<u32>, fit: Fit, position: Position) -> Layout {
    if source.width == 0 || source.height == 0 {
        return Layout::Keep;
    }
    let requested = match (width, height) {
        (None, None) => return Layout::Keep,
        (Some(w), Some(h)) => Size::new(w, h),
        (Some(w), None) => Size::new(w, scale_axis(source.height, f64::from(w) / f64::from(source.width))),
        (None, Some(h)) => Size::new(scale_axis(source.width, f64::from(h) / f64::from(source.height)), h),
    };
    let target = Size::new(requested.width.clamp(1, source.width), requested.height.clamp(1, source.height));

    let sx = f64::from(target.width) / f64::from(source.width);
    let sy = f64::from(target.height) / f64::from(source.height);
    let layout = match fit {
        Fit::Fill => Layout::Scale(target),
        Fit::Inside => Layout::Scale(scaled(source, sx.min(sy), None)),
        Fit::Outside => Layout::Scale(scaled(source, sx.max(sy), None)),
        Fit::Cover => {
            let scaled = scaled(source, sx.max(sy), None);
            // Rounding must never leave the scaled image smaller than the box.
            let scaled = Size::new(scaled.width.max(target.width), scaled.height.max(target.height));
            let (x, y) = position.offset(scaled.width - target.width, scaled.height - target.height);
            Layout::Crop { scaled, x, y, size: target }
        },
        Fit::Contain => {
            let scaled = scaled(source, sx.min(sy), Some(target));
            let (x, y) = position.offset(target.width - scaled.width, target.height - scaled.height);
            Layout::Pad { scaled, x, y, canvas: target }
        },
    };
    simplify(layout, source)
}

fn scale_axis(length: u32, factor: f64) -> u32 {
    // `as` saturates; callers clamp to the source afterwards.
    ((f64::from(length) * factor).round() as u32).max(1)
}

fn scaled(source: Size, factor: f64, bound: Option<Size>) -> Size {
    let size = Size::new(scale_axis(source.width, factor), scale_axis(source.height, factor));
    match bound {
        Some(bound) => Size::new(size.width.min(bound.width), size.height.min(bound.height)),
        None => size,
    }
}

/// Drop resampling, cropping and padding steps that would be no-ops.
fn simplify(layout: Layout, source: Size) -> Layout {
    match layout {
        Layout::Scale(size) if size == source => Layout::Keep,
        Layout::Crop { scaled, size, .. } if scaled == size => simplify(Layout::Scale(size), source),
        Layout::Pad { scaled, canvas, .. } if scaled == canvas => simplify(Layout::Scale(canvas), source),
        other => other,
    }
}

impl Layout {
    /// Final dimensions after the layout is applied.
    pub fn output_size(&self, source: Size) -> Size {
        match *self {
            Layout::Keep => source,
            Layout::Scale(size) => size,
            Layout::Crop { size, .. } => size,
            Layout::Pad { canvas, .. } => canvas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LANDSCAPE: Size = Size::new(400, 200);

    #[test]
    fn test_no_box_keeps_source() {
        assert_eq!(plan(LANDSCAPE, None, None, Fit::Cover, Position::Center), Layout::Keep);
    }

    #[rstest]
    #[case(Some(200), None, Size::new(200, 100))]
    #[case(None, Some(50), Size::new(100, 50))]
    #[case(Some(1000), None, Size::new(400, 200))]
    #[case(None, Some(1000), Size::new(400, 200))]
    fn test_single_axis_follows_aspect_ratio(
        #[case] width: Option<u32>,
        #[case] height: Option<u32>,
        #[case] expected: Size,
    ) {
        for fit in [Fit::Cover, Fit::Contain, Fit::Fill, Fit::Inside, Fit::Outside] {
            let layout = plan(LANDSCAPE, width, height, fit, Position::Center);
            assert_eq!(layout.output_size(LANDSCAPE), expected, "fit {fit}");
        }
    }

    #[rstest]
    #[case(Fit::Cover, Size::new(100, 100))]
    #[case(Fit::Contain, Size::new(100, 100))]
    #[case(Fit::Fill, Size::new(100, 100))]
    #[case(Fit::Inside, Size::new(100, 50))]
    #[case(Fit::Outside, Size::new(200, 100))]
    fn test_fit_output_sizes(#[case] fit: Fit, #[case] expected: Size) {
        let layout = plan(LANDSCAPE, Some(100), Some(100), fit, Position::Center);
        assert_eq!(layout.output_size(LANDSCAPE), expected);
    }

    #[test]
    fn test_cover_crops_at_position() {
        let layout = plan(LANDSCAPE, Some(100), Some(100), Fit::Cover, Position::East);
        assert_eq!(layout, Layout::Crop { scaled: Size::new(200, 100), x: 100, y: 0, size: Size::new(100, 100) });
        let layout = plan(LANDSCAPE, Some(100), Some(100), Fit::Cover, Position::Center);
        assert_eq!(layout, Layout::Crop { scaled: Size::new(200, 100), x: 50, y: 0, size: Size::new(100, 100) });
    }

    #[test]
    fn test_contain_pads_at_position() {
        let layout = plan(LANDSCAPE, Some(100), Some(100), Fit::Contain, Position::Center);
        assert_eq!(layout, Layout::Pad { scaled: Size::new(100, 50), x: 0, y: 25, canvas: Size::new(100, 100) });
        let layout = plan(LANDSCAPE, Some(100), Some(100), Fit::Contain, Position::South);
        assert_eq!(layout, Layout::Pad { scaled: Size::new(100, 50), x: 0, y: 50, canvas: Size::new(100, 100) });
    }

    #[rstest]
    #[case(Fit::Cover)]
    #[case(Fit::Contain)]
    #[case(Fit::Fill)]
    #[case(Fit::Inside)]
    #[case(Fit::Outside)]
    fn test_never_enlarges(#[case] fit: Fit) {
        let layout = plan(LANDSCAPE, Some(800), Some(600), fit, Position::Center);
        let size = layout.output_size(LANDSCAPE);
        assert!(size.width <= LANDSCAPE.width && size.height <= LANDSCAPE.height, "{fit}: {size:?}");
    }

    #[test]
    fn test_clamped_box_is_per_axis() {
        // 800 wide is clamped to 400; 100 tall is honoured.
        let layout = plan(LANDSCAPE, Some(800), Some(100), Fit::Fill, Position::Center);
        assert_eq!(layout, Layout::Scale(Size::new(400, 100)));
    }

    #[test]
    fn test_identity_requests_are_kept() {
        assert_eq!(plan(LANDSCAPE, Some(400), Some(200), Fit::Cover, Position::Center), Layout::Keep);
        assert_eq!(plan(LANDSCAPE, Some(400), None, Fit::Contain, Position::Center), Layout::Keep);
    }

    #[test]
    fn test_tiny_targets_stay_non_zero() {
        let layout = plan(Size::new(1000, 1), Some(10), None, Fit::Inside, Position::Center);
        assert_eq!(layout.output_size(Size::new(1000, 1)), Size::new(10, 1));
    }
}
