use crate::bounds::Rect;
use crate::config::MapConfig;
use crate::error::PlacementError;
use crate::layout::{FontScale, Orientation, WordCoords, WordLayoutEntry};

/// Normalized-mode anchor pull-back for clockwise vertical text, in font-size units.
const NORMALIZED_SHIFT: f64 = 0.8;
/// Print-area-mode pull-back; the glyph is centered on its baseline there.
const PRINT_AREA_SHIFT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    Hanging,
    Central,
}

impl Baseline {
    pub fn as_css(self) -> &'static str {
        match self {
            Baseline::Hanging => "hanging",
            Baseline::Central => "central",
        }
    }
}

/// Screen-space placement of one word glyph.
///
/// `(x, y)` is the anchor cell position and also the rotation pivot. `dy` is the
/// offset applied along the text's own vertical axis before rotating, so the
/// drawn glyph sits inside its cell. Text anchor is always `start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordPlacement {
    pub x: f64,
    pub y: f64,
    pub dy: f64,
    pub font_size: f64,
    pub rotation_deg: f64,
    pub baseline: Baseline,
}

impl WordPlacement {
    pub const TEXT_ANCHOR: &'static str = "start";

    pub fn text_y(&self) -> f64 {
        self.y + self.dy
    }

    pub fn transform(&self) -> String {
        format!("rotate({}, {}, {})", self.rotation_deg, self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementParams {
    pub font_scale: FontScale,
    pub print_area_inset: f64,
    pub print_area_deflation: f64,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            font_scale: FontScale::Direct,
            print_area_inset: 0.0,
            print_area_deflation: 1.1,
        }
    }
}

impl PlacementParams {
    pub fn from_config(config: &MapConfig, font_scale: FontScale) -> Self {
        Self {
            font_scale,
            print_area_inset: config.print_area_inset,
            print_area_deflation: config.print_area_deflation,
        }
    }
}

fn linear(v: f64, domain: [f64; 2], range: [f64; 2]) -> f64 {
    range[0] + (v - domain[0]) / (domain[1] - domain[0]) * (range[1] - range[0])
}

/// Resolve a word's screen position inside `target`.
///
/// Pure: identical inputs always yield identical output.
pub fn place(
    entry: &WordLayoutEntry,
    target: &Rect,
    params: &PlacementParams,
) -> Result<WordPlacement, PlacementError> {
    if target.is_degenerate() {
        return Err(PlacementError::DegenerateTarget);
    }
    if !(entry.font_size.is_finite() && entry.font_size > 0.0) {
        return Err(PlacementError::NonPositiveFont);
    }

    let (x, y, font_size, shift, baseline) = match entry.coords {
        WordCoords::Normalized { x, y } => {
            let font_size = params.font_scale.apply(entry.font_size);
            (
                target.min[0] + target.width() * x,
                target.min[1] + target.height() * y,
                font_size,
                NORMALIZED_SHIFT * font_size,
                Baseline::Hanging,
            )
        }
        WordCoords::PrintArea {
            x,
            y,
            area_x,
            area_y,
        } => {
            let spans = [area_x[1] - area_x[0], area_y[1] - area_y[0]];
            if spans.iter().any(|s| !s.is_finite() || *s == 0.0) || area_x[1] == 0.0 {
                return Err(PlacementError::DegeneratePrintArea);
            }
            let range = target.inset(params.print_area_inset);
            let font_size =
                entry.font_size / area_x[1] * target.width() / params.print_area_deflation;
            (
                linear(x, area_x, [range.min[0], range.max[0]]),
                linear(y, area_y, [range.min[1], range.max[1]]),
                font_size,
                PRINT_AREA_SHIFT * font_size,
                Baseline::Central,
            )
        }
    };

    if !(x.is_finite() && y.is_finite() && font_size.is_finite()) || font_size <= 0.0 {
        return Err(PlacementError::NonPositiveFont);
    }

    let dy = if entry.orientation.needs_anchor_shift() {
        -shift
    } else {
        0.0
    };

    Ok(WordPlacement {
        x,
        y,
        dy,
        font_size,
        rotation_deg: entry.orientation.degrees(),
        baseline,
    })
}
