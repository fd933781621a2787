use std::fmt;

use crate::layout::LayoutConvention;

/// Why a region was left out of a draw pass. Never fatal: the caller skips the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No pixel bounds are registered under the region name.
    MissingBounds,
    /// No boundary feature carries the region name.
    MissingGeometry,
    /// The boundary's bounding box has zero width or height.
    DegenerateGeometry,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingBounds => write!(f, "no pixel bounds for region"),
            SkipReason::MissingGeometry => write!(f, "no boundary feature for region"),
            SkipReason::DegenerateGeometry => write!(f, "region geometry has zero extent"),
        }
    }
}

impl std::error::Error for SkipReason {}

/// A single word glyph could not be placed and is dropped from the draw output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    /// Target box has zero (or non-finite) width or height.
    DegenerateTarget,
    /// The entry's print area spans nothing on one axis.
    DegeneratePrintArea,
    /// Font size is zero, negative or not a number.
    NonPositiveFont,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::DegenerateTarget => write!(f, "target box is degenerate"),
            PlacementError::DegeneratePrintArea => write!(f, "print area is degenerate"),
            PlacementError::NonPositiveFont => write!(f, "font size must be positive"),
        }
    }
}

impl std::error::Error for PlacementError {}

/// Malformed input rejected at the data loading boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    Json(String),
    GeoJson(String),
    NotFeatureCollection,
    /// A boundary feature without a usable name or polygon geometry.
    InvalidFeature { index: usize, reason: String },
    /// An entry lacks the coordinate fields its dataset convention needs.
    IncompleteEntry {
        group: String,
        word: String,
        convention: LayoutConvention,
    },
    /// Entries disagree on which coordinate fields they carry.
    MixedConvention,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Json(e) => write!(f, "invalid json: {e}"),
            LoadError::GeoJson(e) => write!(f, "invalid geojson: {e}"),
            LoadError::NotFeatureCollection => write!(f, "expected a geojson FeatureCollection"),
            LoadError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
            LoadError::IncompleteEntry {
                group,
                word,
                convention,
            } => write!(
                f,
                "word {word:?} in {group:?} is missing {} coordinates",
                convention.as_str()
            ),
            LoadError::MixedConvention => {
                write!(f, "layout entries mix normalized and print-area coordinates")
            }
        }
    }
}

impl std::error::Error for LoadError {}

impl From<geojson::Error> for LoadError {
    fn from(e: geojson::Error) -> Self {
        LoadError::GeoJson(e.to_string())
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Json(e.to_string())
    }
}
