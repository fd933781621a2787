use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Axis-aligned rectangle in screen pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Rect {
    pub const fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn midpoint(&self) -> [f64; 2] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }

    /// True when either side is zero, negative or not finite.
    pub fn is_degenerate(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0)
    }

    pub fn contains_point(&self, p: [f64; 2], eps: f64) -> bool {
        p[0] >= self.min[0] - eps
            && p[0] <= self.max[0] + eps
            && p[1] >= self.min[1] - eps
            && p[1] <= self.max[1] + eps
    }

    pub fn contains_rect(&self, other: &Rect, eps: f64) -> bool {
        self.contains_point(other.min, eps) && self.contains_point(other.max, eps)
    }

    /// Shrink each side by `margin`, unless that would collapse the rectangle.
    pub fn inset(&self, margin: f64) -> Rect {
        if margin <= 0.0 || margin * 2.0 >= self.width() || margin * 2.0 >= self.height() {
            return *self;
        }
        Rect {
            min: [self.min[0] + margin, self.min[1] + margin],
            max: [self.max[0] - margin, self.max[1] - margin],
        }
    }
}

/// Target rectangle a region's geometry is fitted into, keyed by region name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelBounds {
    #[serde(default)]
    pub name: String,
    pub xlim: [f64; 2],
    pub ylim: [f64; 2],
}

impl PixelBounds {
    pub fn rect(&self) -> Rect {
        Rect::new([self.xlim[0], self.ylim[0]], [self.xlim[1], self.ylim[1]])
    }

    pub fn is_valid(&self) -> bool {
        self.xlim.iter().chain(self.ylim.iter()).all(|v| v.is_finite())
            && self.xlim[0] < self.xlim[1]
            && self.ylim[0] < self.ylim[1]
    }
}

/// All prefecture pixel bounds. Entries violating `xlim[0] < xlim[1]` or
/// `ylim[0] < ylim[1]` are dropped on load and listed in `rejected`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsMap {
    entries: BTreeMap<String, PixelBounds>,
    pub rejected: Vec<String>,
}

impl BoundsMap {
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let raw: BTreeMap<String, PixelBounds> = serde_json::from_str(json)?;
        Ok(Self::from_entries(raw))
    }

    pub fn from_entries(raw: impl IntoIterator<Item = (String, PixelBounds)>) -> Self {
        let mut map = BoundsMap::default();
        for (key, mut bounds) in raw {
            if bounds.name.is_empty() {
                bounds.name = key.clone();
            }
            if bounds.is_valid() {
                map.entries.insert(key, bounds);
            } else {
                map.rejected.push(key);
            }
        }
        map
    }

    pub fn get(&self, name: &str) -> Option<&PixelBounds> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of every registered rectangle, used to size the overview canvas.
    pub fn extent(&self) -> Option<Rect> {
        let mut iter = self.entries.values().map(PixelBounds::rect);
        let first = iter.next()?;
        Some(iter.fold(first, |acc, r| Rect {
            min: [acc.min[0].min(r.min[0]), acc.min[1].min(r.min[1])],
            max: [acc.max[0].max(r.max[0]), acc.max[1].max(r.max[1])],
        }))
    }
}
