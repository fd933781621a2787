use std::collections::{BTreeSet, HashMap};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::LoadError;

/// Text rotation of a placed word, resolved once from the layout file's numeric code.
///
/// Codes `null`/`0` are upright, `1` reads bottom-to-top (-90°), `2` reads
/// top-to-bottom (+90°) and `3` is upside down (180°). Angles follow SVG's
/// clockwise-positive `rotate()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Upright,
    Rotated90Ccw,
    Rotated90Cw,
    Rotated180,
}

impl Orientation {
    pub fn from_code(code: Option<u8>) -> Option<Self> {
        match code {
            None | Some(0) => Some(Orientation::Upright),
            Some(1) => Some(Orientation::Rotated90Ccw),
            Some(2) => Some(Orientation::Rotated90Cw),
            Some(3) => Some(Orientation::Rotated180),
            Some(_) => None,
        }
    }

    pub fn code(self) -> Option<u8> {
        match self {
            Orientation::Upright => None,
            Orientation::Rotated90Ccw => Some(1),
            Orientation::Rotated90Cw => Some(2),
            Orientation::Rotated180 => Some(3),
        }
    }

    pub fn degrees(self) -> f64 {
        match self {
            Orientation::Upright => 0.0,
            Orientation::Rotated90Ccw => -90.0,
            Orientation::Rotated90Cw => 90.0,
            Orientation::Rotated180 => 180.0,
        }
    }

    /// Clockwise vertical text hangs outside its cell unless the anchor is pulled back
    /// along the glyph's height axis.
    pub fn needs_anchor_shift(self) -> bool {
        matches!(self, Orientation::Rotated90Cw)
    }
}

impl<'de> Deserialize<'de> for Orientation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = Option::<u8>::deserialize(deserializer)?;
        Orientation::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("unknown orientation code {code:?}")))
    }
}

impl Serialize for Orientation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.code().serialize(serializer)
    }
}

/// Which coordinate fields a layout dataset's placement is driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutConvention {
    /// `norm_x`/`norm_y` in 0..1 across the target box.
    Normalized,
    /// `x`/`y` inside `print_area_x`/`print_area_y`.
    PrintArea,
}

impl LayoutConvention {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutConvention::Normalized => "normalized",
            LayoutConvention::PrintArea => "print-area",
        }
    }
}

/// Wire format of one word as produced by the layout generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordLayoutRecord {
    pub word: String,
    #[serde(default)]
    pub tfidf_score: f64,
    pub font_size: f64,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub norm_x: Option<f64>,
    #[serde(default)]
    pub norm_y: Option<f64>,
    #[serde(default)]
    pub print_area_x: Option<[f64; 2]>,
    #[serde(default)]
    pub print_area_y: Option<[f64; 2]>,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default = "default_word_color")]
    pub color: String,
}

fn default_word_color() -> String {
    "#000".to_string()
}

impl WordLayoutRecord {
    fn has_normalized(&self) -> bool {
        self.norm_x.is_some() && self.norm_y.is_some()
    }

    fn has_print_area(&self) -> bool {
        self.x.is_some()
            && self.y.is_some()
            && self.print_area_x.is_some()
            && self.print_area_y.is_some()
    }

    fn coords(&self, convention: LayoutConvention) -> Option<WordCoords> {
        match convention {
            LayoutConvention::Normalized => Some(WordCoords::Normalized {
                x: self.norm_x?,
                y: self.norm_y?,
            }),
            LayoutConvention::PrintArea => Some(WordCoords::PrintArea {
                x: self.x?,
                y: self.y?,
                area_x: self.print_area_x?,
                area_y: self.print_area_y?,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordLayoutGroupRecord {
    pub name: String,
    #[serde(default)]
    pub data: Vec<WordLayoutRecord>,
}

/// Word position in the region's local layout space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WordCoords {
    Normalized {
        x: f64,
        y: f64,
    },
    PrintArea {
        x: f64,
        y: f64,
        area_x: [f64; 2],
        area_y: [f64; 2],
    },
}

/// One placed word with its coordinate convention already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct WordLayoutEntry {
    pub word: String,
    pub tfidf_score: f64,
    pub font_size: f64,
    pub coords: WordCoords,
    pub orientation: Orientation,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordLayoutGroup {
    pub name: String,
    pub words: Vec<WordLayoutEntry>,
}

impl WordLayoutGroup {
    pub fn contains_word(&self, word: &str) -> bool {
        self.words.iter().any(|w| w.word == word)
    }
}

/// A full layout file (national or one prefecture's municipalities).
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDataset {
    pub convention: LayoutConvention,
    pub groups: Vec<WordLayoutGroup>,
    index: HashMap<String, usize>,
}

impl LayoutDataset {
    pub fn from_json(json: &str, preferred: Option<LayoutConvention>) -> Result<Self, LoadError> {
        let records: Vec<WordLayoutGroupRecord> = serde_json::from_str(json)?;
        Self::from_records(records, preferred)
    }

    /// Resolve the dataset's convention, then convert every record.
    ///
    /// With no preference the dataset is normalized if every entry carries
    /// `norm_x`/`norm_y`, print-area if every entry carries the print-area fields.
    pub fn from_records(
        records: Vec<WordLayoutGroupRecord>,
        preferred: Option<LayoutConvention>,
    ) -> Result<Self, LoadError> {
        let convention = match preferred {
            Some(c) => c,
            None => detect_convention(&records)?,
        };

        let mut groups = Vec::with_capacity(records.len());
        for group in records {
            let mut words = Vec::with_capacity(group.data.len());
            for record in group.data {
                let Some(coords) = record.coords(convention) else {
                    return Err(LoadError::IncompleteEntry {
                        group: group.name,
                        word: record.word,
                        convention,
                    });
                };
                words.push(WordLayoutEntry {
                    word: record.word,
                    tfidf_score: record.tfidf_score,
                    font_size: record.font_size,
                    coords,
                    orientation: record.orientation,
                    color: record.color,
                });
            }
            groups.push(WordLayoutGroup {
                name: group.name,
                words,
            });
        }

        let index = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.name.trim().to_string(), i))
            .collect();

        Ok(Self {
            convention,
            groups,
            index,
        })
    }

    pub fn empty(convention: LayoutConvention) -> Self {
        Self {
            convention,
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Group lookup by name, ignoring surrounding whitespace on either side.
    pub fn group(&self, name: &str) -> Option<&WordLayoutGroup> {
        self.index.get(name.trim()).map(|&i| &self.groups[i])
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Smallest and largest raw font size across every group.
    pub fn font_extent(&self) -> Option<[f64; 2]> {
        self.groups
            .iter()
            .flat_map(|g| g.words.iter())
            .map(|w| w.font_size)
            .filter(|s| s.is_finite())
            .fold(None, |acc, s| match acc {
                None => Some([s, s]),
                Some([lo, hi]) => Some([lo.min(s), hi.max(s)]),
            })
    }

    /// Sorted vocabulary for the search picker.
    pub fn unique_words(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|g| g.words.iter().map(|w| w.word.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn detect_convention(records: &[WordLayoutGroupRecord]) -> Result<LayoutConvention, LoadError> {
    let mut all_normalized = true;
    let mut all_print_area = true;
    for record in records.iter().flat_map(|g| g.data.iter()) {
        all_normalized &= record.has_normalized();
        all_print_area &= record.has_print_area();
    }
    if all_normalized {
        Ok(LayoutConvention::Normalized)
    } else if all_print_area {
        Ok(LayoutConvention::PrintArea)
    } else {
        Err(LoadError::MixedConvention)
    }
}

/// Maps raw layout font sizes onto the rendered size in normalized mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontScale {
    /// Sizes are used as-is.
    Direct,
    /// Linear map from the dataset's font extent onto `range`.
    Linear { domain: [f64; 2], range: [f64; 2] },
}

impl FontScale {
    pub fn apply(&self, size: f64) -> f64 {
        match *self {
            FontScale::Direct => size,
            FontScale::Linear { domain, range } => {
                let span = domain[1] - domain[0];
                let t = if span.abs() < f64::EPSILON {
                    0.5
                } else {
                    (size - domain[0]) / span
                };
                range[0] + (range[1] - range[0]) * t
            }
        }
    }
}
