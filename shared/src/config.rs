use serde::{Deserialize, Serialize};

use crate::layout::{FontScale, LayoutDataset};
use crate::projector::FitMode;

/// How normalized-mode font sizes are turned into rendered sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FontSizing {
    #[default]
    Direct,
    /// Rescale the dataset's font extent linearly onto `[min, max]`.
    Rescaled { min: f64, max: f64 },
}

impl FontSizing {
    pub fn scale_for(&self, dataset: &LayoutDataset) -> FontScale {
        match *self {
            FontSizing::Direct => FontScale::Direct,
            FontSizing::Rescaled { min, max } => match dataset.font_extent() {
                Some(domain) => FontScale::Linear {
                    domain,
                    range: [min, max],
                },
                None => FontScale::Direct,
            },
        }
    }
}

/// URLs of every static asset the map consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub national_layout: String,
    pub pixel_bounds: String,
    pub prefecture_boundaries: String,
    pub municipality_boundaries: String,
    /// `{pref}` is replaced with the prefecture name.
    pub detail_layout: String,
    pub weather: String,
    pub cooccurrence: String,
    /// `{key}` is replaced with a prefecture name or `all`.
    pub word_list: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            national_layout: "/data/wordcloud_layout.json".into(),
            pixel_bounds: "/data/pref_pixel_bounds.json".into(),
            prefecture_boundaries: "/data/japan.geojson".into(),
            municipality_boundaries: "/data/municipalities_full.geojson".into(),
            detail_layout: "/data/wordcloud_map_layer/{pref}/wordcloud_layout_detail.json".into(),
            weather: "/data/weather_by_pref.json".into(),
            cooccurrence: "/data/cooccurrence_matrix_all_pref.json".into(),
            word_list: "/data/word_lists/{key}.json".into(),
        }
    }
}

impl AssetPaths {
    pub fn detail_layout_for(&self, prefecture: &str) -> String {
        self.detail_layout.replace("{pref}", prefecture)
    }

    pub fn word_list_for(&self, prefecture: Option<&str>) -> String {
        self.word_list.replace("{key}", prefecture.unwrap_or("all"))
    }
}

/// Fixed visual constants of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub dim_opacity: f64,
    pub hover_scale: f64,
    pub zoom_margin: f64,
    pub zoom_duration_ms: f64,
    pub scale_extent: [f64; 2],
    pub wheel_sensitivity: f64,
    /// Margin applied to the target box before print-area placement. Zero maps the
    /// print area onto the full box.
    pub print_area_inset: f64,
    pub print_area_deflation: f64,
    pub region_stroke: f64,
    pub detail_stroke: f64,
    pub thin_stroke: f64,
    /// Municipality layers of these prefectures get `thin_stroke` and no hover shadow.
    pub thin_stroke_regions: Vec<String>,
    /// Feature properties tried in order for a prefecture's name.
    pub name_keys: Vec<String>,
    pub municipality_parent_key: String,
    pub municipality_city_key: String,
    pub municipality_ward_key: String,
    /// A city-level name ending in one of these identifies the municipality on its own.
    pub city_suffixes: Vec<String>,
    pub font_sizing: FontSizing,
    pub fit_mode: FitMode,
    pub neutral_fill: String,
    pub assets: AssetPaths,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            dim_opacity: 0.25,
            hover_scale: 1.1,
            zoom_margin: 0.8,
            zoom_duration_ms: 750.0,
            scale_extent: [0.5, 30.0],
            wheel_sensitivity: 0.002,
            print_area_inset: 0.0,
            print_area_deflation: 1.1,
            region_stroke: 1.0,
            detail_stroke: 0.5,
            thin_stroke: 0.05,
            thin_stroke_regions: vec!["東京都".into()],
            name_keys: vec!["N03_001".into(), "nam_ja".into()],
            municipality_parent_key: "N03_001".into(),
            municipality_city_key: "N03_003".into(),
            municipality_ward_key: "N03_004".into(),
            city_suffixes: vec!["市".into(), "郡".into()],
            font_sizing: FontSizing::Direct,
            fit_mode: FitMode::Extent,
            neutral_fill: "#ffffff".into(),
            assets: AssetPaths::default(),
        }
    }
}

impl MapConfig {
    pub fn is_thin_stroke(&self, prefecture: &str) -> bool {
        self.thin_stroke_regions.iter().any(|r| r == prefecture)
    }

    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.scale_extent[0], self.scale_extent[1])
    }
}
