use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use wordmap_shared::stats::{CooccurrenceMatrix, word_list_from_json};
use wordmap_shared::weather::weather_from_json;
use wordmap_shared::{AssetPaths, BoundarySet, BoundsMap, LayoutDataset, MapConfig};

/// One data file that failed to read or parse at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataIssue {
    pub path: String,
    pub error: String,
}

/// What the data directory holds, computed once at boot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataManifest {
    /// Prefectures with valid pixel bounds.
    pub prefectures: Vec<String>,
    /// Prefectures whose detail layout file exists.
    pub detail_layouts: Vec<String>,
    pub data_errors: Vec<DataIssue>,
}

#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub data_dir: Arc<PathBuf>,
    pub dist_dir: Arc<PathBuf>,
    pub manifest: Arc<DataManifest>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, dist_dir: PathBuf, manifest: DataManifest) -> Self {
        Self {
            started_at: Utc::now(),
            data_dir: Arc::new(data_dir),
            dist_dir: Arc::new(dist_dir),
            manifest: Arc::new(manifest),
        }
    }
}

/// Asset URLs are rooted at `/data/`; the same files live directly under the data directory.
fn asset_file(data_dir: &Path, url: &str) -> PathBuf {
    let relative = url
        .strip_prefix("/data/")
        .unwrap_or_else(|| url.trim_start_matches('/'));
    data_dir.join(relative)
}

struct Scan<'a> {
    data_dir: &'a Path,
    validate: bool,
    issues: Vec<DataIssue>,
}

impl Scan<'_> {
    fn read(&mut self, url: &str) -> Option<String> {
        let path = asset_file(self.data_dir, url);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                self.issue(url, format!("read error: {e}"));
                None
            }
        }
    }

    fn check<T, E>(&mut self, url: &str, parse: impl FnOnce(&str) -> Result<T, E>) -> Option<T>
    where
        E: std::fmt::Display,
    {
        if !self.validate {
            return None;
        }
        let text = self.read(url)?;
        match parse(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                self.issue(url, e.to_string());
                None
            }
        }
    }

    fn issue(&mut self, url: &str, error: String) {
        warn!(path = %url, error = %error, "data file rejected");
        self.issues.push(DataIssue {
            path: url.to_string(),
            error,
        });
    }
}

/// Walk the data directory and build the manifest. With `validate` off only the
/// pixel bounds are parsed; everything else is served as-is.
pub fn scan_data_dir(data_dir: &Path, config: &MapConfig, validate: bool) -> DataManifest {
    let assets: &AssetPaths = &config.assets;
    let mut scan = Scan {
        data_dir,
        validate,
        issues: Vec::new(),
    };

    let bounds = match scan.read(&assets.pixel_bounds) {
        Some(text) => match BoundsMap::from_json(&text) {
            Ok(bounds) => bounds,
            Err(e) => {
                scan.issue(&assets.pixel_bounds, e.to_string());
                BoundsMap::default()
            }
        },
        None => BoundsMap::default(),
    };
    for name in &bounds.rejected {
        scan.issue(
            &assets.pixel_bounds,
            format!("bounds for {name:?} are inverted or not finite"),
        );
    }

    scan.check(&assets.national_layout, |json| LayoutDataset::from_json(json, None));
    let boundary_sets = [
        (
            &assets.prefecture_boundaries,
            scan.check(&assets.prefecture_boundaries, |json| {
                BoundarySet::prefectures_from_geojson(json, config)
            }),
        ),
        (
            &assets.municipality_boundaries,
            scan.check(&assets.municipality_boundaries, |json| {
                BoundarySet::municipalities_from_geojson(json, config)
            }),
        ),
    ];
    for (url, set) in boundary_sets {
        for rejected in set.map(|set| set.rejected).unwrap_or_default() {
            scan.issue(url, rejected.to_string());
        }
    }
    scan.check(&assets.weather, weather_from_json);
    scan.check(&assets.cooccurrence, CooccurrenceMatrix::from_json);
    scan.check(&assets.word_list_for(None), word_list_from_json);

    let prefectures: Vec<String> = bounds.names().map(str::to_string).collect();
    let mut detail_layouts = Vec::new();
    for name in &prefectures {
        let url = assets.detail_layout_for(name);
        if !asset_file(data_dir, &url).is_file() {
            continue;
        }
        scan.check(&url, |json| LayoutDataset::from_json(json, None));
        detail_layouts.push(name.clone());
    }

    info!(
        prefectures = prefectures.len(),
        detail_layouts = detail_layouts.len(),
        data_errors = scan.issues.len(),
        validated = validate,
        "data directory scanned"
    );

    DataManifest {
        prefectures,
        detail_layouts,
        data_errors: scan.issues,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Fresh directory under the system temp dir, removed on drop.
    pub(crate) struct DataDir(pub PathBuf);

    impl DataDir {
        pub(crate) fn new(label: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "wordmap-{label}-{}-{}",
                std::process::id(),
                Utc::now().timestamp_nanos_opt().unwrap_or_default()
            ));
            std::fs::create_dir_all(&path).expect("create temp data dir");
            Self(path)
        }

        pub(crate) fn write(&self, relative: &str, contents: &str) {
            let path = self.0.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create parent dir");
            }
            std::fs::write(path, contents).expect("write data file");
        }
    }

    impl Drop for DataDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    pub(crate) fn seeded(label: &str) -> DataDir {
        let dir = DataDir::new(label);
        dir.write(
            "pref_pixel_bounds.json",
            &json!({
                "京都府": { "xlim": [0, 100], "ylim": [0, 80] },
                "大阪府": { "xlim": [100, 160], "ylim": [80, 140] },
                "壊れ県": { "xlim": [10, 5], "ylim": [0, 1] }
            })
            .to_string(),
        );
        dir.write(
            "wordcloud_layout.json",
            &json!([{ "name": "京都府", "data": [
                { "word": "抹茶", "tfidf_score": 0.4, "font_size": 12, "norm_x": 0.2, "norm_y": 0.5 }
            ]}])
            .to_string(),
        );
        dir.write(
            "wordcloud_map_layer/京都府/wordcloud_layout_detail.json",
            &json!([{ "name": "宇治市", "data": [
                { "word": "茶", "tfidf_score": 0.9, "font_size": 30,
                  "x": 5, "y": 5, "print_area_x": [0, 100], "print_area_y": [0, 100] }
            ]}])
            .to_string(),
        );
        dir.write("weather_by_pref.json", "{ not json");
        dir
    }

    #[test]
    fn scan_lists_prefectures_and_detail_layouts() {
        let dir = seeded("scan");
        let manifest = scan_data_dir(&dir.0, &MapConfig::default(), false);
        assert_eq!(manifest.prefectures, vec!["京都府", "大阪府"]);
        assert_eq!(manifest.detail_layouts, vec!["京都府"]);
        assert_eq!(manifest.data_errors.len(), 1);
        assert!(manifest.data_errors[0].error.contains("壊れ県"));
    }

    #[test]
    fn validation_reports_missing_and_malformed_files() {
        let dir = seeded("validate");
        let manifest = scan_data_dir(&dir.0, &MapConfig::default(), true);
        let paths: Vec<_> = manifest
            .data_errors
            .iter()
            .map(|issue| issue.path.as_str())
            .collect();
        assert!(paths.contains(&"/data/weather_by_pref.json"));
        assert!(paths.contains(&"/data/japan.geojson"));
        assert!(!paths.contains(&"/data/wordcloud_layout.json"));
        assert!(
            !paths
                .iter()
                .any(|p| p.ends_with("wordcloud_layout_detail.json"))
        );
    }

    #[test]
    fn missing_bounds_file_yields_empty_manifest() {
        let dir = DataDir::new("empty");
        let manifest = scan_data_dir(&dir.0, &MapConfig::default(), false);
        assert!(manifest.prefectures.is_empty());
        assert_eq!(manifest.data_errors[0].path, "/data/pref_pixel_bounds.json");
    }

    #[test]
    fn asset_urls_resolve_under_data_dir() {
        let root = Path::new("/srv/data");
        assert_eq!(
            asset_file(root, "/data/word_lists/all.json"),
            PathBuf::from("/srv/data/word_lists/all.json")
        );
        assert_eq!(asset_file(root, "/extra.json"), PathBuf::from("/srv/data/extra.json"));
    }
}
