use std::collections::BTreeMap;

use geo::{Geometry, MultiPolygon};
use geojson::{Feature, GeoJson};
use serde_json::{Map, Value};

use crate::config::MapConfig;
use crate::error::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Prefecture,
    Municipality,
}

/// A named region shape. Features sharing a name (islands, exclaves) are merged
/// into a single multipolygon when loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionBoundary {
    pub kind: RegionKind,
    /// Display name; for municipalities this is the resolved match name.
    pub name: String,
    /// Name used to look up the region's word group.
    pub match_key: String,
    pub parent: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// Boundary features of one kind, plus the features that were rejected on load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundarySet {
    regions: Vec<RegionBoundary>,
    pub rejected: Vec<LoadError>,
}

/// Municipality match name: the city/county-level name when it ends with one of
/// `suffixes` (a designated city or a county groups its wards or towns), the
/// ward/town-level name otherwise. Falls back to whichever field is present.
pub fn municipality_match_name(
    city: Option<&str>,
    ward: Option<&str>,
    suffixes: &[String],
) -> Option<String> {
    let city = city.map(str::trim).filter(|s| !s.is_empty());
    let ward = ward.map(str::trim).filter(|s| !s.is_empty());
    let name = match (city, ward) {
        (Some(c), _) if suffixes.iter().any(|s| c.ends_with(s.as_str())) => c,
        (_, Some(w)) => w,
        (Some(c), None) => c,
        (None, None) => return None,
    };
    Some(name.to_string())
}

fn string_prop<'a>(props: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a str> {
    props?.get(key)?.as_str()
}

fn polygonal(feature: Feature, index: usize) -> Result<MultiPolygon<f64>, LoadError> {
    let Some(geometry) = feature.geometry else {
        return Err(LoadError::InvalidFeature {
            index,
            reason: "feature missing geometry".to_string(),
        });
    };
    let geom: Geometry<f64> = geometry.value.try_into()?;
    match geom {
        Geometry::Polygon(p) => Ok(p.into()),
        Geometry::MultiPolygon(m) => Ok(m),
        _ => Err(LoadError::InvalidFeature {
            index,
            reason: "geometry is not a polygon".to_string(),
        }),
    }
}

fn feature_collection(json: &str) -> Result<Vec<Feature>, LoadError> {
    match json.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => Ok(fc.features),
        _ => Err(LoadError::NotFeatureCollection),
    }
}

impl BoundarySet {
    /// Prefecture outlines; the name comes from the first of `config.name_keys`
    /// present on the feature.
    pub fn prefectures_from_geojson(json: &str, config: &MapConfig) -> Result<Self, LoadError> {
        let mut merged: BTreeMap<String, MultiPolygon<f64>> = BTreeMap::new();
        let mut rejected = Vec::new();

        for (index, feature) in feature_collection(json)?.into_iter().enumerate() {
            let name = config
                .name_keys
                .iter()
                .find_map(|key| string_prop(feature.properties.as_ref(), key))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            let Some(name) = name else {
                rejected.push(LoadError::InvalidFeature {
                    index,
                    reason: "feature has no region name".to_string(),
                });
                continue;
            };
            match polygonal(feature, index) {
                Ok(mp) => merged
                    .entry(name)
                    .or_insert_with(|| MultiPolygon(Vec::new()))
                    .0
                    .extend(mp.0),
                Err(e) => rejected.push(e),
            }
        }

        let regions = merged
            .into_iter()
            .map(|(name, geometry)| RegionBoundary {
                kind: RegionKind::Prefecture,
                match_key: name.clone(),
                name,
                parent: None,
                geometry,
            })
            .collect();
        Ok(Self { regions, rejected })
    }

    /// Municipality outlines from the national municipality dataset, keyed by
    /// parent prefecture and resolved match name.
    pub fn municipalities_from_geojson(json: &str, config: &MapConfig) -> Result<Self, LoadError> {
        let mut merged: BTreeMap<(String, String), MultiPolygon<f64>> = BTreeMap::new();
        let mut rejected = Vec::new();

        for (index, feature) in feature_collection(json)?.into_iter().enumerate() {
            let props = feature.properties.as_ref();
            let parent = string_prop(props, &config.municipality_parent_key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            let name = municipality_match_name(
                string_prop(props, &config.municipality_city_key),
                string_prop(props, &config.municipality_ward_key),
                &config.city_suffixes,
            );
            let (Some(parent), Some(name)) = (parent, name) else {
                rejected.push(LoadError::InvalidFeature {
                    index,
                    reason: "feature has no prefecture or municipality name".to_string(),
                });
                continue;
            };
            match polygonal(feature, index) {
                Ok(mp) => merged
                    .entry((parent, name))
                    .or_insert_with(|| MultiPolygon(Vec::new()))
                    .0
                    .extend(mp.0),
                Err(e) => rejected.push(e),
            }
        }

        let regions = merged
            .into_iter()
            .map(|((parent, name), geometry)| RegionBoundary {
                kind: RegionKind::Municipality,
                match_key: name.clone(),
                name,
                parent: Some(parent),
                geometry,
            })
            .collect();
        Ok(Self { regions, rejected })
    }

    pub fn from_regions(regions: Vec<RegionBoundary>) -> Self {
        Self {
            regions,
            rejected: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RegionBoundary> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionBoundary> {
        self.regions.iter()
    }

    pub fn children_of<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a RegionBoundary> {
        self.regions
            .iter()
            .filter(move |r| r.parent.as_deref() == Some(parent))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn suffixes() -> Vec<String> {
        vec!["市".to_string(), "郡".to_string()]
    }

    fn square(x: f64, y: f64, size: f64) -> Value {
        json!([[[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]])
    }

    #[test]
    fn city_level_name_wins_when_it_carries_the_suffix() {
        assert_eq!(
            municipality_match_name(Some("札幌市"), Some("中央区"), &suffixes()).as_deref(),
            Some("札幌市")
        );
        assert_eq!(
            municipality_match_name(Some("石狩郡"), Some("当別町"), &suffixes()).as_deref(),
            Some("石狩郡")
        );
    }

    #[test]
    fn ward_level_name_used_otherwise() {
        assert_eq!(
            municipality_match_name(None, Some(" 千代田区 "), &suffixes()).as_deref(),
            Some("千代田区")
        );
        assert_eq!(
            municipality_match_name(Some("大島支庁"), Some("大島町"), &suffixes()).as_deref(),
            Some("大島町")
        );
        assert_eq!(
            municipality_match_name(Some("所属未定地"), None, &suffixes()).as_deref(),
            Some("所属未定地")
        );
        assert_eq!(municipality_match_name(None, Some("  "), &suffixes()), None);
    }

    #[test]
    fn prefectures_merge_same_name_and_reject_bad_features() {
        let gj = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "nam_ja": "沖縄県" },
                  "geometry": { "type": "Polygon", "coordinates": square(127.0, 26.0, 1.0) } },
                { "type": "Feature", "properties": { "nam_ja": "沖縄県" },
                  "geometry": { "type": "Polygon", "coordinates": square(124.0, 24.0, 0.5) } },
                { "type": "Feature", "properties": { "N03_001": "北海道" },
                  "geometry": { "type": "Point", "coordinates": [141.0, 43.0] } },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "Polygon", "coordinates": square(0.0, 0.0, 1.0) } }
            ]
        })
        .to_string();

        let set = BoundarySet::prefectures_from_geojson(&gj, &MapConfig::default()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("沖縄県").unwrap().geometry.0.len(), 2);
        assert_eq!(set.rejected.len(), 2);
        assert!(matches!(
            set.rejected[0],
            LoadError::InvalidFeature { index: 2, .. }
        ));
    }

    #[test]
    fn municipalities_group_by_parent() {
        let gj = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature",
                  "properties": { "N03_001": "東京都", "N03_003": null, "N03_004": "千代田区" },
                  "geometry": { "type": "Polygon", "coordinates": square(139.7, 35.6, 0.1) } },
                { "type": "Feature",
                  "properties": { "N03_001": "北海道", "N03_003": "札幌市", "N03_004": "中央区" },
                  "geometry": { "type": "Polygon", "coordinates": square(141.3, 43.0, 0.1) } },
                { "type": "Feature",
                  "properties": { "N03_001": "北海道", "N03_003": "札幌市", "N03_004": "北区" },
                  "geometry": { "type": "Polygon", "coordinates": square(141.3, 43.1, 0.1) } }
            ]
        })
        .to_string();

        let set = BoundarySet::municipalities_from_geojson(&gj, &MapConfig::default()).unwrap();
        let hokkaido: Vec<_> = set.children_of("北海道").collect();
        assert_eq!(hokkaido.len(), 1);
        assert_eq!(hokkaido[0].match_key, "札幌市");
        assert_eq!(hokkaido[0].geometry.0.len(), 2);
        assert_eq!(set.children_of("東京都").next().unwrap().name, "千代田区");
        assert_eq!(set.children_of("大阪府").count(), 0);
    }

    #[test]
    fn non_collection_is_rejected() {
        let gj = json!({ "type": "Point", "coordinates": [0.0, 0.0] }).to_string();
        assert_eq!(
            BoundarySet::prefectures_from_geojson(&gj, &MapConfig::default()),
            Err(LoadError::NotFeatureCollection)
        );
    }
}
