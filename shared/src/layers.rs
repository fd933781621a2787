use std::collections::{BTreeMap, BTreeSet};

use crate::boundary::{BoundarySet, RegionBoundary, RegionKind};
use crate::bounds::{BoundsMap, Rect};
use crate::colors::glyph_color;
use crate::config::MapConfig;
use crate::error::{PlacementError, SkipReason};
use crate::layout::{FontScale, LayoutDataset, WordLayoutGroup};
use crate::placement::{PlacementParams, WordPlacement, place};
use crate::projector::GeoProjector;
use crate::selection::{Mode, SelectionState};

/// Scale-up applied to a hovered region, pivoted at its centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverScale {
    pub factor: f64,
    pub pivot: [f64; 2],
}

impl HoverScale {
    pub fn to_svg(&self) -> String {
        let [cx, cy] = self.pivot;
        format!(
            "translate({cx},{cy}) scale({}) translate({},{})",
            self.factor, -cx, -cy
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlyphDraw {
    pub word: String,
    pub placement: WordPlacement,
    pub color: String,
    pub opacity: f64,
    /// The glyph is the selected word.
    pub emphasized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionDraw {
    pub name: String,
    /// Prefectures come from the nation layer, municipalities from the detail layer.
    pub kind: RegionKind,
    pub path: String,
    pub fill: String,
    pub stroke_width: f64,
    pub opacity: f64,
    pub shadow: bool,
    pub hover: Option<HoverScale>,
    pub words: Vec<GlyphDraw>,
    pub bounds: Rect,
    pub centroid: [f64; 2],
    pub contains_selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRegion {
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedGlyph {
    pub region: String,
    pub word: String,
    pub error: PlacementError,
}

/// Everything one layer draws in a render pass, plus what it had to leave out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerDraw {
    pub regions: Vec<RegionDraw>,
    pub skipped: Vec<SkippedRegion>,
    pub dropped: Vec<DroppedGlyph>,
}

impl LayerDraw {
    pub fn glyph_count(&self) -> usize {
        self.regions.iter().map(|r| r.words.len()).sum()
    }

    pub fn region(&self, name: &str) -> Option<&RegionDraw> {
        self.regions.iter().find(|r| r.name == name)
    }
}

/// Read-only inputs of the national layer. Any of the optional parts may still be loading.
#[derive(Debug, Clone, Copy)]
pub struct NationInputs<'a> {
    pub bounds: &'a BoundsMap,
    pub boundaries: &'a BoundarySet,
    pub layout: Option<&'a LayoutDataset>,
    /// Region fill colors, e.g. from a temperature scale.
    pub fills: Option<&'a BTreeMap<String, String>>,
}

/// Region opacity under the selected-word rule.
pub fn region_opacity(
    selection: &SelectionState,
    region: &str,
    contains_selected: bool,
    config: &MapConfig,
) -> f64 {
    let dimmed = selection.word.is_some()
        && !contains_selected
        && !selection.is_cross_highlighted(region);
    if dimmed { config.dim_opacity } else { 1.0 }
}

fn place_group(
    region: &str,
    group: Option<&WordLayoutGroup>,
    target: &Rect,
    params: &PlacementParams,
    selection: &SelectionState,
    opacity: f64,
    dropped: &mut Vec<DroppedGlyph>,
) -> Vec<GlyphDraw> {
    let Some(group) = group else {
        return Vec::new();
    };
    let selected = selection.word.as_deref();
    group
        .words
        .iter()
        .filter_map(|entry| match place(entry, target, params) {
            Ok(placement) => Some(GlyphDraw {
                word: entry.word.clone(),
                placement,
                color: glyph_color(&entry.word, &entry.color),
                opacity,
                emphasized: selected == Some(entry.word.as_str()),
            }),
            Err(error) => {
                dropped.push(DroppedGlyph {
                    region: region.to_string(),
                    word: entry.word.clone(),
                    error,
                });
                None
            }
        })
        .collect()
}

fn params_for(layout: Option<&LayoutDataset>, config: &MapConfig) -> PlacementParams {
    let font_scale = match layout {
        Some(ds) => config.font_sizing.scale_for(ds),
        None => FontScale::Direct,
    };
    PlacementParams::from_config(config, font_scale)
}

/// The overview: every prefecture outline with its word cloud.
///
/// Regions are the union of names known to the bounds map, the boundary set and
/// the layout. A region without bounds or geometry is skipped; a region without
/// a word group draws its outline only. The drilled-into prefecture is left to
/// the detail layer.
pub fn nation_layer(
    inputs: NationInputs<'_>,
    selection: &SelectionState,
    config: &MapConfig,
) -> LayerDraw {
    let mut names: BTreeSet<&str> = inputs.bounds.names().collect();
    names.extend(inputs.boundaries.iter().map(|b| b.name.as_str()));
    if let Some(layout) = inputs.layout {
        names.extend(layout.groups.iter().map(|g| g.name.trim()));
    }

    let params = params_for(inputs.layout, config);
    let mut draw = LayerDraw::default();

    for name in names {
        if selection.region.as_deref() == Some(name) {
            continue;
        }
        let fitted = match GeoProjector::for_region(
            name,
            inputs.boundaries,
            inputs.bounds,
            config.fit_mode,
        ) {
            Ok(fitted) => fitted,
            Err(reason) => {
                draw.skipped.push(SkippedRegion {
                    name: name.to_string(),
                    reason,
                });
                continue;
            }
        };
        let (projector, boundary) = (fitted.projector, fitted.boundary);
        let target = fitted.pixel_bounds.rect();

        let group = inputs.layout.and_then(|l| l.group(&boundary.match_key));
        let contains_selected = match (&selection.word, group) {
            (Some(w), Some(g)) => g.contains_word(w),
            _ => false,
        };
        let opacity = region_opacity(selection, name, contains_selected, config);
        let words = place_group(
            name,
            group,
            &target,
            &params,
            selection,
            opacity,
            &mut draw.dropped,
        );

        let hovered = selection.hovered.as_deref() == Some(name);
        let centroid = projector
            .centroid(&boundary.geometry)
            .unwrap_or_else(|| target.midpoint());
        let hover = (hovered && selection.mode == Mode::RegionSelect).then_some(HoverScale {
            factor: config.hover_scale,
            pivot: centroid,
        });
        let fill = inputs
            .fills
            .and_then(|f| f.get(name))
            .cloned()
            .unwrap_or_else(|| config.neutral_fill.clone());

        draw.regions.push(RegionDraw {
            name: name.to_string(),
            kind: RegionKind::Prefecture,
            path: projector.path_for(&boundary.geometry),
            fill,
            stroke_width: config.region_stroke,
            opacity,
            shadow: hovered || selection.is_cross_highlighted(name),
            hover,
            words,
            bounds: projector.bounds(&boundary.geometry).unwrap_or(target),
            centroid,
            contains_selected,
        });
    }

    draw
}

/// Municipalities of `prefecture`, fitted together into the prefecture's pixel
/// bounds, each with the words of its matching group placed in its own
/// projected bounding box.
pub fn detail_layer(
    prefecture: &str,
    bounds: &BoundsMap,
    municipalities: &BoundarySet,
    layout: Option<&LayoutDataset>,
    selection: &SelectionState,
    config: &MapConfig,
) -> LayerDraw {
    let mut draw = LayerDraw::default();
    let Some(pixel) = bounds.get(prefecture) else {
        draw.skipped.push(SkippedRegion {
            name: prefecture.to_string(),
            reason: SkipReason::MissingBounds,
        });
        return draw;
    };
    let children: Vec<&RegionBoundary> = municipalities.children_of(prefecture).collect();
    let projector = match GeoProjector::fit(
        children.iter().map(|c| &c.geometry),
        &pixel.rect(),
        config.fit_mode,
    ) {
        Ok(p) => p,
        Err(reason) => {
            draw.skipped.push(SkippedRegion {
                name: prefecture.to_string(),
                reason,
            });
            return draw;
        }
    };

    let params = params_for(layout, config);
    let thin = config.is_thin_stroke(prefecture);
    let stroke_width = if thin {
        config.thin_stroke
    } else {
        config.detail_stroke
    };

    for child in children {
        let Some(target) = projector.bounds(&child.geometry) else {
            draw.skipped.push(SkippedRegion {
                name: child.name.clone(),
                reason: SkipReason::MissingGeometry,
            });
            continue;
        };
        let group = layout.and_then(|l| l.group(&child.match_key));
        let contains_selected = match (&selection.word, group) {
            (Some(w), Some(g)) => g.contains_word(w),
            _ => false,
        };
        let opacity = region_opacity(selection, &child.name, contains_selected, config);
        let words = place_group(
            &child.name,
            group,
            &target,
            &params,
            selection,
            opacity,
            &mut draw.dropped,
        );
        let hovered = selection.hovered.as_deref() == Some(child.name.as_str());

        draw.regions.push(RegionDraw {
            name: child.name.clone(),
            kind: RegionKind::Municipality,
            path: projector.path_for(&child.geometry),
            fill: config.neutral_fill.clone(),
            stroke_width,
            opacity,
            shadow: !thin && (hovered || selection.is_cross_highlighted(&child.name)),
            hover: None,
            words,
            centroid: projector
                .centroid(&child.geometry)
                .unwrap_or_else(|| target.midpoint()),
            bounds: target,
            contains_selected,
        });
    }

    draw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::PixelBounds;
    use crate::layout::LayoutConvention;
    use geo::{MultiPolygon, polygon};
    use serde_json::json;

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]])
    }

    fn prefecture(name: &str, x: f64) -> RegionBoundary {
        RegionBoundary {
            kind: RegionKind::Prefecture,
            name: name.into(),
            match_key: name.into(),
            parent: None,
            geometry: square(x, 35.0, 1.0),
        }
    }

    fn municipality(parent: &str, name: &str, x: f64) -> RegionBoundary {
        RegionBoundary {
            kind: RegionKind::Municipality,
            name: name.into(),
            match_key: name.into(),
            parent: Some(parent.into()),
            geometry: square(x, 35.0, 0.5),
        }
    }

    fn bounds() -> BoundsMap {
        let pb = |xlim: [f64; 2]| PixelBounds {
            name: String::new(),
            xlim,
            ylim: [0.0, 100.0],
        };
        BoundsMap::from_entries([
            ("京都府".to_string(), pb([0.0, 100.0])),
            ("大阪府".to_string(), pb([100.0, 200.0])),
            ("東京都".to_string(), pb([300.0, 400.0])),
        ])
    }

    fn boundaries() -> BoundarySet {
        BoundarySet::from_regions(vec![
            prefecture("京都府", 135.0),
            prefecture("大阪府", 136.0),
            prefecture("東京都", 139.0),
            prefecture("奈良県", 137.0),
        ])
    }

    fn layout() -> LayoutDataset {
        let json = json!([
            { "name": "京都府", "data": [
                { "word": "抹茶", "tfidf_score": 0.4, "font_size": 20, "norm_x": 0.1, "norm_y": 0.1 },
                { "word": "寺", "tfidf_score": 0.3, "font_size": 14, "norm_x": 0.5, "norm_y": 0.6,
                  "orientation": 2 }
            ]},
            { "name": "大阪府", "data": [
                { "word": "たこ焼き", "tfidf_score": 0.5, "font_size": 24, "norm_x": 0.2, "norm_y": 0.3 },
                { "word": "壊れ", "tfidf_score": 0.1, "font_size": 0, "norm_x": 0.2, "norm_y": 0.3 }
            ]}
        ])
        .to_string();
        LayoutDataset::from_json(&json, None).unwrap()
    }

    fn nation(selection: &SelectionState, layout: Option<&LayoutDataset>) -> LayerDraw {
        let (bounds, boundaries) = (bounds(), boundaries());
        nation_layer(
            NationInputs {
                bounds: &bounds,
                boundaries: &boundaries,
                layout,
                fills: None,
            },
            selection,
            &MapConfig::default(),
        )
    }

    #[test]
    fn regions_without_the_selected_word_are_dimmed() {
        let layout = layout();
        let mut selection = SelectionState::default();
        selection.toggle_word("抹茶");
        let draw = nation(&selection, Some(&layout));

        let kyoto = draw.region("京都府").unwrap();
        assert!(kyoto.contains_selected);
        assert_eq!(kyoto.opacity, 1.0);
        assert!(kyoto.words.iter().all(|g| g.opacity == 1.0));
        assert!(kyoto.words.iter().any(|g| g.emphasized));

        let osaka = draw.region("大阪府").unwrap();
        assert_eq!(osaka.opacity, 0.25);
        assert!(!osaka.words.is_empty());
        assert!(osaka.words.iter().all(|g| g.opacity == 0.25));
    }

    #[test]
    fn nothing_is_dimmed_without_a_selected_word() {
        let layout = layout();
        let draw = nation(&SelectionState::default(), Some(&layout));
        assert!(draw.regions.iter().all(|r| r.opacity == 1.0));
        assert!(draw
            .regions
            .iter()
            .flat_map(|r| r.words.iter())
            .all(|g| g.opacity == 1.0 && !g.emphasized));
    }

    #[test]
    fn cross_highlighted_regions_are_never_dimmed() {
        let layout = layout();
        let mut selection = SelectionState::default();
        selection.toggle_word("抹茶");
        selection.toggle_cross_highlight("粉もん", ["大阪府".to_string()].into_iter().collect());
        let draw = nation(&selection, Some(&layout));
        let osaka = draw.region("大阪府").unwrap();
        assert_eq!(osaka.opacity, 1.0);
        assert!(osaka.shadow);
    }

    #[test]
    fn empty_layout_draws_outlines_only() {
        let empty = LayoutDataset::from_json("[]", None).unwrap();
        for layout in [None, Some(&empty)] {
            let draw = nation(&SelectionState::default(), layout);
            assert_eq!(draw.regions.len(), 3);
            assert_eq!(draw.glyph_count(), 0);
            assert!(draw.dropped.is_empty());
            assert!(draw.regions.iter().all(|r| !r.path.is_empty()));
        }
    }

    #[test]
    fn missing_bounds_are_skipped_and_bad_glyphs_dropped() {
        let layout = layout();
        let draw = nation(&SelectionState::default(), Some(&layout));
        assert_eq!(
            draw.skipped,
            vec![SkippedRegion {
                name: "奈良県".into(),
                reason: SkipReason::MissingBounds,
            }]
        );
        assert_eq!(draw.dropped.len(), 1);
        assert_eq!(draw.dropped[0].word, "壊れ");
        assert_eq!(draw.dropped[0].error, PlacementError::NonPositiveFont);
        assert_eq!(draw.region("大阪府").unwrap().words.len(), 1);
    }

    #[test]
    fn glyphs_land_inside_their_prefecture_bounds() {
        let layout = layout();
        let draw = nation(&SelectionState::default(), Some(&layout));
        for region in &draw.regions {
            let rect = bounds().get(&region.name).unwrap().rect();
            assert_eq!(region.bounds, rect);
            assert_eq!(region.kind, RegionKind::Prefecture);
            for g in &region.words {
                assert!(rect.contains_point([g.placement.x, g.placement.y], 1e-9));
            }
        }
        let tera = &draw.region("京都府").unwrap().words[1];
        assert_eq!(tera.placement.rotation_deg, 90.0);
        assert!(tera.placement.dy < 0.0);
    }

    #[test]
    fn hover_scales_only_in_region_select_mode() {
        let mut selection = SelectionState::default();
        selection.hover_region(Some("京都府"));
        let draw = nation(&selection, None);
        let kyoto = draw.region("京都府").unwrap();
        assert!(kyoto.shadow);
        assert_eq!(kyoto.hover, None);

        selection.toggle_mode();
        let draw = nation(&selection, None);
        let hover = draw.region("京都府").unwrap().hover.unwrap();
        assert_eq!(hover.factor, 1.1);
        assert_eq!(hover.pivot, draw.region("京都府").unwrap().centroid);
        assert_eq!(draw.region("大阪府").unwrap().hover, None);
    }

    #[test]
    fn drilled_in_prefecture_is_left_to_the_detail_layer() {
        let mut selection = SelectionState::new(Mode::RegionSelect);
        selection.activate("京都府");
        let draw = nation(&selection, None);
        assert!(draw.region("京都府").is_none());
        assert!(draw.region("大阪府").is_some());
    }

    #[test]
    fn fills_fall_back_to_neutral() {
        let (bounds, boundaries) = (bounds(), boundaries());
        let fills: BTreeMap<String, String> =
            [("京都府".to_string(), "#ff0000".to_string())].into_iter().collect();
        let draw = nation_layer(
            NationInputs {
                bounds: &bounds,
                boundaries: &boundaries,
                layout: None,
                fills: Some(&fills),
            },
            &SelectionState::default(),
            &MapConfig::default(),
        );
        assert_eq!(draw.region("京都府").unwrap().fill, "#ff0000");
        assert_eq!(draw.region("大阪府").unwrap().fill, "#ffffff");
        assert_eq!(draw.region("大阪府").unwrap().stroke_width, 1.0);
    }

    fn detail_layout() -> LayoutDataset {
        let json = json!([
            { "name": "京都市", "data": [
                { "word": "寺", "tfidf_score": 0.6, "font_size": 30, "x": 50, "y": 50,
                  "print_area_x": [0, 100], "print_area_y": [0, 100] }
            ]}
        ])
        .to_string();
        LayoutDataset::from_json(&json, Some(LayoutConvention::PrintArea)).unwrap()
    }

    #[test]
    fn detail_layer_fits_municipalities_into_the_prefecture() {
        let munis = BoundarySet::from_regions(vec![
            municipality("京都府", "京都市", 135.0),
            municipality("京都府", "宇治市", 135.5),
            municipality("大阪府", "堺市", 136.0),
        ]);
        let layout = detail_layout();
        let mut selection = SelectionState::default();
        selection.toggle_word("寺");
        let draw = detail_layer(
            "京都府",
            &bounds(),
            &munis,
            Some(&layout),
            &selection,
            &MapConfig::default(),
        );

        assert_eq!(draw.regions.len(), 2);
        let prefecture = bounds().get("京都府").unwrap().rect();
        for r in &draw.regions {
            assert_eq!(r.kind, RegionKind::Municipality);
            assert!(prefecture.contains_rect(&r.bounds, 1e-9));
            assert_eq!(r.stroke_width, 0.5);
            assert_eq!(r.hover, None);
        }

        let kyoto_city = draw.region("京都市").unwrap();
        assert_eq!(kyoto_city.words.len(), 1);
        assert_eq!(kyoto_city.opacity, 1.0);
        let g = &kyoto_city.words[0];
        assert!(kyoto_city.bounds.contains_point([g.placement.x, g.placement.y], 1e-9));

        let uji = draw.region("宇治市").unwrap();
        assert!(uji.words.is_empty());
        assert_eq!(uji.opacity, 0.25);
    }

    #[test]
    fn capital_detail_uses_thin_strokes_without_shadow() {
        let munis = BoundarySet::from_regions(vec![
            municipality("東京都", "千代田区", 139.7),
            municipality("東京都", "八王子市", 139.2),
        ]);
        let mut selection = SelectionState::new(Mode::RegionSelect);
        selection.activate("東京都");
        selection.hover_region(Some("千代田区"));
        let draw = detail_layer("東京都", &bounds(), &munis, None, &selection, &MapConfig::default());
        assert_eq!(draw.regions.len(), 2);
        assert!(draw.regions.iter().all(|r| r.stroke_width == 0.05 && !r.shadow));
        assert_eq!(draw.glyph_count(), 0);
    }

    #[test]
    fn detail_layer_without_bounds_or_children_is_skipped() {
        let munis = BoundarySet::from_regions(vec![municipality("京都府", "京都市", 135.0)]);
        let sel = SelectionState::default();
        let cfg = MapConfig::default();

        let draw = detail_layer("沖縄県", &bounds(), &munis, None, &sel, &cfg);
        assert_eq!(draw.skipped[0].reason, SkipReason::MissingBounds);

        let draw = detail_layer("大阪府", &bounds(), &munis, None, &sel, &cfg);
        assert!(draw.regions.is_empty());
        assert_eq!(draw.skipped[0].reason, SkipReason::MissingGeometry);
    }

    #[test]
    fn hover_transform_pivots_at_centroid() {
        let h = HoverScale {
            factor: 1.1,
            pivot: [10.0, 20.0],
        };
        assert_eq!(h.to_svg(), "translate(10,20) scale(1.1) translate(-10,-20)");
    }
}
