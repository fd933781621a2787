use std::fmt::Write;

use geo::{BoundingRect, Centroid, LineString, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::boundary::{BoundarySet, RegionBoundary};
use crate::bounds::{BoundsMap, PixelBounds, Rect};
use crate::error::SkipReason;

/// How the geometry's bounding box is fitted into the target rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Each axis scaled independently; the bounding box lands exactly on the target.
    #[default]
    Extent,
    /// One scale for both axes, centered in the target.
    Uniform,
}

/// A region resolved by name, ready to draw.
#[derive(Debug, Clone, Copy)]
pub struct FittedRegion<'a> {
    pub projector: GeoProjector,
    pub boundary: &'a RegionBoundary,
    pub pixel_bounds: &'a PixelBounds,
}

/// Identity projection with the Y axis reflected, fitted to a pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoProjector {
    geo_min_x: f64,
    geo_max_y: f64,
    kx: f64,
    ky: f64,
    tx: f64,
    ty: f64,
}

impl GeoProjector {
    /// Fit one region's geometry into its pixel bounds.
    pub fn project(
        boundary: &RegionBoundary,
        pixel_bounds: &PixelBounds,
        mode: FitMode,
    ) -> Result<Self, SkipReason> {
        Self::fit([&boundary.geometry], &pixel_bounds.rect(), mode)
    }

    /// Look up bounds and geometry by region name, signalling a skip when either is absent.
    pub fn for_region<'a>(
        name: &str,
        boundaries: &'a BoundarySet,
        bounds: &'a BoundsMap,
        mode: FitMode,
    ) -> Result<FittedRegion<'a>, SkipReason> {
        let pixel_bounds = bounds.get(name).ok_or(SkipReason::MissingBounds)?;
        let boundary = boundaries.get(name).ok_or(SkipReason::MissingGeometry)?;
        Ok(FittedRegion {
            projector: Self::project(boundary, pixel_bounds, mode)?,
            boundary,
            pixel_bounds,
        })
    }

    /// Fit the combined bounding box of several geometries into `target`.
    pub fn fit<'a>(
        geometries: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
        target: &Rect,
        mode: FitMode,
    ) -> Result<Self, SkipReason> {
        let extent = geometries
            .into_iter()
            .filter_map(|g| g.bounding_rect())
            .fold(None::<Rect>, |acc, r| {
                let r = Rect::new([r.min().x, r.min().y], [r.max().x, r.max().y]);
                Some(match acc {
                    None => r,
                    Some(a) => Rect::new(
                        [a.min[0].min(r.min[0]), a.min[1].min(r.min[1])],
                        [a.max[0].max(r.max[0]), a.max[1].max(r.max[1])],
                    ),
                })
            })
            .ok_or(SkipReason::MissingGeometry)?;

        if extent.is_degenerate() || target.is_degenerate() {
            return Err(SkipReason::DegenerateGeometry);
        }

        let (gw, gh) = (extent.width(), extent.height());
        let (kx, ky, tx, ty) = match mode {
            FitMode::Extent => (
                target.width() / gw,
                target.height() / gh,
                target.min[0],
                target.min[1],
            ),
            FitMode::Uniform => {
                let k = (target.width() / gw).min(target.height() / gh);
                (
                    k,
                    k,
                    target.min[0] + (target.width() - k * gw) / 2.0,
                    target.min[1] + (target.height() - k * gh) / 2.0,
                )
            }
        };

        Ok(Self {
            geo_min_x: extent.min[0],
            geo_max_y: extent.max[1],
            kx,
            ky,
            tx,
            ty,
        })
    }

    pub fn point(&self, x: f64, y: f64) -> [f64; 2] {
        [
            self.tx + (x - self.geo_min_x) * self.kx,
            self.ty + (self.geo_max_y - y) * self.ky,
        ]
    }

    /// SVG path data, one closed subpath per ring.
    pub fn path_for(&self, geometry: &MultiPolygon<f64>) -> String {
        let mut d = String::new();
        for polygon in &geometry.0 {
            self.push_ring(&mut d, polygon.exterior());
            for interior in polygon.interiors() {
                self.push_ring(&mut d, interior);
            }
        }
        d
    }

    fn push_ring(&self, d: &mut String, ring: &LineString<f64>) {
        let coords = &ring.0;
        let closed = coords.len() > 1 && coords.first() == coords.last();
        let open = if closed {
            &coords[..coords.len() - 1]
        } else {
            &coords[..]
        };
        if open.is_empty() {
            return;
        }
        for (i, c) in open.iter().enumerate() {
            let [x, y] = self.point(c.x, c.y);
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{cmd}{x:.2},{y:.2}");
        }
        d.push('Z');
    }

    /// Projected bounding box. The Y reflection swaps which geographic edge is on top.
    pub fn bounds(&self, geometry: &MultiPolygon<f64>) -> Option<Rect> {
        let r = geometry.bounding_rect()?;
        let a = self.point(r.min().x, r.min().y);
        let b = self.point(r.max().x, r.max().y);
        Some(Rect::new(
            [a[0].min(b[0]), a[1].min(b[1])],
            [a[0].max(b[0]), a[1].max(b[1])],
        ))
    }

    /// Area-weighted centroid in screen space.
    pub fn centroid(&self, geometry: &MultiPolygon<f64>) -> Option<[f64; 2]> {
        let c = geometry.centroid()?;
        Some(self.point(c.x(), c.y()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    fn rect_geometry(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
            (x: x0, y: y0),
        ]])
    }

    fn pixel(xlim: [f64; 2], ylim: [f64; 2]) -> PixelBounds {
        PixelBounds {
            name: "r".into(),
            xlim,
            ylim,
        }
    }

    #[test]
    fn extent_fit_maps_bounding_box_onto_target_with_y_reflected() {
        let geom = rect_geometry(130.0, 30.0, 140.0, 35.0);
        let target = Rect::new([100.0, 200.0], [300.0, 300.0]);
        let p = GeoProjector::fit([&geom], &target, FitMode::Extent).unwrap();

        let nw = p.point(130.0, 35.0);
        assert_close(nw[0], 100.0);
        assert_close(nw[1], 200.0);
        let se = p.point(140.0, 30.0);
        assert_close(se[0], 300.0);
        assert_close(se[1], 300.0);

        assert_eq!(p.bounds(&geom), Some(target));
    }

    #[test]
    fn projected_bounds_stay_inside_pixel_bounds() {
        let shapes = [
            rect_geometry(-3.0, 2.0, 7.5, 2.25),
            rect_geometry(139.1, 35.5, 139.9, 35.9),
            MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 4.0, y: 1.0),
                (x: 2.0, y: 9.0),
                (x: 0.0, y: 0.0),
            ]]),
        ];
        let pb = pixel([12.5, 80.0], [400.0, 401.5]);
        for geom in &shapes {
            for mode in [FitMode::Extent, FitMode::Uniform] {
                let boundary = RegionBoundary {
                    kind: crate::boundary::RegionKind::Prefecture,
                    name: "r".into(),
                    match_key: "r".into(),
                    parent: None,
                    geometry: geom.clone(),
                };
                let p = GeoProjector::project(&boundary, &pb, mode).unwrap();
                let b = p.bounds(geom).unwrap();
                assert!(pb.rect().contains_rect(&b, 1e-9), "{b:?} escapes {pb:?}");
                let c = p.centroid(geom).unwrap();
                assert!(pb.rect().contains_point(c, 1e-9));
            }
        }
    }

    #[test]
    fn uniform_fit_centers_the_short_axis() {
        let geom = rect_geometry(0.0, 0.0, 10.0, 10.0);
        let target = Rect::new([0.0, 0.0], [200.0, 100.0]);
        let p = GeoProjector::fit([&geom], &target, FitMode::Uniform).unwrap();
        assert_eq!(p.bounds(&geom), Some(Rect::new([50.0, 0.0], [150.0, 100.0])));
    }

    #[test]
    fn path_is_deterministic_and_closes_each_ring() {
        let geom = rect_geometry(0.0, 0.0, 1.0, 1.0);
        let p = GeoProjector::fit([&geom], &Rect::new([0.0, 0.0], [10.0, 10.0]), FitMode::Extent)
            .unwrap();
        let d = p.path_for(&geom);
        assert_eq!(d, "M0.00,10.00L10.00,10.00L10.00,0.00L0.00,0.00Z");
        assert_eq!(d, p.path_for(&geom));
    }

    #[test]
    fn missing_inputs_signal_skip() {
        let boundaries = BoundarySet::from_regions(vec![RegionBoundary {
            kind: crate::boundary::RegionKind::Prefecture,
            name: "有る県".into(),
            match_key: "有る県".into(),
            parent: None,
            geometry: rect_geometry(0.0, 0.0, 1.0, 1.0),
        }]);
        let bounds = BoundsMap::from_entries([
            ("有る県".to_string(), pixel([0.0, 10.0], [0.0, 10.0])),
            ("無い県".to_string(), pixel([0.0, 10.0], [0.0, 10.0])),
        ]);

        assert!(GeoProjector::for_region("有る県", &boundaries, &bounds, FitMode::Extent).is_ok());
        assert_eq!(
            GeoProjector::for_region("無い県", &boundaries, &bounds, FitMode::Extent).unwrap_err(),
            SkipReason::MissingGeometry
        );
        assert_eq!(
            GeoProjector::for_region("他県", &boundaries, &bounds, FitMode::Extent).unwrap_err(),
            SkipReason::MissingBounds
        );
    }

    #[test]
    fn flat_geometry_is_degenerate() {
        let line = rect_geometry(0.0, 5.0, 10.0, 5.0);
        assert_eq!(
            GeoProjector::fit([&line], &Rect::new([0.0, 0.0], [1.0, 1.0]), FitMode::Extent),
            Err(SkipReason::DegenerateGeometry)
        );
    }
}
