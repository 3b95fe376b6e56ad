use crate::map::geometry::{BBox, Polygon};
use crate::map::spatial::FeatureGrid;

/// Grid cell size for the feature index, in degrees
const GRID_CELL_DEGREES: f64 = 0.1;

/// One municipality boundary feature
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityGeometry {
    /// Value of the `mun_name` property; joins to the attribute table
    pub name: String,
    pub polygons: Vec<Polygon>,
    pub bbox: BBox,
}

impl MunicipalityGeometry {
    pub fn new(name: impl Into<String>, polygons: Vec<Polygon>) -> Self {
        let bbox = polygons
            .iter()
            .fold(BBox::EMPTY, |bb, polygon| bb.union(polygon.bbox()));
        Self {
            name: name.into(),
            polygons,
            bbox,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.bbox.contains(lon, lat) && self.polygons.iter().any(|p| p.contains(lon, lat))
    }
}

/// Result of hit-testing a screen position against the municipality layer
#[derive(Debug, Clone, Copy)]
pub struct PickInfo<'a> {
    /// Feature under the cursor, if any
    pub object: Option<&'a MunicipalityGeometry>,
    pub lon: f64,
    pub lat: f64,
}

/// Read-only polygon layer with a spatial index for picking and rasterisation
pub struct BoundaryLayer {
    features: Vec<MunicipalityGeometry>,
    grid: FeatureGrid,
    bounds: BBox,
}

impl BoundaryLayer {
    pub fn new(features: Vec<MunicipalityGeometry>) -> Self {
        let grid = FeatureGrid::build(features.iter().map(|f| &f.bbox), GRID_CELL_DEGREES);
        let bounds = features
            .iter()
            .fold(BBox::EMPTY, |bb, feature| bb.union(feature.bbox));
        Self {
            features,
            grid,
            bounds,
        }
    }

    pub fn features(&self) -> &[MunicipalityGeometry] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounds of every feature
    pub fn bounds(&self) -> BBox {
        self.bounds
    }

    /// Index of the topmost feature containing the point.
    /// Later features draw over earlier ones, so the highest index wins.
    #[inline]
    pub fn feature_index_at(&self, lon: f64, lat: f64) -> Option<usize> {
        self.grid
            .query_point(lon, lat)
            .iter()
            .rev()
            .copied()
            .find(|&idx| self.features[idx].contains(lon, lat))
    }

    pub fn pick(&self, lon: f64, lat: f64) -> PickInfo<'_> {
        PickInfo {
            object: self.feature_index_at(lon, lat).map(|idx| &self.features[idx]),
            lon,
            lat,
        }
    }

    /// Bounds of all features tagged `name`
    pub fn bounds_of(&self, name: &str) -> Option<BBox> {
        let bounds = self
            .features
            .iter()
            .filter(|f| f.name == name)
            .fold(BBox::EMPTY, |bb, f| bb.union(f.bbox));
        (!bounds.is_empty()).then_some(bounds)
    }

    /// Indices of features whose bounds overlap `view`, ascending
    pub fn visible_indices(&self, view: &BBox) -> Vec<usize> {
        let mut indices = Vec::new();
        self.grid.query_into(view, &mut indices);
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(name: &str, min_lon: f64, min_lat: f64, size: f64) -> MunicipalityGeometry {
        let ring = vec![
            (min_lon, min_lat),
            (min_lon + size, min_lat),
            (min_lon + size, min_lat + size),
            (min_lon, min_lat + size),
            (min_lon, min_lat),
        ];
        MunicipalityGeometry::new(name, vec![Polygon::new(ring, Vec::new())])
    }

    fn layer() -> BoundaryLayer {
        BoundaryLayer::new(vec![
            square("Toluca", -99.8, 19.2, 0.2),
            square("Metepec", -99.6, 19.2, 0.1),
        ])
    }

    #[test]
    fn test_pick_hits_feature() {
        let layer = layer();
        let pick = layer.pick(-99.55, 19.25);
        assert_eq!(pick.object.map(|f| f.name.as_str()), Some("Metepec"));
        let pick = layer.pick(-99.7, 19.3);
        assert_eq!(pick.object.map(|f| f.name.as_str()), Some("Toluca"));
    }

    #[test]
    fn test_pick_miss() {
        let layer = layer();
        assert!(layer.pick(-98.0, 19.25).object.is_none());
        // Inside the grid cell but outside every polygon
        assert!(layer.pick(-99.55, 19.35).object.is_none());
    }

    #[test]
    fn test_overlap_prefers_later_feature() {
        let layer = BoundaryLayer::new(vec![
            square("Bottom", 0.0, 0.0, 1.0),
            square("Top", 0.25, 0.25, 0.5),
        ]);
        assert_eq!(layer.feature_index_at(0.5, 0.5), Some(1));
        assert_eq!(layer.feature_index_at(0.1, 0.1), Some(0));
    }

    #[test]
    fn test_bounds() {
        let layer = layer();
        let bounds = layer.bounds();
        assert!((bounds.min_lon + 99.8).abs() < 1e-9);
        assert!((bounds.max_lon + 99.5).abs() < 1e-9);
        assert!(layer.bounds_of("Metepec").is_some());
        assert!(layer.bounds_of("Zinacantepec").is_none());
    }
}
