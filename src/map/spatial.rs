use std::collections::HashMap;

use crate::map::geometry::BBox;

/// Most grid cells one feature may span along either axis. Larger features
/// coarsen the whole grid instead.
const MAX_SPAN_CELLS: f64 = 64.0;

/// Spatial index for polygon features using conservative approximation.
/// Each feature's bounding box is indexed into every cell it overlaps,
/// guaranteeing no false negatives while allowing false positives
/// (eliminated by the exact point-in-polygon test).
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Build from feature bounding boxes, indexed in iteration order.
    /// `cell_size` is a minimum; it grows until no feature spans more than
    /// `MAX_SPAN_CELLS` cells per axis.
    pub fn build<'a>(bboxes: impl Iterator<Item = &'a BBox>, cell_size: f64) -> Self {
        let bboxes: Vec<&BBox> = bboxes.collect();
        let widest = bboxes
            .iter()
            .filter(|bbox| !bbox.is_empty())
            .map(|bbox| (bbox.max_lon - bbox.min_lon).max(bbox.max_lat - bbox.min_lat))
            .fold(0.0_f64, f64::max);
        let mut grid = Self::new(cell_size.max(widest / MAX_SPAN_CELLS));
        for (idx, bbox) in bboxes.into_iter().enumerate() {
            if bbox.is_empty() {
                continue;
            }
            let min_cell = grid.to_cell(bbox.min_lon, bbox.min_lat);
            let max_cell = grid.to_cell(bbox.max_lon, bbox.max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Candidate features whose bounds may contain the point, in ascending index order
    #[inline]
    pub fn query_point(&self, lon: f64, lat: f64) -> &[usize] {
        self.cells
            .get(&self.to_cell(lon, lat))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append feature indices for the given bounds into results vec.
    /// May contain duplicates; caller should dedup after all queries.
    pub fn query_into(&self, bounds: &BBox, results: &mut Vec<usize>) {
        let min_cell = self.to_cell(bounds.min_lon, bounds.min_lat);
        let max_cell = self.to_cell(bounds.max_lon, bounds.max_lat);
        let span = (max_cell.0 as i64 - min_cell.0 as i64 + 1).max(0)
            * (max_cell.1 as i64 - min_cell.1 as i64 + 1).max(0);

        // Wide views cover more cells than are occupied; walk the occupied ones
        if span > self.cells.len() as i64 {
            for (&(x, y), indices) in &self.cells {
                if (min_cell.0..=max_cell.0).contains(&x) && (min_cell.1..=max_cell.1).contains(&y) {
                    results.extend_from_slice(indices);
                }
            }
            return;
        }

        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
    }
}
