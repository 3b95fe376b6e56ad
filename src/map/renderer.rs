use std::cell::{Ref, RefCell};

use rayon::prelude::*;

use crate::braille::BrailleCanvas;
use crate::map::choropleth::{fill_color, Palette, Rgba};
use crate::map::geometry::{draw_line, draw_thick_line, Ring};
use crate::map::layer::{BoundaryLayer, PickInfo};
use crate::map::projection::Viewport;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Display settings for map layers
#[derive(Clone, Debug, PartialEq)]
pub struct DisplaySettings {
    pub show_basemap: bool,
    pub show_outlines: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_basemap: true,
            show_outlines: true,
            show_labels: true,
        }
    }
}

/// Everything the map widget needs for one frame, in terminal cells
pub struct MapLayers {
    pub cols: usize,
    pub rows: usize,
    /// Opaque cell background, row-major
    pub fills: Vec<Rgba>,
    /// Basemap lines (coastlines, state borders)
    pub basemap: BrailleCanvas,
    /// Municipality outlines
    pub outlines: BrailleCanvas,
    /// (col, row, text) labels
    pub labels: Vec<(u16, u16, String)>,
}

impl MapLayers {
    fn empty() -> Self {
        Self {
            cols: 0,
            rows: 0,
            fills: Vec::new(),
            basemap: BrailleCanvas::new(0, 0),
            outlines: BrailleCanvas::new(0, 0),
            labels: Vec::new(),
        }
    }

    pub fn fill_at(&self, col: usize, row: usize) -> Option<Rgba> {
        (col < self.cols && row < self.rows).then(|| self.fills[row * self.cols + col])
    }
}

/// Inputs a rendered frame depends on. Layers are compared by address.
#[derive(Debug, Clone, PartialEq)]
struct FrameKey {
    layer: usize,
    basemap: (usize, usize),
    selection: Option<String>,
    viewport: Viewport,
    cols: usize,
    rows: usize,
    palette: Palette,
    settings: DisplaySettings,
}

/// Choropleth renderer for the municipality layer
pub struct MapRenderer {
    pub palette: Palette,
    pub settings: DisplaySettings,
    /// Last frame and what it was rendered from
    frame: RefCell<(Option<FrameKey>, MapLayers)>,
}

impl MapRenderer {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            settings: DisplaySettings::default(),
            frame: RefCell::new((None, MapLayers::empty())),
        }
    }

    /// Same as `render`, but reuses the previous frame when none of its inputs changed,
    /// so redraws for the cursor marker alone skip rasterisation.
    pub fn render_cached(
        &self,
        layer: &BoundaryLayer,
        basemap: &[LineString],
        selection: Option<&str>,
        viewport: &Viewport,
        cols: usize,
        rows: usize,
    ) -> Ref<'_, MapLayers> {
        let key = FrameKey {
            layer: layer as *const BoundaryLayer as usize,
            basemap: (basemap.as_ptr() as usize, basemap.len()),
            selection: selection.map(str::to_string),
            viewport: viewport.clone(),
            cols,
            rows,
            palette: self.palette,
            settings: self.settings.clone(),
        };
        let stale = self.frame.borrow().0.as_ref() != Some(&key);
        if stale {
            let layers = self.render(layer, basemap, selection, viewport, cols, rows);
            *self.frame.borrow_mut() = (Some(key), layers);
        }
        Ref::map(self.frame.borrow(), |(_, layers)| layers)
    }

    /// Composited fill of every feature for the given selection, in layer order.
    /// Recomputed for all features on every pass.
    pub fn feature_fills(&self, layer: &BoundaryLayer, selection: Option<&str>) -> Vec<Rgba> {
        layer
            .features()
            .iter()
            .map(|f| fill_color(selection, &f.name, &self.palette).over(self.palette.background))
            .collect()
    }

    /// Render the municipality layer, basemap and labels into a `cols` x `rows` cell grid.
    /// `viewport` must be sized to `cols * 2` x `rows * 4` Braille pixels.
    pub fn render(
        &self,
        layer: &BoundaryLayer,
        basemap: &[LineString],
        selection: Option<&str>,
        viewport: &Viewport,
        cols: usize,
        rows: usize,
    ) -> MapLayers {
        let colors = self.feature_fills(layer, selection);
        let background = self.palette.background;

        // Sample each cell at its centre: cells are 2x4 Braille pixels
        let mut fills = vec![background; cols * rows];
        if cols > 0 {
            fills.par_chunks_mut(cols).enumerate().for_each(|(row, out)| {
                let py = (row * 4) as f64 + 2.0;
                for (col, cell) in out.iter_mut().enumerate() {
                    let px = (col * 2) as f64 + 1.0;
                    let (lon, lat) = viewport.unproject(px, py);
                    if let Some(idx) = layer.feature_index_at(lon, lat) {
                        *cell = colors[idx];
                    }
                }
            });
        }

        let mut basemap_canvas = BrailleCanvas::new(cols, rows);
        if self.settings.show_basemap {
            for line in basemap {
                draw_ring(&mut basemap_canvas, line, viewport, false);
            }
        }

        let visible = layer.visible_indices(&viewport.visible_bounds());

        let mut outlines = BrailleCanvas::new(cols, rows);
        if self.settings.show_outlines {
            for &idx in &visible {
                for polygon in &layer.features()[idx].polygons {
                    for ring in polygon.rings() {
                        draw_ring(&mut outlines, ring, viewport, true);
                    }
                }
            }
        }

        let mut labels = Vec::new();
        if self.settings.show_labels {
            if let Some(selected) = selection {
                if let Some(bounds) = layer.bounds_of(selected) {
                    let (lon, lat) = bounds.center();
                    let (px, py) = viewport.project(lon, lat);
                    if viewport.is_visible(px, py) {
                        // Centre the text on the feature
                        let half = (selected.chars().count() / 2) as i32;
                        let char_x = (px / 2 - half).max(0) as u16;
                        let char_y = (py / 4) as u16;
                        labels.push((char_x, char_y, selected.to_string()));
                    }
                }
            }
        }

        MapLayers {
            cols,
            rows,
            fills,
            basemap: basemap_canvas,
            outlines,
            labels,
        }
    }

    /// Hit-test a Braille pixel position
    pub fn pick<'a>(&self, layer: &'a BoundaryLayer, viewport: &Viewport, px: f64, py: f64) -> PickInfo<'a> {
        let (lon, lat) = viewport.unproject(px, py);
        layer.pick(lon, lat)
    }

    /// Toggle basemap lines
    pub fn toggle_basemap(&mut self) {
        self.settings.show_basemap = !self.settings.show_basemap;
    }

    /// Toggle municipality outlines
    pub fn toggle_outlines(&mut self) {
        self.settings.show_outlines = !self.settings.show_outlines;
    }

    /// Toggle the selection label
    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new(Palette::default())
    }
}

/// Draw a linestring with viewport culling
fn draw_ring(canvas: &mut BrailleCanvas, line: &Ring, viewport: &Viewport, thick: bool) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;

    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon, lat);

        if let Some((prev_x, prev_y)) = prev {
            // Skip antimeridian jumps
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width * 4 && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                if thick {
                    draw_thick_line(canvas, prev_x, prev_y, px, py);
                } else {
                    draw_line(canvas, prev_x, prev_y, px, py);
                }
            }
        }

        prev = Some((px, py));
    }
}
