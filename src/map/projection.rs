use std::f64::consts::PI;

use crate::map::geometry::BBox;

/// Pixels spanned by the whole world at zoom 0
const TILE_SIZE: f64 = 256.0;
const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 18.0;
/// Zoom step per key press / scroll tick
const ZOOM_STEP: f64 = 0.5;
/// Web Mercator latitude limit
const MAX_LAT: f64 = 85.051_128_78;

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude
    pub center_lat: f64,
    /// Web-map zoom level (world width = 256 * 2^zoom pixels)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

#[inline]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

#[inline]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

#[inline]
fn inverse_mercator(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    (lon, lat)
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat: center_lat.clamp(-MAX_LAT, MAX_LAT),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// Pixels per unit of normalized Mercator space
    #[inline]
    fn scale(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.scale();
        let x = mercator_x(self.center_lon) + dx as f64 / scale;
        let y = (mercator_y(self.center_lat) + dy as f64 / scale).clamp(0.0, 1.0);
        let (lon, lat) = inverse_mercator(x, y);

        // Wrap longitude
        self.center_lon = if lon > 180.0 {
            lon - 360.0
        } else if lon < -180.0 {
            lon + 360.0
        } else {
            lon
        };
        self.center_lat = lat.clamp(-MAX_LAT, MAX_LAT);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, ZOOM_STEP);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, -ZOOM_STEP);
    }

    /// Change zoom while keeping the point under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, delta: f64) {
        let (lon, lat) = self.unproject(px as f64, py as f64);

        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);

        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Center on `bounds` at the largest zoom that shows all of it, leaving `margin` (0..1) free
    pub fn fit_bounds(&mut self, bounds: &BBox, margin: f64) {
        if bounds.is_empty() || self.width == 0 || self.height == 0 {
            return;
        }

        let x0 = mercator_x(bounds.min_lon);
        let x1 = mercator_x(bounds.max_lon);
        // y grows southwards
        let y0 = mercator_y(bounds.max_lat);
        let y1 = mercator_y(bounds.min_lat);

        let (lon, lat) = inverse_mercator((x0 + x1) * 0.5, (y0 + y1) * 0.5);
        self.center_lon = lon;
        self.center_lat = lat;

        let usable = (1.0 - margin).clamp(0.1, 1.0);
        let span_x = (x1 - x0).max(f64::EPSILON);
        let span_y = (y1 - y0).max(f64::EPSILON);
        let fit = (self.width as f64 * usable / (span_x * TILE_SIZE))
            .min(self.height as f64 * usable / (span_y * TILE_SIZE));
        self.zoom = fit.log2().clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: f64, py: f64) -> (f64, f64) {
        let scale = self.scale();
        let x = (px - self.width as f64 / 2.0) / scale + mercator_x(self.center_lon);
        let y = (py - self.height as f64 / 2.0) / scale + mercator_y(self.center_lat);
        inverse_mercator(x, y)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let scale = self.scale();
        let px = (mercator_x(lon) - mercator_x(self.center_lon)) * scale + self.width as f64 / 2.0;
        let py = (mercator_y(lat) - mercator_y(self.center_lat)) * scale + self.height as f64 / 2.0;
        (px.floor() as i32, py.floor() as i32)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= 0 && px < self.width as i32 && py >= 0 && py < self.height as i32
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }

    /// Geographic bounds of the visible area
    pub fn visible_bounds(&self) -> BBox {
        let (min_lon, max_lat) = self.unproject(0.0, 0.0);
        let (max_lon, min_lat) = self.unproject(self.width as f64, self.height as f64);
        BBox {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }
}
