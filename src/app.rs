use std::sync::mpsc::{Receiver, TryRecvError};

use ratatui::layout::{Position, Rect};
use tracing::{info, warn};

use crate::config::{AppConfig, ViewConfig};
use crate::data::{self, Atlas, DataError, DataPaths, MunicipalityAttributes};
use crate::map::{MapRenderer, Viewport};
use crate::selection::Selection;
use crate::ui;

/// Where the datasets are in their one-way lifecycle
pub enum LoadStatus {
    Pending,
    Ready(Atlas),
    Failed(String),
}

impl LoadStatus {
    pub fn atlas(&self) -> Option<&Atlas> {
        match self {
            LoadStatus::Ready(atlas) => Some(atlas),
            _ => None,
        }
    }
}

/// Municipality picker. Entry 0 is the "no selection" placeholder,
/// entry `i` is the `i - 1`th row of the attribute table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dropdown {
    pub open: bool,
    pub cursor: usize,
}

impl Dropdown {
    pub fn open_at(&mut self, cursor: usize) {
        self.open = true;
        self.cursor = cursor;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Move the cursor, clamped to `0..entries`
    pub fn move_by(&mut self, delta: i32, entries: usize) {
        let last = entries.saturating_sub(1) as i64;
        self.cursor = (self.cursor as i64 + delta as i64).clamp(0, last) as usize;
    }

    /// Jump to the next entry after the cursor whose name starts with `letter`, wrapping
    pub fn jump_to_letter<'a>(&mut self, letter: char, names: impl Iterator<Item = &'a str>) {
        let names: Vec<&str> = names.collect();
        if names.is_empty() {
            return;
        }
        let letter = letter.to_lowercase().next().unwrap_or(letter);
        let starts_with = |name: &str| {
            name.chars()
                .next()
                .and_then(|c| c.to_lowercase().next())
                .is_some_and(|c| c == letter)
        };
        // cursor is an entry index; names[i] is entry i + 1
        let start = self.cursor.min(names.len());
        let found = (0..names.len())
            .map(|offset| (start + offset) % names.len())
            .find(|&i| starts_with(names[i]));
        if let Some(i) = found {
            self.cursor = i + 1;
        }
    }
}

/// Application state
pub struct App {
    pub status: LoadStatus,
    loader: Option<Receiver<Result<Atlas, DataError>>>,
    paths: Option<DataPaths>,
    pub selection: Selection,
    pub viewport: Viewport,
    home: ViewConfig,
    pub map_renderer: MapRenderer,
    pub dropdown: Dropdown,
    pub attribution: String,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Whether the current press has moved (a drag, not a click)
    dragged: bool,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Terminal size in cells
    screen: Rect,
    dirty: bool,
}

impl App {
    pub fn new(config: &AppConfig, width: u16, height: u16) -> Self {
        let screen = Rect::new(0, 0, width, height);
        let inner = ui::map_inner(screen);
        let view = config.view;
        Self {
            status: LoadStatus::Pending,
            loader: None,
            paths: None,
            selection: Selection::new(config.data.initial_selection()),
            viewport: Viewport::new(
                view.longitude,
                view.latitude,
                view.zoom,
                inner.width as usize * 2,
                inner.height as usize * 4,
            ),
            home: view,
            map_renderer: MapRenderer::new(config.palette.palette()),
            dropdown: Dropdown::default(),
            attribution: config.basemap.attribution.clone(),
            should_quit: false,
            last_mouse: None,
            dragged: false,
            mouse_pos: None,
            screen,
            dirty: true,
        }
    }

    /// Kick off the background load
    pub fn start_loading(&mut self, paths: DataPaths) {
        info!(
            attributes = %paths.attributes.display(),
            geometry = %paths.geometry.display(),
            "loading datasets"
        );
        self.loader = Some(data::spawn_load(paths.clone()));
        self.paths = Some(paths);
        self.status = LoadStatus::Pending;
        self.dirty = true;
    }

    /// Check the loader without blocking. Returns true when the status changed.
    pub fn poll_load(&mut self) -> bool {
        let Some(rx) = &self.loader else {
            return false;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(DataError::LoaderGone),
        };
        self.loader = None;
        self.finish_loading(result);
        true
    }

    /// Leave `Pending`. Has no effect once loading finished.
    pub fn finish_loading(&mut self, result: Result<Atlas, DataError>) {
        if !matches!(self.status, LoadStatus::Pending) {
            return;
        }
        self.status = match result {
            Ok(atlas) => {
                if let Some(current) = self.selection.current() {
                    if !atlas.attributes.contains(current) {
                        warn!(selection = current, "initial selection has no attribute row");
                    }
                }
                LoadStatus::Ready(atlas)
            }
            Err(e) => LoadStatus::Failed(e.to_string()),
        };
        self.dirty = true;
    }

    /// Reload after a failure
    pub fn retry_load(&mut self) {
        if !matches!(self.status, LoadStatus::Failed(_)) {
            return;
        }
        if let Some(paths) = self.paths.clone() {
            self.start_loading(paths);
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, LoadStatus::Pending)
    }

    pub fn atlas(&self) -> Option<&Atlas> {
        self.status.atlas()
    }

    /// Replace the selection and schedule one redraw
    pub fn select(&mut self, identifier: Option<String>) {
        self.selection.select(identifier);
        self.dirty = true;
    }

    /// Attribute row of the selection, if both exist
    pub fn selected_details(&self) -> Option<&MunicipalityAttributes> {
        let name = self.selection.current()?;
        self.atlas()?.attributes.lookup(name)
    }

    /// Consume the pending-redraw flag
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn request_redraw(&mut self) {
        self.dirty = true;
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.screen = Rect::new(0, 0, width, height);
        let inner = ui::map_inner(self.screen);
        self.viewport.width = inner.width as usize * 2;
        self.viewport.height = inner.height as usize * 4;
        self.dirty = true;
    }

    pub fn screen(&self) -> Rect {
        self.screen
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
        self.dirty = true;
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
        self.dirty = true;
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
        self.dirty = true;
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            self.viewport.zoom_in_at(px as i32, py as i32);
            self.dirty = true;
        }
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            self.viewport.zoom_out_at(px as i32, py as i32);
            self.dirty = true;
        }
    }

    /// Back to the configured initial view
    pub fn reset_view(&mut self) {
        self.viewport = Viewport::new(
            self.home.longitude,
            self.home.latitude,
            self.home.zoom,
            self.viewport.width,
            self.viewport.height,
        );
        self.dirty = true;
    }

    /// Zoom to the selected municipality's boundary
    pub fn fit_selection(&mut self) {
        let bounds = self
            .selection
            .current()
            .and_then(|name| self.atlas()?.boundaries.bounds_of(name));
        if let Some(bounds) = bounds {
            self.viewport.fit_bounds(&bounds, 0.2);
            self.dirty = true;
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("z{:.1}", self.viewport.zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format!(
            "{:.3}°{}, {:.3}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// Braille pixel at the centre of a terminal cell, if the cell is on the map
    pub fn cell_to_pixel(&self, col: u16, row: u16) -> Option<(f64, f64)> {
        let inner = ui::map_inner(self.screen);
        if !inner.contains(Position::new(col, row)) {
            return None;
        }
        let px = (col - inner.x) as f64 * 2.0 + 1.0;
        let py = (row - inner.y) as f64 * 4.0 + 2.0;
        Some((px, py))
    }

    /// Update mouse cursor position
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        if self.mouse_pos != Some((col, row)) {
            self.mouse_pos = Some((col, row));
            self.dirty = true;
        }
    }

    /// Left button down
    pub fn begin_press(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Pan by the drag delta since the last mouse position
    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - col as i32;
            let dy = last_y as i32 - row as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
                // One cell is 2x4 Braille pixels
                self.pan(dx * 2, dy * 4);
            }
        }
        self.last_mouse = Some((col, row));
    }

    /// Left button up; a press that did not drag is a click
    pub fn end_press(&mut self, col: u16, row: u16) {
        let was_press = self.last_mouse.is_some();
        self.last_mouse = None;
        if was_press && !self.dragged {
            self.click_at(col, row);
        }
        self.dragged = false;
    }

    /// Route a click: dropdown first, then overlays, then the map
    pub fn click_at(&mut self, col: u16, row: u16) {
        let Some(atlas) = self.status.atlas() else {
            return;
        };
        let point = Position::new(col, row);
        let inner = ui::map_inner(self.screen);
        let entries = atlas.attributes.len() + 1;

        if self.dropdown.open {
            let list = ui::dropdown_rect(inner, true, entries);
            if let Some(entry) = ui::dropdown_entry_at(list, point, self.dropdown.cursor, entries) {
                self.dropdown.cursor = entry;
                self.confirm_dropdown();
            } else {
                self.dropdown.close();
                self.dirty = true;
            }
            return;
        }

        if ui::dropdown_rect(inner, false, entries).contains(point) {
            self.open_dropdown();
            return;
        }

        if self.selected_details().is_some() && ui::details_rect(inner).contains(point) {
            return;
        }

        let Some((px, py)) = self.cell_to_pixel(col, row) else {
            return;
        };
        let pick = self.map_renderer.pick(&atlas.boundaries, &self.viewport, px, py);
        if self.selection.apply_pick(&pick) {
            self.dirty = true;
        }
    }

    /// Open the dropdown with the cursor on the current selection
    pub fn open_dropdown(&mut self) {
        let Some(atlas) = self.status.atlas() else {
            return;
        };
        let cursor = self
            .selection
            .current()
            .and_then(|name| atlas.attributes.position(name))
            .map_or(0, |pos| pos + 1);
        self.dropdown.open_at(cursor);
        self.dirty = true;
    }

    pub fn close_dropdown(&mut self) {
        self.dropdown.close();
        self.dirty = true;
    }

    pub fn move_dropdown(&mut self, delta: i32) {
        if let Some(atlas) = self.status.atlas() {
            let entries = atlas.attributes.len() + 1;
            self.dropdown.move_by(delta, entries);
            self.dirty = true;
        }
    }

    pub fn jump_dropdown(&mut self, letter: char) {
        if let Some(atlas) = self.status.atlas() {
            self.dropdown.jump_to_letter(letter, atlas.attributes.names());
            self.dirty = true;
        }
    }

    /// Select the entry under the cursor and close
    pub fn confirm_dropdown(&mut self) {
        let choice = match self.status.atlas() {
            Some(atlas) => match self.dropdown.cursor {
                0 => None,
                entry => atlas.attributes.rows().get(entry - 1).map(|row| row.identifier.clone()),
            },
            None => return,
        };
        self.dropdown.close();
        self.select(choice);
    }
}
