use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, LoadStatus};

/// Dispatch a key press to the app
pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Only handle key press events (not release)
    if key.kind != KeyEventKind::Press {
        return;
    }

    match app.status {
        LoadStatus::Pending => {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                app.quit();
            }
        }
        LoadStatus::Failed(_) => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => app.quit(),
            KeyCode::Char('R') | KeyCode::Char('r') => app.retry_load(),
            _ => {}
        },
        LoadStatus::Ready(_) if app.dropdown.open => handle_dropdown_key(app, key.code),
        LoadStatus::Ready(_) => handle_map_key(app, key.code),
    }
}

fn handle_dropdown_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc | KeyCode::Tab => app.close_dropdown(),
        KeyCode::Enter => app.confirm_dropdown(),
        KeyCode::Up => app.move_dropdown(-1),
        KeyCode::Down => app.move_dropdown(1),
        KeyCode::PageUp => app.move_dropdown(-10),
        KeyCode::PageDown => app.move_dropdown(10),
        KeyCode::Home => app.move_dropdown(i32::MIN / 2),
        KeyCode::End => app.move_dropdown(i32::MAX / 2),
        KeyCode::Char(c) if c.is_alphabetic() => app.jump_dropdown(c),
        _ => {}
    }
}

fn handle_map_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        KeyCode::Tab | KeyCode::Char('m') => app.open_dropdown(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -8),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 8),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        KeyCode::Char('f') => app.fit_selection(),
        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

        // Layer toggles
        KeyCode::Char('b') => {
            app.map_renderer.toggle_basemap();
            app.request_redraw();
        }
        KeyCode::Char('o') => {
            app.map_renderer.toggle_outlines();
            app.request_redraw();
        }
        KeyCode::Char('L') => {
            app.map_renderer.toggle_labels();
            app.request_redraw();
        }

        _ => {}
    }
}

/// Handle mouse events for picking, panning and zooming
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for cursor marker
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp if app.dropdown.open => app.move_dropdown(-1),
        MouseEventKind::ScrollDown if app.dropdown.open => app.move_dropdown(1),
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Press + release without movement selects, drag pans
        MouseEventKind::Down(MouseButton::Left) => app.begin_press(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_press(mouse.column, mouse.row),
        _ => {}
    }
}
