use ratatui::style::Color;

/// 8-bit RGBA colour as used by the fill layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Source-over composite onto `background`. The result is opaque.
    pub fn over(self, background: Rgba) -> Rgba {
        let a = self.a as u32;
        let blend = |fg: u8, bg: u8| ((fg as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8;
        Rgba {
            r: blend(self.r, background.r),
            g: blend(self.g, background.g),
            b: blend(self.b, background.b),
            a: 255,
        }
    }

    /// Terminal true colour (alpha ignored)
    pub fn to_color(self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }
}

impl From<[u8; 4]> for Rgba {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

/// Colours of the municipality layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub highlighted: Rgba,
    pub unhighlighted: Rgba,
    pub line: Rgba,
    pub background: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            highlighted: Rgba::new(99, 102, 106, 220),
            unhighlighted: Rgba::new(151, 153, 155, 120),
            line: Rgba::opaque([99, 102, 106]),
            background: Rgba::opaque([250, 250, 248]),
        }
    }
}

/// Fill colour of a polygon given the current selection.
///
/// Exact, case-sensitive name match means highlighted; everything else,
/// including "no selection", is unhighlighted.
#[inline]
pub fn fill_color(selection: Option<&str>, feature_name: &str, palette: &Palette) -> Rgba {
    match selection {
        Some(selected) if selected == feature_name => palette.highlighted,
        _ => palette.unhighlighted,
    }
}
