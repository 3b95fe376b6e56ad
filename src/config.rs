use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::map::{Palette, Rgba};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "muni-map.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub view: ViewConfig,
    pub palette: PaletteConfig,
    pub basemap: BasemapConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    /// JSON array of municipality attribute rows
    pub attributes: PathBuf,
    /// GeoJSON FeatureCollection of municipality boundaries
    pub geometry: PathBuf,
    /// Municipality selected at startup (empty string = none)
    pub default_selection: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            attributes: PathBuf::from("data/municipios.json"),
            geometry: PathBuf::from("data/geomunicipios_2019.json"),
            default_selection: "Toluca".to_string(),
        }
    }
}

impl DataConfig {
    /// The configured default as an optional selection. Only the empty string
    /// means none; anything else is selected verbatim.
    pub fn initial_selection(&self) -> Option<String> {
        (!self.default_selection.is_empty()).then(|| self.default_selection.clone())
    }
}

/// Initial camera, in web-map terms (zoom 0 = whole world in 256 pixels)
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ViewConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            latitude: 19.3559748494,
            longitude: -99.6453705736,
            zoom: 8.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PaletteConfig {
    pub highlighted: [u8; 4],
    pub unhighlighted: [u8; 4],
    pub line: [u8; 3],
    pub background: [u8; 3],
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            highlighted: [99, 102, 106, 220],
            unhighlighted: [151, 153, 155, 120],
            line: [99, 102, 106],
            // Close to the light "positron" basemap
            background: [250, 250, 248],
        }
    }
}

impl PaletteConfig {
    pub fn palette(&self) -> Palette {
        Palette {
            highlighted: Rgba::from(self.highlighted),
            unhighlighted: Rgba::from(self.unhighlighted),
            line: Rgba::opaque(self.line),
            background: Rgba::opaque(self.background),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BasemapConfig {
    /// Optional GeoJSON of lines (coastlines, state borders) drawn under the polygons
    pub outline: Option<PathBuf>,
    pub attribution: String,
}

impl Default for BasemapConfig {
    fn default() -> Self {
        Self {
            outline: None,
            attribution: "INEGI 2019".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Explicit path must exist; otherwise fall back to the default file, then built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
