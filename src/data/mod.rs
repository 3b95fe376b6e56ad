mod attributes;
mod boundaries;

pub use attributes::{AttributeTable, MunicipalityAttributes};
pub use boundaries::{parse_basemap_lines, parse_boundaries, NAME_PROPERTY};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::map::{BoundaryLayer, LineString};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", .path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<DataError>,
    },
    #[error("invalid attribute table: {0}")]
    Json(#[from] simd_json::Error),
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("boundary data must be a GeoJSON FeatureCollection")]
    NotFeatureCollection,
    #[error("boundary of {municipality:?} has position ({lon}, {lat}) outside lon/lat ranges; geometry must be in WGS84 degrees")]
    CoordinateOutOfRange {
        municipality: String,
        lon: f64,
        lat: f64,
    },
    #[error("municipality {0:?} appears more than once in the attribute table")]
    DuplicateMunicipality(String),
    #[error("municipality {municipality:?} has invalid {field}: {value}")]
    InvalidValue {
        municipality: String,
        field: &'static str,
        value: f64,
    },
    #[error("attribute table is empty")]
    EmptyAttributeTable,
    #[error("dataset loader stopped before delivering a result")]
    LoaderGone,
}

impl DataError {
    fn in_file(self, path: &Path) -> Self {
        DataError::InFile {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }
}

/// Where the datasets live
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub attributes: PathBuf,
    pub geometry: PathBuf,
    pub basemap: Option<PathBuf>,
}

/// Both datasets plus optional basemap lines, immutable once loaded
pub struct Atlas {
    pub attributes: AttributeTable,
    pub boundaries: BoundaryLayer,
    pub basemap: Vec<LineString>,
}

impl Atlas {
    /// Fails on an empty attribute table; nothing can be selected from it
    pub fn new(
        attributes: AttributeTable,
        boundaries: BoundaryLayer,
        basemap: Vec<LineString>,
    ) -> Result<Self, DataError> {
        if attributes.is_empty() {
            return Err(DataError::EmptyAttributeTable);
        }
        Ok(Self {
            attributes,
            boundaries,
            basemap,
        })
    }

    /// Names of boundary features with no attribute row, deduplicated, in layer order
    pub fn unmatched_features(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for feature in self.boundaries.features() {
            let name = feature.name.as_str();
            if !self.attributes.contains(name) && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

pub fn load_attributes(path: &Path) -> Result<AttributeTable, DataError> {
    let mut bytes = fs::read(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    AttributeTable::from_json_slice(&mut bytes).map_err(|e| e.in_file(path))
}

pub fn load_boundaries(path: &Path) -> Result<BoundaryLayer, DataError> {
    let content = read_to_string(path)?;
    let features = parse_boundaries(&content).map_err(|e| e.in_file(path))?;
    Ok(BoundaryLayer::new(features))
}

/// A missing or broken basemap is not fatal; the map just has no underlay
fn load_basemap(path: Option<&Path>) -> Vec<LineString> {
    let Some(path) = path else {
        return Vec::new();
    };
    let result = read_to_string(path)
        .and_then(|content| parse_basemap_lines(&content).map_err(|e| e.in_file(path)));
    match result {
        Ok(lines) => {
            debug!(path = %path.display(), lines = lines.len(), "basemap loaded");
            lines
        }
        Err(e) => {
            warn!("failed to load basemap: {e}");
            Vec::new()
        }
    }
}

fn read_to_string(path: &Path) -> Result<String, DataError> {
    fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and join all datasets, parsing the files in parallel
pub fn load_atlas(paths: &DataPaths) -> Result<Atlas, DataError> {
    let _span = tracing::info_span!("load_atlas").entered();
    let started = Instant::now();

    let (attributes, (boundaries, basemap)) = rayon::join(
        || load_attributes(&paths.attributes),
        || {
            rayon::join(
                || load_boundaries(&paths.geometry),
                || load_basemap(paths.basemap.as_deref()),
            )
        },
    );

    let atlas = Atlas::new(attributes?, boundaries?, basemap)?;

    let unmatched = atlas.unmatched_features();
    if !unmatched.is_empty() {
        warn!(
            count = unmatched.len(),
            names = ?unmatched,
            "boundary features without attribute rows; they stay selectable but show no details"
        );
    }

    info!(
        municipalities = atlas.attributes.len(),
        features = atlas.boundaries.len(),
        basemap_lines = atlas.basemap.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "datasets loaded"
    );

    Ok(atlas)
}

/// Load on the rayon pool; the receiver yields exactly one result
pub fn spawn_load(paths: DataPaths) -> Receiver<Result<Atlas, DataError>> {
    let (tx, rx) = mpsc::channel();
    rayon::spawn(move || {
        let result = load_atlas(&paths);
        if let Err(e) = &result {
            warn!("dataset load failed: {e}");
        }
        // Receiver gone means the UI already quit
        let _ = tx.send(result);
    });
    rx
}
