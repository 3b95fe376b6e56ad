use geojson::{Feature, GeoJson, Geometry, PolygonType, Value};
use tracing::warn;

use crate::data::DataError;
use crate::map::{is_geographic, LineString, MunicipalityGeometry, Polygon, Ring};

/// Property holding the municipality name on each boundary feature
pub const NAME_PROPERTY: &str = "mun_name";

/// Parse a GeoJSON FeatureCollection of municipality boundaries.
/// Features without a name or without polygonal geometry are skipped.
/// Any position outside lon/lat ranges (e.g. projected metres) fails the whole file.
pub fn parse_boundaries(content: &str) -> Result<Vec<MunicipalityGeometry>, DataError> {
    let geojson: GeoJson = content.parse()?;
    let GeoJson::FeatureCollection(fc) = geojson else {
        return Err(DataError::NotFeatureCollection);
    };

    let mut features = Vec::with_capacity(fc.features.len());
    let mut skipped = 0usize;
    for (idx, feature) in fc.features.iter().enumerate() {
        match municipality_from_feature(feature)? {
            Some(municipality) => features.push(municipality),
            None => {
                skipped += 1;
                warn!(feature = idx, "skipping boundary feature without {NAME_PROPERTY} or polygon geometry");
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, kept = features.len(), "some boundary features were skipped");
    }

    Ok(features)
}

fn municipality_from_feature(feature: &Feature) -> Result<Option<MunicipalityGeometry>, DataError> {
    let Some(name) = feature.property(NAME_PROPERTY).and_then(|v| v.as_str()) else {
        return Ok(None);
    };
    let Some(geometry) = feature.geometry.as_ref() else {
        return Ok(None);
    };

    let mut polygons = Vec::new();
    collect_polygons(geometry, &mut polygons);
    if polygons.is_empty() {
        return Ok(None);
    }

    let outside = polygons
        .iter()
        .flat_map(|polygon| polygon.rings())
        .flatten()
        .find(|&&(lon, lat)| !is_geographic(lon, lat));
    if let Some(&(lon, lat)) = outside {
        return Err(DataError::CoordinateOutOfRange {
            municipality: name.to_string(),
            lon,
            lat,
        });
    }

    Ok(Some(MunicipalityGeometry::new(name, polygons)))
}

fn collect_polygons(geometry: &Geometry, out: &mut Vec<Polygon>) {
    match &geometry.value {
        Value::Polygon(rings) => out.extend(polygon_from_rings(rings)),
        Value::MultiPolygon(polygons) => {
            out.extend(polygons.iter().filter_map(|rings| polygon_from_rings(rings)));
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

fn polygon_from_rings(rings: &PolygonType) -> Option<Polygon> {
    let mut rings = rings.iter().map(|coords| to_ring(coords));
    let exterior = rings.next().filter(|ring| ring.len() >= 3)?;
    Some(Polygon::new(exterior, rings.filter(|ring| ring.len() >= 3).collect()))
}

fn to_ring(coords: &[Vec<f64>]) -> Ring {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| (c[0], c[1]))
        .collect()
}

/// Extract every line of a basemap GeoJSON (lines and polygon rings)
pub fn parse_basemap_lines(content: &str) -> Result<Vec<LineString>, DataError> {
    let geojson: GeoJson = content.parse()?;
    let mut lines = Vec::new();
    process_geojson_lines(&geojson, |line| lines.push(line));
    Ok(lines)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    match &geometry.value {
        Value::LineString(coords) => add_line(to_ring(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(to_ring(coords));
            }
        }
        Value::Polygon(rings) => {
            for coords in rings {
                add_line(to_ring(coords));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                for coords in rings {
                    add_line(to_ring(coords));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}
