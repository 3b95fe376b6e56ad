//! End-to-end: datasets on disk, background load, selection and details.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use muni_map::app::{App, LoadStatus};
use muni_map::config::AppConfig;
use muni_map::data::{self, DataError, DataPaths};
use muni_map::map::{MapRenderer, Palette};
use muni_map::ui;
use tempfile::TempDir;

const ATTRIBUTES: &str = r#"[
    {"id": 106, "nombre_municipio": "Toluca", "region": "XIII Toluca",
     "nombre_cabecera": "Toluca de Lerdo", "poblacion_h": 438375, "poblacion_m": 472233,
     "edad_h": 30.1, "edad_m": 31.4, "viviendas_hab": 242000},
    {"id": 54, "nombre_municipio": "Metepec", "region": "VIII Metepec",
     "nombre_cabecera": "Metepec", "poblacion_h": 115000, "poblacion_m": 127307,
     "edad_h": 33, "edad_m": 34.5, "viviendas_hab": 68000},
    {"id": 51, "nombre_municipio": "Lerma", "region": "VII Lerma",
     "nombre_cabecera": "Lerma de Villada", "poblacion_h": 82000, "poblacion_m": 88327,
     "edad_h": 28.2, "edad_m": 29.6, "viviendas_hab": 41000}
]"#;

/// Toluca and Lerma are single squares; Metepec is split into two features,
/// one of them a MultiPolygon. "Ocuilan" has no attribute row.
const GEOMETRY: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"mun_name": "Toluca"},
     "geometry": {"type": "Polygon", "coordinates":
       [[[-99.75, 19.25], [-99.55, 19.25], [-99.55, 19.45], [-99.75, 19.45], [-99.75, 19.25]]]}},
    {"type": "Feature", "properties": {"mun_name": "Metepec"},
     "geometry": {"type": "Polygon", "coordinates":
       [[[-99.55, 19.25], [-99.45, 19.25], [-99.45, 19.35], [-99.55, 19.35], [-99.55, 19.25]]]}},
    {"type": "Feature", "properties": {"mun_name": "Metepec"},
     "geometry": {"type": "MultiPolygon", "coordinates": [
       [[[-99.45, 19.25], [-99.35, 19.25], [-99.35, 19.35], [-99.45, 19.35], [-99.45, 19.25]]],
       [[[-99.55, 19.35], [-99.35, 19.35], [-99.35, 19.45], [-99.55, 19.45], [-99.55, 19.35]]]
     ]}},
    {"type": "Feature", "properties": {"mun_name": "Lerma"},
     "geometry": {"type": "Polygon", "coordinates":
       [[[-99.75, 19.45], [-99.55, 19.45], [-99.55, 19.55], [-99.75, 19.55], [-99.75, 19.45]]]}},
    {"type": "Feature", "properties": {"mun_name": "Ocuilan"},
     "geometry": {"type": "Polygon", "coordinates":
       [[[-99.35, 19.25], [-99.25, 19.25], [-99.25, 19.35], [-99.35, 19.35], [-99.35, 19.25]]]}}
  ]
}"#;

struct Fixture {
    _dir: TempDir,
    paths: DataPaths,
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn fixture_with(attributes: &str, geometry: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths {
        attributes: write(dir.path(), "municipios.json", attributes),
        geometry: write(dir.path(), "geomunicipios.json", geometry),
        basemap: None,
    };
    Fixture { _dir: dir, paths }
}

fn fixture() -> Fixture {
    fixture_with(ATTRIBUTES, GEOMETRY)
}

/// Drive the loader until it leaves `Pending`
fn wait_for_load(app: &mut App) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while app.is_loading() {
        app.poll_load();
        assert!(Instant::now() < deadline, "loader never finished");
        thread::sleep(Duration::from_millis(5));
    }
}

fn loaded_app(fixture: &Fixture) -> App {
    let mut app = App::new(&AppConfig::default(), 120, 40);
    app.start_loading(fixture.paths.clone());
    wait_for_load(&mut app);
    assert!(matches!(app.status, LoadStatus::Ready(_)));
    app
}

/// Terminal cell showing the given coordinate
fn cell_of(app: &App, lon: f64, lat: f64) -> (u16, u16) {
    let inner = ui::map_inner(app.screen());
    let (px, py) = app.viewport.project(lon, lat);
    (inner.x + (px / 2) as u16, inner.y + (py / 4) as u16)
}

fn click(app: &mut App, lon: f64, lat: f64) {
    let (col, row) = cell_of(app, lon, lat);
    app.begin_press(col, row);
    app.end_press(col, row);
}

#[test]
fn loads_both_datasets() {
    let fixture = fixture();
    let atlas = data::load_atlas(&fixture.paths).unwrap();
    assert_eq!(atlas.attributes.len(), 3);
    assert_eq!(atlas.boundaries.len(), 5);
    assert_eq!(atlas.unmatched_features(), vec!["Ocuilan"]);

    let toluca = atlas.attributes.lookup("Toluca").unwrap();
    assert_eq!(toluca.region, "XIII Toluca");
    assert_eq!(toluca.population_male + toluca.population_female, 910_608);
    assert!(atlas.attributes.lookup("toluca").is_none());
}

#[test]
fn duplicate_identifier_is_rejected() {
    let duplicated = r#"[
        {"nombre_municipio": "Toluca", "region": "a", "nombre_cabecera": "a", "poblacion_h": 1,
         "poblacion_m": 1, "edad_h": 1.0, "edad_m": 1.0, "viviendas_hab": 1},
        {"nombre_municipio": "Toluca", "region": "b", "nombre_cabecera": "b", "poblacion_h": 2,
         "poblacion_m": 2, "edad_h": 2.0, "edad_m": 2.0, "viviendas_hab": 2}
    ]"#;
    let fixture = fixture_with(duplicated, GEOMETRY);
    let err = data::load_atlas(&fixture.paths).err().unwrap();
    assert!(err.to_string().contains("Toluca"));
}

#[test]
fn empty_table_fails_the_gate() {
    let fixture = fixture_with("[]", GEOMETRY);
    assert!(matches!(
        data::load_atlas(&fixture.paths),
        Err(DataError::EmptyAttributeTable)
    ));

    let mut app = App::new(&AppConfig::default(), 120, 40);
    app.start_loading(fixture.paths.clone());
    wait_for_load(&mut app);
    assert!(matches!(app.status, LoadStatus::Failed(_)));
    assert!(app.selected_details().is_none());
}

#[test]
fn missing_geometry_file_fails() {
    let mut fixture = fixture();
    fixture.paths.geometry = fixture.paths.geometry.with_file_name("nope.json");
    let err = data::load_atlas(&fixture.paths).err().unwrap();
    assert!(matches!(err, DataError::Read { .. }));
}

#[test]
fn broken_basemap_is_not_fatal() {
    let mut fixture = fixture();
    let dir = fixture.paths.attributes.parent().unwrap().to_path_buf();
    fixture.paths.basemap = Some(write(&dir, "basemap.json", "{not json"));
    let atlas = data::load_atlas(&fixture.paths).unwrap();
    assert!(atlas.basemap.is_empty());
}

#[test]
fn initial_selection_shows_toluca() {
    let fixture = fixture();
    let app = loaded_app(&fixture);
    assert_eq!(app.selection.current(), Some("Toluca"));
    let details = app.selected_details().unwrap();
    assert_eq!(details.seat_name, "Toluca de Lerdo");
    assert_eq!(details.population_male, 438_375);
}

#[test]
fn clicking_metepec_highlights_every_metepec_feature() {
    let fixture = fixture();
    let mut app = loaded_app(&fixture);
    click(&mut app, -99.40, 19.30);
    assert_eq!(app.selection.current(), Some("Metepec"));
    assert_eq!(app.selected_details().unwrap().region, "VIII Metepec");

    let palette = Palette::default();
    let highlighted = palette.highlighted.over(palette.background);
    let unhighlighted = palette.unhighlighted.over(palette.background);
    let atlas = app.atlas().unwrap();
    let fills = MapRenderer::new(palette).feature_fills(&atlas.boundaries, app.selection.current());
    let names: Vec<&str> = atlas.boundaries.features().iter().map(|f| f.name.as_str()).collect();
    for (name, fill) in names.iter().zip(&fills) {
        let expected = if *name == "Metepec" { highlighted } else { unhighlighted };
        assert_eq!(*fill, expected, "{name}");
    }
}

#[test]
fn clicking_empty_map_changes_nothing() {
    let fixture = fixture();
    let mut app = loaded_app(&fixture);
    let revision = app.selection.revision();
    click(&mut app, -99.95, 19.60);
    assert_eq!(app.selection.current(), Some("Toluca"));
    assert_eq!(app.selection.revision(), revision);
}

#[test]
fn feature_without_attributes_is_selectable_but_has_no_details() {
    let fixture = fixture();
    let mut app = loaded_app(&fixture);
    click(&mut app, -99.30, 19.30);
    assert_eq!(app.selection.current(), Some("Ocuilan"));
    assert!(app.selected_details().is_none());
}

#[test]
fn dropdown_lists_table_order_and_selects() {
    let fixture = fixture();
    let mut app = loaded_app(&fixture);
    let names: Vec<&str> = app.atlas().unwrap().attributes.names().collect();
    assert_eq!(names, ["Toluca", "Metepec", "Lerma"]);

    app.open_dropdown();
    app.move_dropdown(2);
    app.confirm_dropdown();
    assert_eq!(app.selection.current(), Some("Lerma"));
    assert_eq!(app.selected_details().unwrap().seat_name, "Lerma de Villada");
}

#[test]
fn projected_geometry_fails_instead_of_hanging() {
    // Same square in UTM-like metres; indexing it cell by cell would never finish
    let projected = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "properties": {"mun_name": "Toluca"},
         "geometry": {"type": "Polygon", "coordinates":
           [[[400000, 2100000], [420000, 2100000], [420000, 2120000], [400000, 2120000], [400000, 2100000]]]}}
      ]
    }"#;
    let fixture = fixture_with(ATTRIBUTES, projected);
    let mut app = App::new(&AppConfig::default(), 120, 40);
    app.start_loading(fixture.paths.clone());
    wait_for_load(&mut app);
    assert!(matches!(&app.status, LoadStatus::Failed(msg) if msg.contains("outside lon/lat ranges")));
}

#[test]
fn basemap_lines_are_loaded() {
    let mut fixture = fixture();
    let dir = fixture.paths.attributes.parent().unwrap().to_path_buf();
    let basemap = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {},
         "geometry": {"type": "LineString", "coordinates": [[-100.0, 19.3], [-99.0, 19.3]]}}
    ]}"#;
    fixture.paths.basemap = Some(write(&dir, "estado.json", basemap));
    let atlas = data::load_atlas(&fixture.paths).unwrap();
    assert_eq!(atlas.basemap, vec![vec![(-100.0, 19.3), (-99.0, 19.3)]]);
}

#[test]
fn retry_after_fixing_the_files() {
    let fixture = fixture_with("[]", GEOMETRY);
    let mut app = App::new(&AppConfig::default(), 120, 40);
    app.start_loading(fixture.paths.clone());
    wait_for_load(&mut app);
    assert!(matches!(app.status, LoadStatus::Failed(_)));

    fs::write(&fixture.paths.attributes, ATTRIBUTES).unwrap();
    app.retry_load();
    assert!(app.is_loading());
    wait_for_load(&mut app);
    assert!(matches!(app.status, LoadStatus::Ready(_)));
    assert_eq!(app.selected_details().unwrap().seat_name, "Toluca de Lerdo");
}

#[test]
fn bundled_sample_data_loads() {
    let config = AppConfig::default();
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let paths = DataPaths {
        attributes: root.join(&config.data.attributes),
        geometry: root.join(&config.data.geometry),
        basemap: None,
    };
    let atlas = data::load_atlas(&paths).unwrap();
    assert!(atlas.unmatched_features().is_empty());
    assert!(atlas.attributes.contains("Toluca"));
    assert!(atlas.boundaries.bounds_of("Toluca").is_some());
}
