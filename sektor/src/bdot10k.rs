//! Dérivation des bâtiments BDOT10K
//!
//! Un enregistrement brut (contour en EPSG:2180, codes de dictionnaire) est
//! transformé en [`Building`] : libellés résolus, surface multipliée par le
//! nombre d'étages, centroïde et contour en EPSG:4326 arrondis, code de
//! secteur calculé sur le centroïde arrondi.

use std::collections::HashMap;

use geo::{Area, Centroid, Coord, LineString, Polygon};
use serde::Deserialize;

use crate::grid::SectorGrid;
use crate::types::{Building, CoordTransform};
use crate::SektorError;

/// Enregistrement bâtiment tel que fourni par l'extracteur GML
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingRecord {
    /// Anneau extérieur `[easting, northing]` en EPSG:2180
    pub outline: Vec<[f64; 2]>,
    #[serde(default)]
    pub storeys: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub carto_name: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub historic: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Dictionnaires code → libellé
#[derive(Debug, Default, Clone)]
pub struct Dictionaries {
    pub category: HashMap<String, String>,
    pub carto_name: HashMap<String, String>,
    pub condition: HashMap<String, String>,
    pub function: HashMap<String, String>,
}

impl Dictionaries {
    /// Libellé d'un code ; code absent ou inconnu → `""`
    pub fn label(dict: &HashMap<String, String>, code: Option<&str>) -> String {
        code.and_then(|c| dict.get(c)).cloned().unwrap_or_default()
    }

    /// Libellés joints par `" | "` ; un code inconnu efface ce qui précède
    pub fn labels(dict: &HashMap<String, String>, codes: &[String]) -> String {
        let mut out = String::new();
        for code in codes {
            match dict.get(code) {
                Some(label) => {
                    if !out.is_empty() {
                        out.push_str(" | ");
                    }
                    out.push_str(label);
                }
                None => out.clear(),
            }
        }
        out
    }
}

/// Arrondi à `precision` décimales
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

fn round_polygon(polygon: &Polygon<f64>, precision: u32) -> Polygon<f64> {
    let ring: LineString<f64> = polygon
        .exterior()
        .coords()
        .map(|c| Coord {
            x: round_to(c.x, precision),
            y: round_to(c.y, precision),
        })
        .collect();
    Polygon::new(ring, vec![])
}

/// Contour GeoJSON (anneau extérieur)
pub fn outline_geojson(polygon: &Polygon<f64>) -> String {
    let ring: Vec<Vec<f64>> = polygon
        .exterior()
        .coords()
        .map(|c| vec![c.x, c.y])
        .collect();
    geojson::Geometry::new(geojson::Value::Polygon(vec![ring])).to_string()
}

/// Construit un bâtiment à partir d'un enregistrement brut
pub fn derive_building<T: CoordTransform>(
    id: i64,
    record: &BuildingRecord,
    dicts: &Dictionaries,
    grid: &SectorGrid,
    transform: &T,
    precision: u32,
) -> Result<Building, SektorError> {
    let mut coords: Vec<Coord<f64>> = record
        .outline
        .iter()
        .map(|&[x, y]| Coord { x, y })
        .collect();
    coords.dedup();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return Err(SektorError::invalid_geometry(
            id.to_string(),
            format!("outline has {} distinct vertices", coords.len()),
        ));
    }
    if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(SektorError::invalid_geometry(
            id.to_string(),
            "non-finite coordinate",
        ));
    }

    let planar = Polygon::new(LineString::from(coords), vec![]);
    let storeys = record.storeys.unwrap_or(0.0);
    let footprint = planar.unsigned_area();
    let area = if storeys > 0.0 {
        (footprint * storeys) as i64
    } else {
        footprint as i64
    };

    let geographic = transform.polygon_to_geographic(&planar)?;
    let centroid = geographic
        .centroid()
        .ok_or_else(|| SektorError::invalid_geometry(id.to_string(), "empty outline"))?;
    let centroid_lat = round_to(centroid.y(), precision);
    let centroid_lon = round_to(centroid.x(), precision);

    let outline = round_polygon(&geographic, precision);

    Ok(Building {
        id,
        sector_code: grid.sector_code(centroid_lat, centroid_lon),
        category: Dictionaries::label(&dicts.category, record.category.as_deref()),
        carto_name: Dictionaries::label(&dicts.carto_name, record.carto_name.as_deref()),
        condition: Dictionaries::label(&dicts.condition, record.condition.as_deref()),
        function: Dictionaries::labels(&dicts.function, &record.functions),
        storeys,
        historic: record.historic,
        description: record.description.clone().unwrap_or_default(),
        area,
        centroid_lat,
        centroid_lon,
        geojson: outline_geojson(&outline),
        outline,
    })
}
