//! Types de données pour le crate sektor

use geo::{Coord, Polygon};
use serde::{Deserialize, Serialize};

use crate::grid::SectorCode;
use crate::SektorError;

/// Emprise géographique couverte par la grille (degrés, EPSG:4326)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min_lat: 49.0,
            max_lat: 55.0,
            min_lon: 14.0,
            max_lon: 25.0,
        }
    }
}

/// Paramètres de l'appariement point adresse → bâtiment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Distance maximale d'affectation (mètres, strictement inférieure)
    pub max_dist: f64,
    /// Rayon du filtre autour du centre du secteur, en fraction de cellule
    ///
    /// Avec 0.5, seuls les bâtiments dont le centroïde est dans la cellule
    /// courante sont retenus, même si les 8 voisines sont chargées. Un point
    /// près du bord de sa cellule peut alors manquer un bâtiment voisin plus
    /// proche ; 1.5 couvre les voisines.
    pub sector_radius: f64,
    /// Nombre de candidats retenus par la distance approximative
    pub top_num: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_dist: 50.0,
            sector_radius: 0.5,
            top_num: 10,
        }
    }
}

/// Service de reprojection entre le système géographique et un plan métrique
///
/// Les coordonnées géographiques sont en `(lon, lat)` degrés, les coordonnées
/// planes en `(easting, northing)` mètres.
pub trait CoordTransform {
    /// Géographique → plan métrique
    fn to_planar(&self, coord: Coord<f64>) -> Result<Coord<f64>, SektorError>;

    /// Plan métrique → géographique
    fn to_geographic(&self, coord: Coord<f64>) -> Result<Coord<f64>, SektorError>;

    /// Reprojette un polygone vers le plan métrique
    fn polygon_to_planar(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>, SektorError> {
        map_polygon(polygon, |c| self.to_planar(c))
    }

    /// Reprojette un polygone vers le système géographique
    fn polygon_to_geographic(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>, SektorError> {
        map_polygon(polygon, |c| self.to_geographic(c))
    }
}

fn map_polygon<F>(polygon: &Polygon<f64>, mut f: F) -> Result<Polygon<f64>, SektorError>
where
    F: FnMut(Coord<f64>) -> Result<Coord<f64>, SektorError>,
{
    let exterior = polygon
        .exterior()
        .coords()
        .map(|c| f(*c))
        .collect::<Result<Vec<_>, _>>()?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| ring.coords().map(|c| f(*c)).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(
        exterior.into(),
        interiors.into_iter().map(Into::into).collect(),
    ))
}

/// Projection équirectangulaire locale
///
/// Suffisante sur quelques kilomètres autour de `lat0` ; utilisée pour les
/// tests et les benchmarks.
#[derive(Debug, Clone, Copy)]
pub struct Equirectangular {
    pub lat0: f64,
}

impl Equirectangular {
    const R: f64 = 6_371_008.8;

    pub fn new(lat0: f64) -> Self {
        Self { lat0 }
    }
}

impl CoordTransform for Equirectangular {
    fn to_planar(&self, c: Coord<f64>) -> Result<Coord<f64>, SektorError> {
        Ok(Coord {
            x: Self::R * c.x.to_radians() * self.lat0.to_radians().cos(),
            y: Self::R * c.y.to_radians(),
        })
    }

    fn to_geographic(&self, c: Coord<f64>) -> Result<Coord<f64>, SektorError> {
        Ok(Coord {
            x: (c.x / (Self::R * self.lat0.to_radians().cos())).to_degrees(),
            y: (c.y / Self::R).to_degrees(),
        })
    }
}

/// Provenance des coordonnées d'un point adresse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointSource {
    /// Coordonnées du registre PRG
    Prg,
    /// Coordonnées corrigées par le géocodeur externe
    Osm,
}

impl PointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prg => "PRG",
            Self::Osm => "OSM",
        }
    }
}

/// Point adresse PRG en cours de traitement
#[derive(Debug, Clone, PartialEq)]
pub struct AddressPoint {
    /// Identifiant (égal à l'identifiant de ligne persisté)
    pub id: i64,
    pub woj: String,
    pub powiat: String,
    pub gmina: String,
    pub town: String,
    pub subtown: String,
    pub street: String,
    pub number: String,
    pub postcode: String,
    pub status: String,
    /// Longitude (EPSG:4326)
    pub lon: f64,
    /// Latitude (EPSG:4326)
    pub lat: f64,
    pub source: PointSource,
    /// Point à l'intérieur de sa gmina (ou corrigé)
    pub valid: bool,
    /// Distance à la limite de la gmina (mètres, 0 si à l'intérieur)
    pub boundary_distance: f64,
    /// Bâtiment affecté, `None` si aucun sous `max_dist`
    pub building_id: Option<i64>,
    pub building_distance: f64,
    pub sector_code: Option<SectorCode>,
    /// Description empruntée au bâtiment affecté
    pub extra_description: String,
}

impl AddressPoint {
    /// Coordonnée géographique `(lon, lat)`
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

/// Bâtiment BDOT10K dérivé, prêt à être persisté
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub id: i64,
    pub sector_code: SectorCode,
    pub category: String,
    pub carto_name: String,
    pub condition: String,
    pub function: String,
    pub storeys: f64,
    pub historic: bool,
    pub description: String,
    /// Surface au sol multipliée par le nombre d'étages (m²)
    pub area: i64,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    /// Contour GeoJSON à précision réduite
    pub geojson: String,
    /// Contour en EPSG:4326
    pub outline: Polygon<f64>,
}

/// Bâtiment candidat chargé pour l'appariement
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingCandidate {
    pub id: i64,
    pub description: String,
    /// Centroïde `(lon, lat)`
    pub centroid: Coord<f64>,
    pub sector_code: SectorCode,
    /// Contour en EPSG:4326
    pub outline: Polygon<f64>,
}

impl From<&Building> for BuildingCandidate {
    fn from(b: &Building) -> Self {
        Self {
            id: b.id,
            description: b.description.clone(),
            centroid: Coord {
                x: b.centroid_lon,
                y: b.centroid_lat,
            },
            sector_code: b.sector_code,
            outline: b.outline.clone(),
        }
    }
}
