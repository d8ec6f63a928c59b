//! Vérification d'appartenance des points adresse à leur gmina
//!
//! Un point est valide s'il se trouve dans l'un des contours de sa gmina
//! (limite incluse). Sinon, l'adresse est envoyée au géocodeur externe : si
//! la coordonnée retournée est nouvelle et tombe dans la gmina, elle remplace
//! l'originale. Dans tous les autres cas le point est marqué invalide avec sa
//! distance (en mètres) au contour le plus proche.

use std::collections::BTreeMap;

use geo::{Coord, EuclideanDistance, Intersects, Point, Polygon};
use tracing::{debug, info, warn};

use crate::bdot10k::round_to;
use crate::region::RegionIndex;
use crate::types::{AddressPoint, CoordTransform, PointSource};
use crate::{GeocodeError, SektorError};

/// Service de géocodage d'adresses en texte libre
///
/// Retourne une coordonnée `(lon, lat)` en EPSG:4326, `None` si l'adresse est
/// inconnue. Les erreurs sont terminales pour le point concerné : la
/// politique de nouvelles tentatives relève de l'implémentation.
#[allow(async_fn_in_trait)]
pub trait Geocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coord<f64>>, GeocodeError>;
}

/// Issue de la vérification d'un point
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Déjà dans sa gmina, aucun appel externe
    Inside,
    /// Coordonnée remplacée par celle du géocodeur
    Resolved,
    /// Hors de sa gmina ; `failure` renseigné si le géocodeur a échoué
    Invalid { failure: Option<GeocodeError> },
}

/// Compteurs d'une passe de vérification
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContainmentStats {
    pub inside: usize,
    pub resolved: usize,
    pub invalid: usize,
    pub geocoder_calls: usize,
    pub geocoder_failures: usize,
    /// Points dont la gmina est absente de l'index des régions
    pub unknown_region: usize,
}

impl ContainmentStats {
    fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Inside => self.inside += 1,
            Resolution::Resolved => {
                self.resolved += 1;
                self.geocoder_calls += 1;
            }
            Resolution::Invalid { failure } => {
                self.invalid += 1;
                self.geocoder_calls += 1;
                if failure.is_some() {
                    self.geocoder_failures += 1;
                }
            }
        }
    }

    pub fn merge(&mut self, other: &ContainmentStats) {
        self.inside += other.inside;
        self.resolved += other.resolved;
        self.invalid += other.invalid;
        self.geocoder_calls += other.geocoder_calls;
        self.geocoder_failures += other.geocoder_failures;
        self.unknown_region += other.unknown_region;
    }
}

/// Adresse postale transmise au géocodeur
pub fn geocode_query(point: &AddressPoint) -> String {
    let mut parts: Vec<&str> = vec![point.number.as_str()];
    if !point.street.is_empty() {
        parts.push(point.street.as_str());
    }
    if !point.subtown.is_empty() {
        parts.push(point.subtown.as_str());
    }
    parts.extend([
        point.town.as_str(),
        point.gmina.as_str(),
        point.powiat.as_str(),
    ]);
    parts.join(", ")
}

/// Le point est dans l'un des contours (limite incluse)
pub fn is_inside(coord: Coord<f64>, polygons: &[&Polygon<f64>]) -> bool {
    polygons.iter().any(|p| p.intersects(&coord))
}

/// Distance plane minimale du point aux contours
pub fn boundary_distance<T: CoordTransform>(
    coord: Coord<f64>,
    polygons: &[&Polygon<f64>],
    transform: &T,
) -> Result<f64, SektorError> {
    let point = Point::from(transform.to_planar(coord)?);
    let mut min = f64::MAX;
    for polygon in polygons {
        let planar = transform.polygon_to_planar(polygon)?;
        min = min.min(point.euclidean_distance(&planar));
    }
    Ok(min)
}

fn same_location(a: Coord<f64>, b: Coord<f64>) -> bool {
    let round = |v: f64| (v * 1000.0).round();
    round(a.x) == round(b.x) && round(a.y) == round(b.y)
}

/// Vérifie un point et le met à jour en place
///
/// Une coordonnée issue du géocodeur est arrondie à `precision` décimales,
/// comme les coordonnées lues dans le fichier source.
pub async fn resolve_point<G, T>(
    point: &mut AddressPoint,
    polygons: &[&Polygon<f64>],
    geocoder: &G,
    transform: &T,
    precision: u32,
) -> Resolution
where
    G: Geocoder,
    T: CoordTransform,
{
    let original = point.coord();
    if is_inside(original, polygons) {
        point.valid = true;
        point.boundary_distance = 0.0;
        return Resolution::Inside;
    }

    let address = geocode_query(point);
    let failure = match geocoder.geocode(&address).await {
        Ok(Some(found)) if !same_location(found, original) && is_inside(found, polygons) => {
            debug!(id = point.id, address = %address, "Point relocated by geocoder");
            point.lon = round_to(found.x, precision);
            point.lat = round_to(found.y, precision);
            point.source = PointSource::Osm;
            point.valid = true;
            point.boundary_distance = 0.0;
            return Resolution::Resolved;
        }
        Ok(_) => None,
        Err(e) => {
            warn!(id = point.id, address = %address, error = %e, "Geocoder failed");
            Some(e)
        }
    };

    point.valid = false;
    point.boundary_distance = match boundary_distance(original, polygons, transform) {
        Ok(d) => d,
        Err(e) => {
            warn!(id = point.id, error = %e, "Boundary distance unavailable");
            f64::MAX
        }
    };
    Resolution::Invalid { failure }
}

/// Vérifie une suite de points appartenant à la même gmina
pub async fn resolve_group<'a, I, G, T>(
    points: I,
    polygons: &[&Polygon<f64>],
    geocoder: &G,
    transform: &T,
    precision: u32,
) -> ContainmentStats
where
    I: IntoIterator<Item = &'a mut AddressPoint>,
    G: Geocoder,
    T: CoordTransform,
{
    let mut stats = ContainmentStats::default();
    for point in points {
        let resolution = resolve_point(point, polygons, geocoder, transform, precision).await;
        stats.record(&resolution);
    }
    stats
}

/// Indices des points regroupés par `(powiat, gmina)`, noms vides exclus
pub fn group_by_region(points: &[AddressPoint]) -> BTreeMap<(String, String), Vec<usize>> {
    let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (idx, p) in points.iter().enumerate() {
        if p.powiat.is_empty() || p.gmina.is_empty() {
            continue;
        }
        groups
            .entry((p.powiat.clone(), p.gmina.clone()))
            .or_default()
            .push(idx);
    }
    groups
}

/// Références mutables vers les éléments d'indices `indices`
///
/// Les indices doivent être strictement croissants, comme ceux produits par
/// [`group_by_region`] ; un indice hors ordre ou hors bornes est ignoré. Le
/// coût est proportionnel à `indices.len()`, pas à la taille de `items`.
pub fn select_mut<'a, T>(items: &'a mut [T], indices: &[usize]) -> Vec<&'a mut T> {
    let mut selected = Vec::with_capacity(indices.len());
    let mut rest = items;
    let mut offset = 0;
    for &idx in indices {
        let Some(skip) = idx.checked_sub(offset) else {
            continue;
        };
        if skip >= rest.len() {
            break;
        }
        let (_, tail) = std::mem::take(&mut rest).split_at_mut(skip);
        let Some((item, tail)) = tail.split_first_mut() else {
            break;
        };
        selected.push(item);
        rest = tail;
        offset = idx + 1;
    }
    selected
}

/// Vérifie tous les points d'une voïvodie, gmina par gmina
///
/// Les points d'une gmina inconnue de l'index sont laissés tels quels.
pub async fn resolve_province<G, T>(
    points: &mut [AddressPoint],
    regions: &RegionIndex,
    geocoder: &G,
    transform: &T,
    precision: u32,
) -> ContainmentStats
where
    G: Geocoder,
    T: CoordTransform,
{
    let mut stats = ContainmentStats::default();

    for ((powiat, gmina), indices) in group_by_region(points) {
        let Some(first) = indices.first().map(|&i| &points[i]) else {
            continue;
        };
        let woj = first.woj.clone();

        let polygons = match regions.polygons_for(&woj, &powiat, &gmina) {
            Ok(polygons) => polygons,
            Err(e) => {
                warn!(powiat = %powiat, gmina = %gmina, error = %e, "Skipping containment check");
                stats.unknown_region += indices.len();
                continue;
            }
        };

        let group = resolve_group(
            select_mut(points, &indices),
            &polygons,
            geocoder,
            transform,
            precision,
        )
        .await;

        info!(
            powiat = %powiat,
            gmina = %gmina,
            points = indices.len(),
            invalid = group.invalid,
            resolved = group.resolved,
            "Municipality checked"
        );
        stats.merge(&group);
    }

    stats
}
