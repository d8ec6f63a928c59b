//! Normalisation des points adresse PRG

use geo::Coord;
use serde::Deserialize;

use crate::bdot10k::round_to;
use crate::normalize::clean_prg_field;
use crate::types::{AddressPoint, CoordTransform, PointSource};
use crate::SektorError;

/// Point adresse tel que fourni par l'extracteur GML
///
/// `x` est l'easting et `y` le northing en EPSG:2180.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddressRecord {
    pub woj: String,
    pub powiat: String,
    pub gmina: String,
    pub town: String,
    pub subtown: String,
    pub street: String,
    pub number: String,
    pub postcode: String,
    pub status: String,
    pub x: f64,
    pub y: f64,
}

/// Convertit un enregistrement en point adresse EPSG:4326
///
/// Retourne `Ok(None)` si la voïvodie, le powiat ou la gmina manque.
pub fn normalize_record<T: CoordTransform>(
    id: i64,
    record: &AddressRecord,
    transform: &T,
    precision: u32,
) -> Result<Option<AddressPoint>, SektorError> {
    let woj = clean_prg_field(&record.woj);
    let powiat = clean_prg_field(&record.powiat);
    let gmina = clean_prg_field(&record.gmina);
    if woj.is_empty() || powiat.is_empty() || gmina.is_empty() {
        return Ok(None);
    }

    if !record.x.is_finite() || !record.y.is_finite() {
        return Err(SektorError::invalid_geometry(
            id.to_string(),
            format!("invalid coordinates ({}, {})", record.x, record.y),
        ));
    }
    let geo = transform.to_geographic(Coord {
        x: record.x,
        y: record.y,
    })?;

    Ok(Some(AddressPoint {
        id,
        woj,
        powiat,
        gmina,
        town: clean_prg_field(&record.town),
        subtown: clean_prg_field(&record.subtown),
        street: clean_prg_field(&record.street),
        number: clean_prg_field(&record.number),
        postcode: clean_prg_field(&record.postcode),
        status: clean_prg_field(&record.status),
        lon: round_to(geo.x, precision),
        lat: round_to(geo.y, precision),
        source: PointSource::Prg,
        valid: true,
        boundary_distance: 0.0,
        building_id: None,
        building_distance: 0.0,
        sector_code: None,
        extra_description: String::new(),
    }))
}
