//! Reprojection légère en Rust pur (sans dépendances externes)
//!
//! Supporte la projection des registres polonais :
//! - PUWG 1992 (EPSG:2180) ⇄ WGS84 (EPSG:4326)

mod ellipsoid;
mod puwg92;
mod smart;

pub use smart::SmartReprojector;

use anyhow::{bail, Result};

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Reprojection légère entre un plan métrique polonais et WGS84
pub struct ReprojectorLite {
    planar_epsg: u32,
}

impl ReprojectorLite {
    /// Crée un nouveau reprojector
    pub fn new(planar_epsg: u32) -> Result<Self> {
        if !Self::is_supported(planar_epsg) {
            bail!(
                "EPSG:{} non supporté. Projections supportées: 2180",
                planar_epsg
            );
        }
        Ok(Self { planar_epsg })
    }

    /// Vérifie si la projection plane est supportée
    pub fn is_supported(epsg: u32) -> bool {
        matches!(epsg, 2180)
    }

    pub fn planar_epsg(&self) -> u32 {
        self.planar_epsg
    }

    /// Plan métrique → `(lon, lat)` en degrés
    pub fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self.planar_epsg {
            2180 => Ok(puwg92::puwg92_to_geographic(x, y)?.to_degrees()),
            _ => bail!("EPSG:{} non supporté", self.planar_epsg),
        }
    }

    /// `(lon, lat)` en degrés → plan métrique
    pub fn to_planar(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        match self.planar_epsg {
            2180 => puwg92::geographic_to_puwg92(Geographic::from_degrees(lon, lat)),
            _ => bail!("EPSG:{} non supporté", self.planar_epsg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_puwg92_to_wgs84() {
        // Varsovie (environ)
        let reproj = ReprojectorLite::new(2180).unwrap();
        let (lon, lat) = reproj.to_geographic(637382.2, 486757.2).unwrap();

        assert!((lon - 21.0122).abs() < 1e-5, "lon={}", lon);
        assert!((lat - 52.2297).abs() < 1e-5, "lat={}", lat);
    }

    #[test]
    fn test_round_trip() {
        let reproj = ReprojectorLite::new(2180).unwrap();
        let (x, y) = reproj.to_planar(18.65, 54.35).unwrap();
        let (lon, lat) = reproj.to_geographic(x, y).unwrap();
        assert!((lon - 18.65).abs() < 1e-7);
        assert!((lat - 54.35).abs() < 1e-7);
    }

    #[test]
    fn test_unsupported_epsg() {
        assert!(ReprojectorLite::new(2154).is_err());
        assert!(ReprojectorLite::new(4326).is_err());
    }
}
