//! Reprojection de coordonnées avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`.

#[cfg(feature = "reproject")]
use anyhow::{Context, Result};
#[cfg(feature = "reproject")]
use proj::Proj;

/// Reprojection entre un plan métrique et WGS84, dans les deux sens
#[cfg(feature = "reproject")]
pub struct Reprojector {
    forward: Proj,
    inverse: Proj,
    planar_epsg: u32,
}

#[cfg(feature = "reproject")]
impl Reprojector {
    /// Crée un reprojector EPSG:`planar_epsg` ⇄ EPSG:4326
    pub fn new(planar_epsg: u32) -> Result<Self> {
        let planar = format!("EPSG:{}", planar_epsg);

        let forward = Proj::new_known_crs("EPSG:4326", &planar, None)
            .with_context(|| format!("Failed to create projection from EPSG:4326 to {}", planar))?;
        let inverse = Proj::new_known_crs(&planar, "EPSG:4326", None)
            .with_context(|| format!("Failed to create projection from {} to EPSG:4326", planar))?;

        Ok(Self {
            forward,
            inverse,
            planar_epsg,
        })
    }

    /// Retourne le SRID du plan métrique
    pub fn planar_epsg(&self) -> u32 {
        self.planar_epsg
    }

    /// `(lon, lat)` → plan métrique
    pub fn to_planar(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        self.forward
            .convert((lon, lat))
            .context("Coordinate transformation failed")
    }

    /// Plan métrique → `(lon, lat)`
    pub fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        self.inverse
            .convert((x, y))
            .context("Coordinate transformation failed")
    }
}
