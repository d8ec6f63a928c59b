//! Reprojection intelligente : reproject_lite en priorité, fallback sur proj
//!
//! Utilise automatiquement la meilleure option disponible.

use super::ReprojectorLite;
use anyhow::Result;
#[cfg(not(feature = "reproject"))]
use anyhow::bail;
use geo::Coord;
use sektor::{CoordTransform, SektorError};

/// Reprojection intelligente
///
/// Essaie d'abord reproject_lite (pure Rust), puis fallback sur proj si disponible.
pub enum SmartReprojector {
    /// Reprojection légère (pure Rust)
    Lite(ReprojectorLite),
    /// Reprojection via PROJ (si feature activée)
    #[cfg(feature = "reproject")]
    Proj(crate::export::reproject::Reprojector),
}

impl SmartReprojector {
    /// Crée un reprojector entre le plan `planar_epsg` et WGS84
    pub fn new(planar_epsg: u32) -> Result<Self> {
        if ReprojectorLite::is_supported(planar_epsg) {
            return Ok(Self::Lite(ReprojectorLite::new(planar_epsg)?));
        }

        #[cfg(feature = "reproject")]
        {
            let proj = crate::export::reproject::Reprojector::new(planar_epsg)?;
            return Ok(Self::Proj(proj));
        }

        #[cfg(not(feature = "reproject"))]
        bail!(
            "Reprojection EPSG:{} ⇄ EPSG:4326 non supportée.\n\
             Projections supportées (reproject_lite) : 2180 (PUWG 1992)\n\
             Pour d'autres projections, compilez avec: cargo build --features reproject",
            planar_epsg
        );
    }

    /// Retourne une description du reprojector utilisé
    pub fn description(&self) -> &'static str {
        match self {
            Self::Lite(_) => "reproject_lite (pure Rust)",
            #[cfg(feature = "reproject")]
            Self::Proj(_) => "proj (PROJ library)",
        }
    }
}

impl CoordTransform for SmartReprojector {
    fn to_planar(&self, coord: Coord<f64>) -> Result<Coord<f64>, SektorError> {
        let (x, y) = match self {
            Self::Lite(lite) => lite.to_planar(coord.x, coord.y),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.to_planar(coord.x, coord.y),
        }
        .map_err(|e| SektorError::Reprojection(e.to_string()))?;
        Ok(Coord { x, y })
    }

    fn to_geographic(&self, coord: Coord<f64>) -> Result<Coord<f64>, SektorError> {
        let (x, y) = match self {
            Self::Lite(lite) => lite.to_geographic(coord.x, coord.y),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.to_geographic(coord.x, coord.y),
        }
        .map_err(|e| SektorError::Reprojection(e.to_string()))?;
        Ok(Coord { x, y })
    }
}
