//! Projection PUWG 1992 (EPSG:2180)
//!
//! Mercator transverse sur GRS80 : méridien central 19°E, facteur d'échelle
//! 0,9993, false easting 500 000 m, false northing −5 300 000 m.

use super::ellipsoid::GRS80;
use super::Geographic;
use anyhow::{bail, Result};

const K0: f64 = 0.9993;
const LON0_DEG: f64 = 19.0;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING: f64 = -5_300_000.0;

/// Longueur de l'arc de méridien depuis l'équateur
fn meridian_arc(phi: f64) -> f64 {
    let e2 = GRS80::E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    GRS80::A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Convertit des coordonnées géographiques en PUWG 1992 `(easting, northing)`
pub fn geographic_to_puwg92(geo: Geographic) -> Result<(f64, f64)> {
    if !geo.lon.is_finite() || !geo.lat.is_finite() {
        bail!("Coordonnée géographique invalide");
    }
    let ep2 = GRS80::EP2;
    let phi = geo.lat;
    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let tan_phi = phi.tan();

    let n = GRS80::A / (1.0 - GRS80::E2 * sin_phi.powi(2)).sqrt();
    let t = tan_phi.powi(2);
    let c = ep2 * cos_phi.powi(2);
    let a = (geo.lon - LON0_DEG.to_radians()) * cos_phi;

    let x = K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t.powi(2) + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0);
    let y = K0
        * (meridian_arc(phi)
            + n * tan_phi
                * (a.powi(2) / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c.powi(2)) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t.powi(2) + 600.0 * c - 330.0 * ep2) * a.powi(6)
                        / 720.0));

    Ok((x + FALSE_EASTING, y + FALSE_NORTHING))
}

/// Convertit PUWG 1992 `(easting, northing)` vers des coordonnées géographiques
pub fn puwg92_to_geographic(x: f64, y: f64) -> Result<Geographic> {
    if !x.is_finite() || !y.is_finite() {
        bail!("Coordonnée PUWG 1992 invalide: ({}, {})", x, y);
    }
    let a = GRS80::A;
    let e2 = GRS80::E2;
    let ep2 = GRS80::EP2;

    // Coordonnées réduites
    let x = x - FALSE_EASTING;
    let y = y - FALSE_NORTHING;

    // Latitude du pied de la perpendiculaire
    let m = y / K0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let n1 = a / (1.0 - e2 * sin_phi1.powi(2)).sqrt();
    let t1 = tan_phi1.powi(2);
    let c1 = ep2 * cos_phi1.powi(2);
    let r1 = a * (1.0 - e2) / (1.0 - e2 * sin_phi1.powi(2)).powf(1.5);
    let d = x / (n1 * K0);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2) - 252.0 * ep2 - 3.0 * c1.powi(2))
                    * d.powi(6)
                    / 720.0);

    let lon = LON0_DEG.to_radians()
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2))
                * d.powi(5)
                / 120.0)
            / cos_phi1;

    Ok(Geographic::new(lon, lat))
}
