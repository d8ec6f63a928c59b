//! Définitions des ellipsoïdes

/// Ellipsoïde GRS80 (utilisé par PUWG 1992 / ETRF89)
/// Note: ETRF89 et WGS84 sont confondus à l'échelle du mètre
pub struct GRS80;

impl GRS80 {
    /// Demi-grand axe (rayon équatorial) en mètres
    pub const A: f64 = 6378137.0;

    /// Aplatissement
    pub const F: f64 = 1.0 / 298.257222101;

    /// Première excentricité au carré
    pub const E2: f64 = 2.0 * Self::F - Self::F * Self::F;

    /// Deuxième excentricité au carré
    pub const EP2: f64 = Self::E2 / (1.0 - Self::E2);
}
