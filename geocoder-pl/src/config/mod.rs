//! Configuration du système

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sektor::{BoundingBox, MatchConfig, SectorGrid};

/// Paramètres de l'algorithme et du géocodeur externe
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Résolution de la grille (N × N secteurs)
    pub sector_count: usize,

    /// Emprise couverte par la grille
    pub bbox: BoundingBox,

    /// Projection plane des registres
    #[serde(default = "default_planar_epsg")]
    pub planar_epsg: u32,

    /// Distance maximale d'affectation d'un bâtiment (mètres)
    pub max_dist: f64,

    /// Rayon du filtre autour du centre du secteur (fraction de cellule)
    ///
    /// La valeur par défaut 0.5 limite les candidats aux bâtiments dont le
    /// centroïde est dans la cellule du point ; 1.5 inclut les 8 voisines.
    pub sector_radius: f64,

    /// Nombre de candidats retenus par la distance approximative
    pub top_num: usize,

    /// Décimales conservées sur les coordonnées EPSG:4326
    pub coords_precision: u32,

    /// Lignes par envoi COPY
    pub db_save_freq: usize,

    /// Nombre maximal de jetons permutés par ligne d'index
    pub superperm_max: usize,

    /// Secteurs parcourus après la première correspondance
    pub max_sectors: usize,

    /// Point de départ des recherches
    pub start_lat: f64,
    pub start_lon: f64,

    pub geocoder: GeocoderSettings,
}

/// Paramètres du géocodeur Nominatim
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeocoderSettings {
    pub url: String,
    pub user_agent: String,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
    /// Écart minimal entre deux requêtes (1 req/s sur l'instance publique)
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_planar_epsg() -> u32 {
    2180
}

/// Variables d'environnement acceptées en surcharge
const ENV_OVERRIDES: &[&str] = &[
    "SEKT_NUM",
    "MAX_DIST",
    "SEKT_RAD",
    "TOP_NUM",
    "COORDS_PREC",
    "DB_SAVE_FREQ",
    "MAX_SEKTS",
];

impl Settings {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read settings file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse settings JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "poland" => Self::load_embedded(include_str!("presets/poland.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: poland", preset),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded settings")
    }

    /// Preset ou fichier, surcharges d'environnement, validation
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::load(path)?,
            None => Self::from_preset("poland")?,
        };
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Applique les variables d'environnement `SEKT_NUM`, `MAX_DIST`, ...
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applique des surcharges fournies par `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for &key in ENV_OVERRIDES {
            let Some(raw) = lookup(key) else {
                continue;
            };
            let raw = raw.trim();
            let invalid = || format!("Invalid value for {}: {:?}", key, raw);
            match key {
                "SEKT_NUM" => self.sector_count = raw.parse().with_context(invalid)?,
                "MAX_DIST" => self.max_dist = raw.parse().with_context(invalid)?,
                "SEKT_RAD" => self.sector_radius = raw.parse().with_context(invalid)?,
                "TOP_NUM" => self.top_num = raw.parse().with_context(invalid)?,
                "COORDS_PREC" => self.coords_precision = raw.parse().with_context(invalid)?,
                "DB_SAVE_FREQ" => self.db_save_freq = raw.parse().with_context(invalid)?,
                "MAX_SEKTS" => self.max_sectors = raw.parse().with_context(invalid)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Vérifie la cohérence des paramètres
    pub fn validate(&self) -> Result<()> {
        self.grid()?;
        if !(self.max_dist > 0.0) {
            anyhow::bail!("max_dist must be > 0, got {}", self.max_dist);
        }
        if !(self.sector_radius >= 0.0) {
            anyhow::bail!("sector_radius must be >= 0, got {}", self.sector_radius);
        }
        if self.top_num == 0 {
            anyhow::bail!("top_num must be >= 1");
        }
        if self.db_save_freq == 0 {
            anyhow::bail!("db_save_freq must be >= 1");
        }
        if self.geocoder.max_attempts == 0 {
            anyhow::bail!("geocoder.max_attempts must be >= 1");
        }
        Ok(())
    }

    /// Grille de secteurs décrite par la configuration
    pub fn grid(&self) -> Result<SectorGrid> {
        SectorGrid::new(self.sector_count, self.bbox).context("Invalid sector grid settings")
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            max_dist: self.max_dist,
            sector_radius: self.sector_radius,
            top_num: self.top_num,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_preset_poland() {
        let s = Settings::from_preset("poland").unwrap();
        assert_eq!(s.sector_count, 300);
        assert_eq!(s.bbox, BoundingBox::default());
        assert_eq!(s.planar_epsg, 2180);
        assert_eq!(s.match_config(), MatchConfig::default());
        assert_eq!(s.geocoder.max_attempts, 5);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_unknown_preset() {
        assert!(Settings::from_preset("france").is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [("SEKT_NUM", "150"), ("MAX_DIST", " 25.5 "), ("MAX_SEKTS", "10")]
            .into_iter()
            .collect();
        let mut s = Settings::from_preset("poland").unwrap();
        s.apply_overrides(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.sector_count, 150);
        assert_eq!(s.max_dist, 25.5);
        assert_eq!(s.max_sectors, 10);
        assert_eq!(s.top_num, 10);
    }

    #[test]
    fn test_invalid_override() {
        let mut s = Settings::from_preset("poland").unwrap();
        let err = s
            .apply_overrides(|k| (k == "TOP_NUM").then(|| "dix".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("TOP_NUM"));
    }

    #[test]
    fn test_validate_rejects_empty_grid() {
        let mut s = Settings::from_preset("poland").unwrap();
        s.sector_count = 0;
        assert!(s.validate().is_err());

        let mut s = Settings::from_preset("poland").unwrap();
        s.bbox.min_lat = s.bbox.max_lat;
        assert!(s.validate().is_err());
    }
}
