//! Types d'erreurs pour le crate sektor

use thiserror::Error;

/// Erreurs pouvant survenir lors de la sectorisation et de l'appariement
#[derive(Debug, Error)]
pub enum SektorError {
    /// Erreur d'I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fichier d'entrée obligatoire absent
    #[error("{}", missing_input_message(.path, .url))]
    MissingInput {
        path: String,
        url: Option<&'static str>,
    },

    /// Erreur de parsing d'un enregistrement
    #[error("Parse error in {file}: {reason}")]
    ParseError { file: String, reason: String },

    /// Géométrie invalide
    #[error("Invalid geometry for {entity_id}: {reason}")]
    InvalidGeometry { entity_id: String, reason: String },

    /// Échec de reprojection
    #[error("Reprojection failed: {0}")]
    Reprojection(String),

    /// Configuration de grille invalide
    #[error("Invalid grid configuration: {0}")]
    InvalidGrid(String),

    /// Unité administrative inconnue
    #[error("Unknown administrative unit: {0}")]
    UnknownRegion(String),
}

fn missing_input_message(path: &str, url: &Option<&'static str>) -> String {
    match url {
        Some(url) => format!(
            "Missing required file: {}. Download it from {} and run again",
            path, url
        ),
        None => format!("Missing required file: {}. Provide it and run again", path),
    }
}

impl SektorError {
    /// Crée une erreur de parsing avec contexte
    pub fn parse_error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(entity_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            entity_id: entity_id.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de fichier manquant, avec l'URL de téléchargement si connue
    pub fn missing_input(path: impl Into<String>, url: Option<&'static str>) -> Self {
        Self::MissingInput {
            path: path.into(),
            url,
        }
    }
}

/// Issue d'un appel au géocodeur externe qui n'a pas abouti
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeocodeError {
    /// Le service a répondu 429
    #[error("geocoder rate limited")]
    RateLimited,

    /// Erreur HTTP ou réseau
    #[error("geocoder request failed: {0}")]
    Http(String),

    /// Réponse illisible
    #[error("geocoder response parse error: {0}")]
    Parse(String),

    /// Requête refusée (4xx hors 429), sans nouvelle tentative
    #[error("geocoder rejected request with HTTP {0}")]
    Rejected(u16),

    /// Délai dépassé
    #[error("geocoder request timed out")]
    Timeout,

    /// Toutes les tentatives ont échoué
    #[error("geocoder gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl GeocodeError {
    /// Indique si une nouvelle tentative a un sens
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Http(_) | Self::Timeout)
    }
}
