//! # sektor
//!
//! Sectorisation spatiale et appariement point adresse → bâtiment pour les
//! registres polonais BDOT10K (bâtiments) et PRG (points adresse).
//!
//! ## Features
//!
//! - Grille `N × N` sur l'emprise de la Pologne, voisinages 3×3
//! - Vérification d'appartenance à la gmina avec repli sur un géocodeur externe
//! - Bâtiment le plus proche en deux phases (centroïdes puis contours exacts)
//! - Index textuel par secteur construit sur des superpermutations de jetons
//! - Aucune I/O : les enregistrements, la reprojection et le géocodeur sont
//!   fournis par l'appelant
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sektor::{MatchConfig, NearestBuildingMatcher, PhraseIndex, SectorGrid, SuperpermTable};
//!
//! let grid = SectorGrid::new(300, BoundingBox::default())?;
//! let matcher = NearestBuildingMatcher::new(grid, MatchConfig::default());
//! let superperms = SuperpermTable::default();
//! let mut phrases = PhraseIndex::new();
//!
//! let stats = matcher.match_points(points.iter_mut(), &candidates, &transform, &mut phrases, &superperms);
//! println!("{} / {} points assigned", stats.assigned, stats.points);
//! ```

pub mod bdot10k;
pub mod containment;
pub mod error;
pub mod grid;
pub mod matcher;
pub mod normalize;
pub mod phrases;
pub mod prg;
pub mod region;
pub mod superperm;
pub mod types;

pub use containment::{ContainmentStats, Geocoder};
pub use error::{GeocodeError, SektorError};
pub use grid::{Neighborhood, SectorCode, SectorGrid, SectorParams};
pub use matcher::{MatchStats, NearestBuildingMatcher};
pub use phrases::{PhraseIndex, SearchParams};
pub use region::{AdminUnit, RegionIndex};
pub use superperm::{superpermutation, SuperpermTable};
pub use types::{
    AddressPoint, BoundingBox, Building, BuildingCandidate, CoordTransform, MatchConfig,
    PointSource,
};

use std::path::Path;

/// Extrait le nom de voïvodie d'un fichier PRG
///
/// Format attendu : `<préfixe>_<voïvodie>.<ext>`, par exemple
/// `PRG_PunktyAdresowe_mazowieckie.ndjson`.
pub fn extract_province(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let name = match stem.rfind('_') {
        Some(pos) => &stem[pos + 1..],
        None => stem,
    };
    if name.is_empty() {
        return None;
    }
    Some(normalize::fold(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_province() {
        assert_eq!(
            extract_province(Path::new("PRG_PunktyAdresowe_mazowieckie.ndjson")),
            Some("MAZOWIECKIE".to_string())
        );
        assert_eq!(
            extract_province(Path::new("/data/prg/punkty_śląskie.ndjson")),
            Some("SLASKIE".to_string())
        );
        assert_eq!(
            extract_province(Path::new("lubuskie.ndjson")),
            Some("LUBUSKIE".to_string())
        );
        assert_eq!(extract_province(Path::new("PRG_.ndjson")), None);
    }
}
