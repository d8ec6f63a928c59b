//! Normalisation des chaînes : translittération ASCII, majuscules, corrections

use deunicode::deunicode;

/// Anciens noms d'unités administratives encore présents dans le PRG
const REGION_CORRECTIONS: &[(&str, &str)] = &[
    ("JELENIOGORSKI", "KARKONOSKI"),
    ("SITKOWKA-NOWINY", "NOWINY"),
    ("SLUPIA (KONECKA)", "SLUPIA KONECKA"),
];

/// Remplacements appliqués aux champs texte du PRG
///
/// Seul le premier motif présent est appliqué, à toutes ses occurrences.
const PRG_REPLACEMENTS: &[(&str, &str)] = &[
    ("ul. ", ""),
    ("ulica ", ""),
    ("al.", "Aleja"),
    ("Al.", "Aleja"),
    ("pl.", "Plac"),
    ("Pl.", "Plac"),
    ("wTrakcieBudowy", "w trakcie budowy"),
];

/// Supprime les diacritiques et passe en majuscules
///
/// `"Łódź"` → `"LODZ"`, `"Zielona Góra"` → `"ZIELONA GORA"`.
pub fn fold(s: &str) -> String {
    deunicode(s).to_uppercase()
}

/// Nom de powiat ou de gmina prêt pour la recherche dans l'index des régions
pub fn region_name(s: &str) -> String {
    correct_region_name(&fold(s.trim()))
}

/// Applique la table des renommages historiques à un nom déjà replié
pub fn correct_region_name(folded: &str) -> String {
    REGION_CORRECTIONS
        .iter()
        .find(|(old, _)| *old == folded)
        .map(|(_, new)| (*new).to_string())
        .unwrap_or_else(|| folded.to_string())
}

/// Nettoie un champ texte PRG
pub fn clean_prg_field(s: &str) -> String {
    let s = s.trim();
    for (pattern, replacement) in PRG_REPLACEMENTS {
        if s.contains(pattern) {
            return s.replace(pattern, replacement).trim().to_string();
        }
    }
    s.to_string()
}
