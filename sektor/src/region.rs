//! Index des unités administratives (voïvodies, powiats, gminy)
//!
//! Les unités sont identifiées par leur code TERYT : 2 chiffres pour une
//! voïvodie, 4 pour un powiat, 7 pour une gmina. Les clés de recherche sont
//! construites à partir des noms repliés : `"WOJ"`, `"WOJ;POW"`,
//! `"WOJ;POW;GMINA"`. Plusieurs codes peuvent partager une clé (parties
//! urbaine et rurale d'une même gmina).

use std::collections::HashMap;

use geo::Polygon;
use tracing::warn;

use crate::normalize::{fold, region_name};
use crate::SektorError;

/// Unité administrative avec ses contours en EPSG:4326
#[derive(Debug, Clone, PartialEq)]
pub struct AdminUnit {
    /// Code TERYT
    pub code: String,
    pub name: String,
    /// Anneaux extérieurs des parties de l'unité
    pub polygons: Vec<Polygon<f64>>,
}

/// Table plate clé de nom → codes TERYT → contours
#[derive(Debug, Default, Clone)]
pub struct RegionIndex {
    codes_by_key: HashMap<String, Vec<String>>,
    key_by_code: HashMap<String, String>,
    polygons: HashMap<String, Vec<Polygon<f64>>>,
}

impl RegionIndex {
    /// Construit l'index ; les unités sont traitées par code croissant pour
    /// que les parents précèdent leurs enfants
    pub fn from_units(mut units: Vec<AdminUnit>) -> Self {
        units.sort_by(|a, b| a.code.cmp(&b.code));

        let mut index = Self::default();
        for unit in units {
            let name = fold(unit.name.trim()).replace("POWIAT ", "");
            let key = match unit.code.len() {
                0..=2 => name,
                3..=4 => index.child_key(unit.code.get(..2).unwrap_or_default(), &name),
                _ => index.child_key(unit.code.get(..4).unwrap_or_default(), &name),
            };

            let codes = index.codes_by_key.entry(key.clone()).or_default();
            if !codes.contains(&unit.code) {
                codes.push(unit.code.clone());
            }
            index.key_by_code.insert(unit.code.clone(), key);
            index
                .polygons
                .entry(unit.code)
                .or_default()
                .extend(unit.polygons);
        }
        index
    }

    fn child_key(&self, parent_code: &str, name: &str) -> String {
        match self.key_by_code.get(parent_code) {
            Some(parent) => format!("{};{}", parent, name),
            None => {
                warn!(parent = parent_code, name, "Administrative unit without parent");
                name.to_string()
            }
        }
    }

    /// Clé de recherche d'une gmina à partir des noms bruts du PRG
    pub fn region_key(woj: &str, powiat: &str, gmina: &str) -> String {
        format!(
            "{};{};{}",
            fold(woj.trim()),
            region_name(powiat),
            region_name(gmina)
        )
    }

    /// Codes TERYT associés à une clé
    pub fn codes(&self, key: &str) -> Option<&[String]> {
        self.codes_by_key.get(key).map(Vec::as_slice)
    }

    /// Contours de tous les codes partageant la clé de la gmina
    pub fn polygons_for(
        &self,
        woj: &str,
        powiat: &str,
        gmina: &str,
    ) -> Result<Vec<&Polygon<f64>>, SektorError> {
        let key = Self::region_key(woj, powiat, gmina);
        let codes = self
            .codes(&key)
            .ok_or_else(|| SektorError::UnknownRegion(key.clone()))?;

        Ok(codes
            .iter()
            .filter_map(|code| self.polygons.get(code))
            .flatten()
            .collect())
    }

    /// Nombre de clés distinctes
    pub fn len(&self) -> usize {
        self.codes_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes_by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, y: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
            (x: x, y: y),
        ]
    }

    fn unit(code: &str, name: &str, polygons: Vec<Polygon<f64>>) -> AdminUnit {
        AdminUnit {
            code: code.into(),
            name: name.into(),
            polygons,
        }
    }

    fn sample() -> RegionIndex {
        // Ordre volontairement mélangé
        RegionIndex::from_units(vec![
            unit("0206011", "Jelenia Góra", vec![square(15.0, 50.0)]),
            unit("0206", "powiat karkonoski", vec![]),
            unit("02", "dolnośląskie", vec![]),
            unit("2604", "powiat kielecki", vec![]),
            unit("26", "świętokrzyskie", vec![]),
            unit("2604112", "Nowiny", vec![square(20.0, 50.0)]),
            unit("2604113", "Nowiny", vec![square(21.0, 50.0)]),
        ])
    }

    #[test]
    fn test_keys() {
        let index = sample();
        assert_eq!(index.codes("DOLNOSLASKIE"), Some(&["02".to_string()][..]));
        assert_eq!(
            index.codes("DOLNOSLASKIE;KARKONOSKI"),
            Some(&["0206".to_string()][..])
        );
        assert_eq!(
            index.codes("SWIETOKRZYSKIE;KIELECKI;NOWINY"),
            Some(&["2604112".to_string(), "2604113".to_string()][..])
        );
        assert_eq!(index.len(), 6);
    }

    #[test]
    fn test_lookup_with_corrections() {
        let index = sample();
        let polys = index
            .polygons_for("dolnośląskie", "jeleniogórski", "Jelenia Góra")
            .unwrap();
        assert_eq!(polys.len(), 1);

        let polys = index
            .polygons_for("świętokrzyskie", "kielecki", "Sitkówka-Nowiny")
            .unwrap();
        assert_eq!(polys.len(), 2);
    }

    #[test]
    fn test_unknown_region() {
        let index = sample();
        let err = index.polygons_for("mazowieckie", "warszawa", "Warszawa");
        assert!(matches!(err, Err(SektorError::UnknownRegion(_))));
    }
}
