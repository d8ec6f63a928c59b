//! Lecture des fichiers d'entrée
//!
//! - enregistrements NDJSON (bâtiments BDOT10K, points PRG)
//! - dictionaires CSV `code;libellé` sans en-tête
//! - contours des unités administratives en GeoJSON (EPSG:4326)

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use geo::{LineString, Polygon};
use regex::Regex;
use serde::de::DeserializeOwned;
use sektor::bdot10k::Dictionaries;
use sektor::{AdminUnit, SektorError};
use tracing::warn;

/// Contours des unités administratives (PRG)
pub const REGIONS_URL: &str = "https://dane.gov.pl/pl/dataset/726,panstwowy-rejestr-granic-i-powierzchni-jednostek-podziaow-terytorialnych-kraju/resource/29515";

/// Points adresse PRG
pub const PRG_URL: &str = "https://dane.gov.pl/pl/dataset/726,panstwowy-rejestr-granic-i-powierzchni-jednostek-podziaow-terytorialnych-kraju/resource/29538";

/// Bâtiments BDOT10K
pub const BDOT10K_URL: &str = "https://opendata.geoportal.gov.pl/bdot10k/Polska_GML.zip";

/// Enregistrements lus et lignes ignorées
#[derive(Debug)]
pub struct Records<T> {
    /// `(numéro de ligne, enregistrement)`, numérotation à partir de 1
    pub records: Vec<(usize, T)>,
    pub malformed: usize,
}

fn require(path: &Path, url: Option<&'static str>) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(SektorError::missing_input(path.display().to_string(), url).into())
    }
}

/// Liste les fichiers d'entrée : le fichier lui-même, ou ceux du répertoire
/// correspondant à `pattern`, triés
pub fn collect_inputs(path: &Path, pattern: &str, url: Option<&'static str>) -> Result<Vec<PathBuf>> {
    require(path, url)?;
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let full = path.join(pattern);
    let full = full.to_string_lossy();
    let mut files: Vec<PathBuf> = glob::glob(&full)
        .with_context(|| format!("Invalid input pattern: {}", full))?
        .filter_map(|entry| match entry {
            Ok(p) if p.is_file() => Some(p),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Unreadable input entry");
                None
            }
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(SektorError::missing_input(full.into_owned(), url).into());
    }
    Ok(files)
}

/// Lit un fichier NDJSON ; les lignes vides sont ignorées, les lignes
/// illisibles comptées et signalées
pub fn read_ndjson<T: DeserializeOwned>(path: &Path, url: Option<&'static str>) -> Result<Records<T>> {
    require(path, url)?;
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    let mut malformed = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push((idx + 1, record)),
            Err(e) => {
                malformed += 1;
                warn!(file = %path.display(), line = idx + 1, error = %e, "Skipping malformed record");
            }
        }
    }

    Ok(Records { records, malformed })
}

/// Charge un dictionnaire `code;libellé`
pub fn load_dictionary(path: &Path) -> Result<HashMap<String, String>> {
    require(path, None)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Cannot open dictionary {}", path.display()))?;

    let mut dict = HashMap::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to parse {}", path.display()))?;
        let (Some(code), Some(label)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let code = code.trim();
        if !code.is_empty() {
            dict.insert(code.to_string(), label.trim().to_string());
        }
    }
    Ok(dict)
}

/// Charge les quatre dictionnaires BDOT10K d'un répertoire
pub fn load_dictionaries(dir: &Path) -> Result<Dictionaries> {
    Ok(Dictionaries {
        category: load_dictionary(&dir.join("category.csv"))?,
        carto_name: load_dictionary(&dir.join("carto_name.csv"))?,
        condition: load_dictionary(&dir.join("condition.csv"))?,
        function: load_dictionary(&dir.join("function.csv"))?,
    })
}

/// Code TERYT : 2 chiffres (voïvodie), 4 (powiat) ou 7 (gmina)
fn teryt_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{2}(\d{2}(\d{3})?)?$").unwrap_or_else(|_| unreachable!()))
}

pub fn is_teryt_code(code: &str) -> bool {
    teryt_pattern().is_match(code)
}

pub(crate) fn ring_to_polygon(ring: &[Vec<f64>]) -> Option<Polygon<f64>> {
    let coords: Vec<(f64, f64)> = ring
        .iter()
        .filter(|pos| pos.len() >= 2)
        .map(|pos| (pos[0], pos[1]))
        .collect();
    (coords.len() >= 4).then(|| Polygon::new(LineString::from(coords), vec![]))
}

fn property_string(feature: &geojson::Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Charge les unités administratives d'une FeatureCollection
///
/// Propriétés attendues : `JPT_KOD_JE` (code TERYT) et `JPT_NAZWA_` (nom).
/// Seuls les anneaux extérieurs sont conservés.
pub fn load_regions(path: &Path) -> Result<Vec<AdminUnit>> {
    require(path, Some(REGIONS_URL))?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let geojson: geojson::GeoJson = content
        .parse()
        .with_context(|| format!("Failed to parse GeoJSON {}", path.display()))?;

    let geojson::GeoJson::FeatureCollection(collection) = geojson else {
        anyhow::bail!("{} is not a GeoJSON FeatureCollection", path.display());
    };

    let mut units = Vec::with_capacity(collection.features.len());
    for feature in &collection.features {
        let (Some(code), Some(name)) = (
            property_string(feature, "JPT_KOD_JE"),
            property_string(feature, "JPT_NAZWA_"),
        ) else {
            warn!(file = %path.display(), "Administrative unit without code or name");
            continue;
        };
        if !is_teryt_code(&code) {
            warn!(code = %code, name = %name, "Invalid TERYT code");
            continue;
        }

        let polygons: Vec<Polygon<f64>> = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::Polygon(rings)) => {
                rings.first().and_then(|r| ring_to_polygon(r)).into_iter().collect()
            }
            Some(geojson::Value::MultiPolygon(parts)) => parts
                .iter()
                .filter_map(|rings| rings.first().and_then(|r| ring_to_polygon(r)))
                .collect(),
            _ => Vec::new(),
        };
        if polygons.is_empty() {
            warn!(code = %code, name = %name, "Administrative unit without polygon");
        }

        units.push(AdminUnit {
            code,
            name,
            polygons,
        });
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sektor::prg::AddressRecord;
    use std::io::Write;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("geocoder-pl-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_teryt_codes() {
        assert!(is_teryt_code("04"));
        assert!(is_teryt_code("0407"));
        assert!(is_teryt_code("0407011"));
        assert!(!is_teryt_code("040"));
        assert!(!is_teryt_code("04070111"));
        assert!(!is_teryt_code("ab"));
    }

    #[test]
    fn test_missing_input_names_url() {
        let err = read_ndjson::<AddressRecord>(Path::new("/nonexistent/prg.ndjson"), Some(PRG_URL))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/nonexistent/prg.ndjson"));
        assert!(msg.contains("resource/29538"));
    }

    #[test]
    fn test_read_ndjson() {
        let dir = temp_dir("ndjson");
        let path = dir.join("PRG_opolskie.ndjson");
        let mut f = File::create(&path).unwrap();
        writeln!(f, r#"{{"woj":"opolskie","powiat":"opolski","gmina":"Dąbrowa","x":1.0,"y":2.0}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, "not json").unwrap();
        writeln!(f, r#"{{"woj":"opolskie","number":"7"}}"#).unwrap();
        drop(f);

        let read = read_ndjson::<AddressRecord>(&path, None).unwrap();
        assert_eq!(read.records.len(), 2);
        assert_eq!(read.malformed, 1);
        assert_eq!(read.records[0].0, 1);
        assert_eq!(read.records[1].0, 4);
        assert_eq!(read.records[1].1.number, "7");

        let files = collect_inputs(&dir, "PRG_*.ndjson", Some(PRG_URL)).unwrap();
        assert_eq!(files, vec![path.clone()]);
        assert!(collect_inputs(&dir, "BDOT_*.ndjson", None).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_dictionaries() {
        let dir = temp_dir("dicts");
        std::fs::write(dir.join("category.csv"), "1110;budynki mieszkalne jednorodzinne\n").unwrap();
        std::fs::write(dir.join("carto_name.csv"), "").unwrap();
        std::fs::write(dir.join("condition.csv"), "eksploatowany; eksploatowany \n").unwrap();
        std::fs::write(dir.join("function.csv"), "1110.Dj;budynek jednorodzinny\nbroken\n").unwrap();

        let d = load_dictionaries(&dir).unwrap();
        assert_eq!(d.category["1110"], "budynki mieszkalne jednorodzinne");
        assert!(d.carto_name.is_empty());
        assert_eq!(d.condition["eksploatowany"], "eksploatowany");
        assert_eq!(d.function.len(), 1);

        std::fs::remove_file(dir.join("function.csv")).unwrap();
        assert!(load_dictionaries(&dir).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_regions() {
        let dir = temp_dir("regions");
        let path = dir.join("jednostki.geojson");
        let json = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "JPT_KOD_JE": "0407011", "JPT_NAZWA_": "Inowrocław" },
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [
                            [[[18.2, 52.7], [18.3, 52.7], [18.3, 52.8], [18.2, 52.8], [18.2, 52.7]]],
                            [[[18.4, 52.7], [18.5, 52.7], [18.5, 52.8], [18.4, 52.7]]]
                        ]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "JPT_KOD_JE": "04", "JPT_NAZWA_": "kujawsko-pomorskie" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[17.0, 52.0], [20.0, 52.0], [20.0, 54.0], [17.0, 52.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "JPT_KOD_JE": "X1", "JPT_NAZWA_": "?" },
                    "geometry": null
                }
            ]
        });
        std::fs::write(&path, json.to_string()).unwrap();

        let units = load_regions(&path).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].code, "0407011");
        assert_eq!(units[0].polygons.len(), 2);
        assert_eq!(units[1].name, "kujawsko-pomorskie");
        assert_eq!(units[1].polygons.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
