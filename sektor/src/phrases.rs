//! Index textuel des adresses par secteur
//!
//! Chaque secteur accumule un bloc de lignes de la forme
//! `" JETONS PERMUTÉS [DESCRIPTION] [id]\n"`. Une chaîne globale de jetons
//! uniques sert de pré-filtre avant le parcours des blocs.

use std::collections::{BTreeMap, HashSet};

use crate::grid::{SectorCode, SectorGrid};
use crate::normalize::fold;
use crate::superperm::SuperpermTable;
use crate::types::AddressPoint;

/// Jetons d'adresse repliés, vides exclus, doublons retirés (premier gardé)
///
/// Ordre : localité, sous-localité, rue, numéro, code postal.
pub fn address_tokens(point: &AddressPoint) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::with_capacity(5);
    for field in [
        &point.town,
        &point.subtown,
        &point.street,
        &point.number,
        &point.postcode,
    ] {
        let token = fold(field.trim());
        if !token.is_empty() && !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// Accumulateur de l'index d'adresses
///
/// Possédé par l'appelant ; les blocs sont vidés via [`Self::take_blobs`]
/// après persistance de chaque voïvodie, la chaîne des jetons uniques est
/// conservée d'une voïvodie à l'autre.
#[derive(Debug, Default, Clone)]
pub struct PhraseIndex {
    blobs: BTreeMap<SectorCode, String>,
    unique: HashSet<String>,
    unique_text: String,
}

impl PhraseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reprend une chaîne de jetons uniques déjà persistée
    pub fn with_unique(text: &str) -> Self {
        let mut index = Self::new();
        index.record_tokens(text.split(' '));
        index
    }

    /// Reconstruit un index complet à partir de blocs persistés
    pub fn from_parts(blobs: BTreeMap<SectorCode, String>, unique_text: &str) -> Self {
        let mut index = Self::with_unique(unique_text);
        index.blobs = blobs;
        index
    }

    /// Ajoute des jetons à la chaîne globale s'ils sont nouveaux
    pub fn record_tokens<'a, I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for token in tokens {
            if token.is_empty() || self.unique.contains(token) {
                continue;
            }
            self.unique.insert(token.to_string());
            self.unique_text.push_str(token);
            self.unique_text.push(' ');
        }
    }

    /// Ajoute la ligne d'un point au bloc du secteur `sector`
    ///
    /// La description (déjà repliée) est insérée entre le premier et le
    /// deuxième jeton permuté ; avec un seul jeton elle le suit.
    pub fn append_point(
        &mut self,
        sector: SectorCode,
        point_id: i64,
        phrase: &[&str],
        description: Option<&str>,
    ) {
        let blob = self.blobs.entry(sector).or_default();
        blob.push(' ');
        blob.push_str(&phrase.join(" "));

        if let (Some(desc), Some(first)) = (description, phrase.first()) {
            blob.push(' ');
            blob.push_str(first);
            blob.push(' ');
            blob.push_str(desc);
            if let Some(second) = phrase.get(1) {
                blob.push(' ');
                blob.push_str(second);
            }
        }

        blob.push_str(" [");
        blob.push_str(&point_id.to_string());
        blob.push_str("]\n");
    }

    /// Indexe un point traité par l'appariement
    ///
    /// La description empruntée au bâtiment affecté, si non vide, est
    /// intégrée à la ligne et ses mots rejoignent les jetons uniques.
    pub fn index_point(
        &mut self,
        sector: SectorCode,
        point: &AddressPoint,
        superperms: &SuperpermTable,
    ) {
        let tokens = address_tokens(point);
        self.record_tokens(tokens.iter().map(String::as_str));
        let phrase = superperms.permute(&tokens);

        let description = if point.building_id.is_some() && !point.extra_description.is_empty() {
            let folded = fold(&point.extra_description);
            let words = folded.replace(", ", " ");
            self.record_tokens(words.split(' '));
            Some(folded)
        } else {
            None
        };

        self.append_point(sector, point.id, &phrase, description.as_deref());
    }

    pub fn blob(&self, sector: &SectorCode) -> Option<&str> {
        self.blobs.get(sector).map(String::as_str)
    }

    pub fn blobs(&self) -> &BTreeMap<SectorCode, String> {
        &self.blobs
    }

    /// Décale de `offset` l'identifiant terminal de chaque ligne des blocs
    ///
    /// Les lignes sans identifiant sont conservées telles quelles.
    pub fn shift_ids(&mut self, offset: i64) {
        if offset == 0 {
            return;
        }
        for blob in self.blobs.values_mut() {
            let mut shifted = String::with_capacity(blob.len());
            for line in blob.lines() {
                match id_span(line) {
                    Some((start, end, id)) => {
                        shifted.push_str(&line[..start]);
                        shifted.push_str(&(id + offset).to_string());
                        shifted.push_str(&line[end..]);
                    }
                    None => shifted.push_str(line),
                }
                shifted.push('\n');
            }
            *blob = shifted;
        }
    }

    /// Vide et retourne les blocs accumulés
    pub fn take_blobs(&mut self) -> BTreeMap<SectorCode, String> {
        std::mem::take(&mut self.blobs)
    }

    /// Chaîne des jetons uniques, séparés (et terminés) par une espace
    pub fn unique_text(&self) -> &str {
        &self.unique_text
    }

    pub fn unique_count(&self) -> usize {
        self.unique.len()
    }

    /// Recherche des identifiants de points dont la ligne contient la requête
    ///
    /// Le dernier mot de la requête doit apparaître dans la chaîne des jetons
    /// uniques, sinon aucun bloc n'est parcouru. Les secteurs sont parcourus
    /// par anneaux autour de `params.start` ; après la première
    /// correspondance, au plus `params.max_sectors` secteurs supplémentaires
    /// sont examinés.
    pub fn search(&self, grid: &SectorGrid, query: &str, params: &SearchParams) -> Vec<i64> {
        let needle = normalize_query(query);
        let Some(last) = last_token(&needle) else {
            return Vec::new();
        };
        if !self.unique_text.contains(last) {
            return Vec::new();
        }

        let mut ids: Vec<i64> = Vec::new();
        let mut since_first_hit: Option<usize> = None;

        for sector in ring_order(grid, params.start) {
            if ids.len() >= params.limit {
                break;
            }
            if let Some(count) = since_first_hit.as_mut() {
                if *count >= params.max_sectors {
                    break;
                }
                *count += 1;
            }

            let Some(blob) = self.blobs.get(&sector) else {
                continue;
            };
            if !blob.contains(&needle) {
                continue;
            }

            for line in blob.lines().filter(|l| l.contains(&needle)) {
                if let Some(id) = line_id(line) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                if ids.len() >= params.limit {
                    break;
                }
            }
            since_first_hit.get_or_insert(0);
        }

        ids
    }
}

/// Paramètres d'une recherche dans l'index
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Secteur de départ du parcours
    pub start: SectorCode,
    pub max_sectors: usize,
    pub limit: usize,
}

/// Requête prête pour la comparaison avec les lignes de l'index
///
/// Précédée d'une espace pour ne pas confondre `"WROCLAW"` et `"INOWROCLAW"`.
pub fn normalize_query(query: &str) -> String {
    let folded = fold(&format!(" {}", query))
        .replace(',', "")
        .replace("UL. ", "");
    folded.trim_end().to_string()
}

fn last_token(needle: &str) -> Option<&str> {
    needle.split_whitespace().last()
}

/// Identifiant entre crochets en fin de ligne
fn line_id(line: &str) -> Option<i64> {
    id_span(line).map(|(_, _, id)| id)
}

/// Bornes et valeur de l'identifiant entre crochets en fin de ligne
fn id_span(line: &str) -> Option<(usize, usize, i64)> {
    let start = line.rfind(" [")? + 2;
    let end = start + line[start..].find(']')?;
    let id = line[start..end].parse().ok()?;
    Some((start, end, id))
}

/// Secteurs de la grille triés par anneaux de Tchebychev autour de `start`
///
/// Anneau 0 : le secteur lui-même ; anneau `r` : les secteurs à distance
/// exactement `r`. Dans un anneau, ordre ligne puis colonne.
pub fn ring_order(grid: &SectorGrid, start: SectorCode) -> impl Iterator<Item = SectorCode> {
    let n = grid.size() as i64;
    let start = grid.clamp(start);
    (0..n).flat_map(move |r| {
        (-r..=r).flat_map(move |dr| {
            let cols: Vec<i64> = if dr.abs() == r {
                (-r..=r).collect()
            } else {
                vec![-r, r]
            };
            cols.into_iter()
                .map(move |dc| SectorCode::new(start.row + dr, start.col + dc))
        })
        .filter(move |c| (0..n).contains(&c.row) && (0..n).contains(&c.col))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, PointSource};

    fn point(id: i64, town: &str, street: &str, number: &str) -> AddressPoint {
        AddressPoint {
            id,
            woj: "mazowieckie".into(),
            powiat: "Warszawa".into(),
            gmina: "Warszawa".into(),
            town: town.into(),
            subtown: String::new(),
            street: street.into(),
            number: number.into(),
            postcode: String::new(),
            status: "istniejacy".into(),
            lon: 21.0,
            lat: 52.2,
            source: PointSource::Prg,
            valid: true,
            boundary_distance: 0.0,
            building_id: None,
            building_distance: 0.0,
            sector_code: None,
            extra_description: String::new(),
        }
    }

    #[test]
    fn test_address_tokens() {
        let mut p = point(1, "Łódź", "Piotrkowska", "12");
        p.subtown = "Łódź".into();
        p.postcode = "90-001".into();
        assert_eq!(address_tokens(&p), vec!["LODZ", "PIOTRKOWSKA", "12", "90-001"]);

        let empty = point(2, "", "", "");
        assert!(address_tokens(&empty).is_empty());
    }

    #[test]
    fn test_append_point_format() {
        let mut index = PhraseIndex::new();
        let s = SectorCode::new(1, 2);
        index.append_point(s, 7, &["A", "B", "A"], None);
        index.append_point(s, 8, &["A", "B", "A"], Some("SZKOLA"));
        index.append_point(s, 9, &["C"], Some("KOSCIOL"));
        assert_eq!(
            index.blob(&s).unwrap(),
            " A B A [7]\n A B A A SZKOLA B [8]\n C C KOSCIOL [9]\n"
        );
    }

    #[test]
    fn test_unique_tokens() {
        let mut index = PhraseIndex::with_unique("WARSZAWA ");
        index.record_tokens(["WARSZAWA", "MARSZALKOWSKA", "", "MARSZALKOWSKA"]);
        assert_eq!(index.unique_text(), "WARSZAWA MARSZALKOWSKA ");
        assert_eq!(index.unique_count(), 2);
    }

    #[test]
    fn test_index_point_with_description() {
        let table = SuperpermTable::default();
        let mut index = PhraseIndex::new();
        let mut p = point(3, "Kraków", "Floriańska", "1");
        p.building_id = Some(10);
        p.extra_description = "Kamienica, zabytek".into();

        index.index_point(SectorCode::new(0, 0), &p, &table);

        let blob = index.blob(&SectorCode::new(0, 0)).unwrap();
        assert!(blob.starts_with(" KRAKOW FLORIANSKA 1 KRAKOW"));
        assert!(blob.contains(" KRAKOW KAMIENICA, ZABYTEK FLORIANSKA [3]\n"));
        assert!(index.unique_text().contains("KAMIENICA "));
        assert!(index.unique_text().contains("ZABYTEK "));
    }

    #[test]
    fn test_index_point_ignores_description_without_building() {
        let table = SuperpermTable::default();
        let mut index = PhraseIndex::new();
        let mut p = point(4, "Gdańsk", "", "5");
        p.extra_description = "Hala".into();
        index.index_point(SectorCode::new(0, 0), &p, &table);
        assert_eq!(
            index.blob(&SectorCode::new(0, 0)).unwrap(),
            " GDANSK 5 GDANSK [4]\n"
        );
    }

    #[test]
    fn test_take_blobs_keeps_unique() {
        let table = SuperpermTable::default();
        let mut index = PhraseIndex::new();
        index.index_point(SectorCode::new(0, 0), &point(1, "Opole", "", "2"), &table);
        let blobs = index.take_blobs();
        assert_eq!(blobs.len(), 1);
        assert!(index.blobs().is_empty());
        assert_eq!(index.unique_text(), "OPOLE 2 ");
    }

    #[test]
    fn test_shift_ids() {
        let table = SuperpermTable::default();
        let mut index = PhraseIndex::new();
        let mut p = point(2, "Kraków", "Floriańska", "1");
        p.building_id = Some(10);
        p.extra_description = "Dom [A]".into();
        index.index_point(SectorCode::new(0, 0), &point(1, "Opole", "", "2"), &table);
        index.index_point(SectorCode::new(0, 0), &p, &table);
        index.index_point(SectorCode::new(3, 4), &point(3, "Opole", "", "3"), &table);
        let before = index.blob(&SectorCode::new(0, 0)).unwrap().to_string();

        index.shift_ids(500);

        let blob = index.blob(&SectorCode::new(0, 0)).unwrap();
        assert_eq!(blob, before.replace("[1]\n", "[501]\n").replace("[2]\n", "[502]\n"));
        assert!(blob.contains(" DOM [A] "));
        assert_eq!(index.blob(&SectorCode::new(3, 4)).unwrap(), " OPOLE 3 OPOLE [503]\n");

        let grid = SectorGrid::new(10, BoundingBox::default()).unwrap();
        let params = SearchParams {
            start: SectorCode::new(0, 0),
            max_sectors: 400,
            limit: 5,
        };
        assert_eq!(index.search(&grid, "Opole 3", &params), vec![503]);
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("ul. Złota, Warszawa"), " ZLOTA WARSZAWA");
        assert_eq!(normalize_query("Wrocław "), " WROCLAW");
    }

    #[test]
    fn test_line_id() {
        assert_eq!(line_id(" A B [42]"), Some(42));
        assert_eq!(line_id(" A [B] C [7]"), Some(7));
        assert_eq!(line_id(" A B"), None);
    }

    #[test]
    fn test_ring_order() {
        let grid = SectorGrid::new(5, BoundingBox::default()).unwrap();
        let order: Vec<SectorCode> = ring_order(&grid, SectorCode::new(2, 2)).collect();
        assert_eq!(order.len(), 25);
        assert_eq!(order[0], SectorCode::new(2, 2));
        assert!(order[1..9]
            .iter()
            .all(|c| (c.row - 2).abs().max((c.col - 2).abs()) == 1));

        let corner: Vec<SectorCode> = ring_order(&grid, SectorCode::new(0, 0)).collect();
        assert_eq!(corner.len(), 25);
        let distinct: HashSet<_> = corner.iter().collect();
        assert_eq!(distinct.len(), 25);
    }

    #[test]
    fn test_search() {
        let grid = SectorGrid::new(10, BoundingBox::default()).unwrap();
        let table = SuperpermTable::default();
        let mut index = PhraseIndex::new();
        index.index_point(SectorCode::new(5, 5), &point(1, "Wrocław", "Rynek", "1"), &table);
        index.index_point(SectorCode::new(5, 6), &point(2, "Inowrocław", "Rynek", "2"), &table);
        index.index_point(SectorCode::new(9, 9), &point(3, "Wrocław", "Rynek", "3"), &table);

        let params = SearchParams {
            start: SectorCode::new(5, 5),
            max_sectors: 400,
            limit: 5,
        };

        let ids = index.search(&grid, "Wrocław", &params);
        assert_eq!(ids, vec![1, 3]);

        // Toutes les permutations des jetons sont présentes dans la ligne
        let ids = index.search(&grid, "rynek, inowrocław", &params);
        assert_eq!(ids, vec![2]);

        let ids = index.search(&grid, "inowrocław rynek", &params);
        assert_eq!(ids, vec![2]);

        assert!(index.search(&grid, "Poznań", &params).is_empty());
        assert!(index.search(&grid, "Rynek 9", &params).is_empty());
        assert!(index.search(&grid, "   ", &params).is_empty());
    }

    #[test]
    fn test_search_limit_and_window() {
        let grid = SectorGrid::new(10, BoundingBox::default()).unwrap();
        let table = SuperpermTable::default();
        let mut index = PhraseIndex::new();
        for id in 1..=3 {
            index.index_point(SectorCode::new(0, 0), &point(id, "Opole", "", &id.to_string()), &table);
        }
        index.index_point(SectorCode::new(9, 9), &point(4, "Opole", "", "4"), &table);

        let limited = SearchParams {
            start: SectorCode::new(0, 0),
            max_sectors: 400,
            limit: 2,
        };
        assert_eq!(index.search(&grid, "Opole", &limited), vec![1, 2]);

        let narrow = SearchParams {
            start: SectorCode::new(0, 0),
            max_sectors: 3,
            limit: 5,
        };
        assert_eq!(index.search(&grid, "Opole", &narrow), vec![1, 2, 3]);
    }
}
