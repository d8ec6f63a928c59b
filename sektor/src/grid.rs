//! Grille de secteurs
//!
//! Découpe l'emprise de la Pologne en `n × n` cellules de taille constante
//! (en degrés). Un secteur est identifié par `(ligne, colonne)` et sérialisé
//! sous la forme `"rrr_ccc"`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::types::BoundingBox;
use crate::SektorError;

/// Code de secteur `(ligne, colonne)`
///
/// Les indices peuvent sortir de `[0, n-1]` pour des coordonnées hors emprise ;
/// [`SectorGrid::clamp`] les ramène dans la grille.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorCode {
    pub row: i64,
    pub col: i64,
}

impl SectorCode {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for SectorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}_{:03}", self.row, self.col)
    }
}

impl FromStr for SectorCode {
    type Err = SektorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s
            .split_once('_')
            .ok_or_else(|| SektorError::parse_error("sector_code", format!("invalid code: {}", s)))?;
        let row = row
            .parse()
            .map_err(|_| SektorError::parse_error("sector_code", format!("invalid row: {}", s)))?;
        let col = col
            .parse()
            .map_err(|_| SektorError::parse_error("sector_code", format!("invalid col: {}", s)))?;
        Ok(Self { row, col })
    }
}

/// Paramètres géométriques de la grille
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorParams {
    /// Hauteur d'une cellule (degrés de latitude)
    pub cell_height: f64,
    /// Largeur d'une cellule (degrés de longitude)
    pub cell_width: f64,
    pub min_lat: f64,
    pub min_lon: f64,
}

/// Voisinage 3×3 d'un secteur, indices ramenés dans la grille
///
/// L'élément central (indice 4) est le secteur du point lui-même.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Neighborhood([SectorCode; 9]);

impl Neighborhood {
    pub fn center(&self) -> SectorCode {
        self.0[4]
    }

    pub fn cells(&self) -> &[SectorCode; 9] {
        &self.0
    }

    pub fn contains(&self, code: &SectorCode) -> bool {
        self.0.contains(code)
    }

    /// Cellules distinctes (moins de 9 en bord de grille)
    pub fn distinct(&self) -> Vec<SectorCode> {
        let mut cells = self.0.to_vec();
        cells.sort();
        cells.dedup();
        cells
    }
}

/// Grille de secteurs de résolution fixe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorGrid {
    n: usize,
    bbox: BoundingBox,
    params: SectorParams,
}

impl SectorGrid {
    /// Crée une grille `n × n` sur l'emprise donnée
    pub fn new(n: usize, bbox: BoundingBox) -> Result<Self, SektorError> {
        if n == 0 {
            return Err(SektorError::InvalidGrid("sector count must be >= 1".into()));
        }
        if !(bbox.min_lat < bbox.max_lat && bbox.min_lon < bbox.max_lon) {
            return Err(SektorError::InvalidGrid(format!(
                "empty bounding box: {:?}",
                bbox
            )));
        }

        let params = SectorParams {
            cell_height: (bbox.max_lat - bbox.min_lat) / n as f64,
            cell_width: (bbox.max_lon - bbox.min_lon) / n as f64,
            min_lat: bbox.min_lat,
            min_lon: bbox.min_lon,
        };

        Ok(Self { n, bbox, params })
    }

    /// Résolution de la grille
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn params(&self) -> SectorParams {
        self.params
    }

    /// Secteur contenant `(lat, lon)` ; cellules semi-ouvertes `[bas, haut)`
    pub fn sector_code(&self, lat: f64, lon: f64) -> SectorCode {
        let p = &self.params;
        SectorCode {
            row: ((lat - p.min_lat) / p.cell_height).floor() as i64,
            col: ((lon - p.min_lon) / p.cell_width).floor() as i64,
        }
    }

    /// Version vectorisée de [`Self::sector_code`] sur des couples `(lat, lon)`
    pub fn sector_codes(&self, coords: &[(f64, f64)]) -> Vec<SectorCode> {
        coords
            .iter()
            .map(|&(lat, lon)| self.sector_code(lat, lon))
            .collect()
    }

    /// Ramène un code dans `[0, n-1]`
    pub fn clamp(&self, code: SectorCode) -> SectorCode {
        let max = self.n as i64 - 1;
        SectorCode {
            row: code.row.clamp(0, max),
            col: code.col.clamp(0, max),
        }
    }

    /// Voisinage 3×3 du secteur (lui-même + 8 voisins)
    pub fn neighborhood(&self, code: SectorCode) -> Neighborhood {
        let mut cells = [SectorCode::new(0, 0); 9];
        let mut i = 0;
        for dr in -1..=1 {
            for dc in -1..=1 {
                cells[i] = self.clamp(SectorCode::new(code.row + dr, code.col + dc));
                i += 1;
            }
        }
        Neighborhood(cells)
    }

    /// Centre géométrique `(lat, lon)` d'un secteur
    pub fn sector_center(&self, code: SectorCode) -> (f64, f64) {
        let p = &self.params;
        (
            p.min_lat + (code.row as f64 + 0.5) * p.cell_height,
            p.min_lon + (code.col as f64 + 0.5) * p.cell_width,
        )
    }

    /// Regroupe des indices de points par voisinage 3×3 identique
    ///
    /// L'ordre des groupes est déterministe (tri par voisinage).
    pub fn group_by_neighborhood(&self, codes: &[SectorCode]) -> BTreeMap<Neighborhood, Vec<usize>> {
        let mut groups: BTreeMap<Neighborhood, Vec<usize>> = BTreeMap::new();
        for (idx, code) in codes.iter().enumerate() {
            groups.entry(self.neighborhood(*code)).or_default().push(idx);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> SectorGrid {
        SectorGrid::new(n, BoundingBox::default()).unwrap()
    }

    #[test]
    fn test_params() {
        let p = grid(300).params();
        assert!((p.cell_height - 6.0 / 300.0).abs() < 1e-12);
        assert!((p.cell_width - 11.0 / 300.0).abs() < 1e-12);
        assert_eq!(p.min_lat, 49.0);
        assert_eq!(p.min_lon, 14.0);
    }

    #[test]
    fn test_invalid_grid() {
        assert!(SectorGrid::new(0, BoundingBox::default()).is_err());
        let bbox = BoundingBox {
            min_lat: 55.0,
            max_lat: 49.0,
            ..BoundingBox::default()
        };
        assert!(SectorGrid::new(10, bbox).is_err());
    }

    #[test]
    fn test_sector_code_deterministic() {
        let g = grid(300);
        let a = g.sector_code(52.2297, 21.0122);
        let b = g.sector_code(52.2297, 21.0122);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), format!("{:03}_{:03}", a.row, a.col));
    }

    #[test]
    fn test_adjacent_cells_across_boundary() {
        let g = grid(300);
        let p = g.params();
        let boundary_lat = p.min_lat + 150.0 * p.cell_height;
        let lon = 20.0;
        let below = g.sector_code(boundary_lat - 1e-9, lon);
        let above = g.sector_code(boundary_lat + 1e-9, lon);
        assert_eq!(above.row - below.row, 1);
        assert_eq!(above.col, below.col);

        let boundary_lon = p.min_lon + 42.0 * p.cell_width;
        let left = g.sector_code(51.0, boundary_lon - 1e-9);
        let right = g.sector_code(51.0, boundary_lon + 1e-9);
        assert_eq!(right.col - left.col, 1);
        assert_eq!(right.row, left.row);
    }

    #[test]
    fn test_half_open_cells() {
        let bbox = BoundingBox {
            min_lat: 48.0,
            max_lat: 56.0,
            min_lon: 14.0,
            max_lon: 22.0,
        };
        let g = SectorGrid::new(8, bbox).unwrap();
        assert_eq!(g.sector_code(51.0, 14.0), SectorCode::new(3, 0));
        assert_eq!(g.sector_code(50.999_999, 15.0), SectorCode::new(2, 1));
    }

    #[test]
    fn test_out_of_bbox_is_not_clamped() {
        let g = grid(10);
        let code = g.sector_code(48.5, 13.5);
        assert!(code.row < 0);
        assert!(code.col < 0);
        assert_eq!(g.clamp(code), SectorCode::new(0, 0));
    }

    #[test]
    fn test_neighborhood_interior() {
        let g = grid(10);
        let n = g.neighborhood(SectorCode::new(5, 5));
        assert_eq!(n.center(), SectorCode::new(5, 5));
        assert_eq!(n.distinct().len(), 9);
        for cell in n.cells() {
            assert!((cell.row - 5).abs() <= 1);
            assert!((cell.col - 5).abs() <= 1);
        }
    }

    #[test]
    fn test_neighborhood_corner_and_edge() {
        let g = grid(10);
        let corner = g.neighborhood(SectorCode::new(0, 0));
        assert_eq!(corner.distinct().len(), 4);
        let far_corner = g.neighborhood(SectorCode::new(9, 9));
        assert_eq!(far_corner.distinct().len(), 4);
        let edge = g.neighborhood(SectorCode::new(0, 5));
        assert_eq!(edge.distinct().len(), 6);

        for n in [corner, far_corner, edge] {
            for cell in n.cells() {
                assert!((0..10).contains(&cell.row));
                assert!((0..10).contains(&cell.col));
            }
        }
    }

    #[test]
    fn test_single_cell_grid() {
        let g = grid(1);
        let n = g.neighborhood(g.sector_code(52.0, 20.0));
        assert_eq!(n.distinct(), vec![SectorCode::new(0, 0)]);
    }

    #[test]
    fn test_sector_center() {
        let g = grid(10);
        let p = g.params();
        let (lat, lon) = g.sector_center(SectorCode::new(2, 3));
        assert!((lat - (p.min_lat + 2.5 * p.cell_height)).abs() < 1e-12);
        assert!((lon - (p.min_lon + 3.5 * p.cell_width)).abs() < 1e-12);
        assert_eq!(g.sector_code(lat, lon), SectorCode::new(2, 3));
    }

    #[test]
    fn test_group_by_neighborhood() {
        let g = grid(10);
        let codes = vec![
            SectorCode::new(4, 4),
            SectorCode::new(1, 1),
            SectorCode::new(4, 4),
        ];
        let groups = g.group_by_neighborhood(&codes);
        assert_eq!(groups.len(), 2);
        let same = groups
            .iter()
            .find(|(n, _)| n.center() == SectorCode::new(4, 4))
            .unwrap();
        assert_eq!(same.1, &vec![0, 2]);
    }

    #[test]
    fn test_sector_code_parse() {
        let code: SectorCode = "012_345".parse().unwrap();
        assert_eq!(code, SectorCode::new(12, 345));
        assert_eq!(code.to_string(), "012_345");
        assert!("12345".parse::<SectorCode>().is_err());
        assert!("ab_01".parse::<SectorCode>().is_err());
    }
}
