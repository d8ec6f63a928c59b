//! Appariement point adresse → bâtiment le plus proche
//!
//! Pour chaque voisinage 3×3 distinct, les bâtiments des 9 secteurs sont
//! filtrés autour du centre du secteur courant, puis chaque point retient ses
//! `top_num` candidats les plus proches en distance euclidienne (degrés,
//! simple précision). La distance exacte point → contour n'est calculée que
//! sur cette courte liste, dans le plan métrique.

use std::collections::{BTreeSet, HashMap};

use geo::{Coord, EuclideanDistance, Intersects, Point, Polygon};
use tracing::debug;

use crate::grid::{Neighborhood, SectorCode, SectorGrid};
use crate::phrases::PhraseIndex;
use crate::superperm::SuperpermTable;
use crate::types::{AddressPoint, BuildingCandidate, CoordTransform, MatchConfig};

/// Compteurs d'une passe d'appariement
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchStats {
    pub points: usize,
    pub assigned: usize,
    pub unassigned: usize,
    /// Points invalides, indexés mais non appariés
    pub skipped_invalid: usize,
    pub neighborhoods: usize,
    /// Calculs de distance exacte effectués
    pub exact_computations: usize,
    /// Points situés dans (ou sur) un contour
    pub inside_building: usize,
}

impl MatchStats {
    pub fn merge(&mut self, other: &MatchStats) {
        self.points += other.points;
        self.assigned += other.assigned;
        self.unassigned += other.unassigned;
        self.skipped_invalid += other.skipped_invalid;
        self.neighborhoods += other.neighborhoods;
        self.exact_computations += other.exact_computations;
        self.inside_building += other.inside_building;
    }
}

/// Meilleur candidat trouvé pour un point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Indice dans la liste des candidats
    pub candidate: usize,
    /// Distance exacte (mètres)
    pub distance: f64,
}

/// Moteur d'appariement
#[derive(Debug, Clone, Copy)]
pub struct NearestBuildingMatcher {
    grid: SectorGrid,
    config: MatchConfig,
}

impl NearestBuildingMatcher {
    pub fn new(grid: SectorGrid, config: MatchConfig) -> Self {
        Self { grid, config }
    }

    pub fn grid(&self) -> &SectorGrid {
        &self.grid
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Secteurs dont les bâtiments sont nécessaires pour apparier ces points
    pub fn required_sectors<'a, I>(&self, points: I) -> BTreeSet<SectorCode>
    where
        I: IntoIterator<Item = &'a AddressPoint>,
    {
        points
            .into_iter()
            .flat_map(|p| {
                let code = self.grid.clamp(self.grid.sector_code(p.lat, p.lon));
                *self.grid.neighborhood(code).cells()
            })
            .collect()
    }

    /// Apparie les points aux candidats et alimente l'index d'adresses
    ///
    /// Chaque point reçoit son code de secteur (ramené dans la grille). Les
    /// points valides reçoivent le bâtiment le plus proche sous `max_dist`.
    /// Tous les points sont ajoutés au bloc de leur secteur.
    pub fn match_points<'a, I, T>(
        &self,
        points: I,
        candidates: &[BuildingCandidate],
        transform: &T,
        phrases: &mut PhraseIndex,
        superperms: &SuperpermTable,
    ) -> MatchStats
    where
        I: IntoIterator<Item = &'a mut AddressPoint>,
        T: CoordTransform,
    {
        let mut points: Vec<&mut AddressPoint> = points.into_iter().collect();
        let mut stats = MatchStats {
            points: points.len(),
            ..MatchStats::default()
        };

        let codes: Vec<SectorCode> = points
            .iter()
            .map(|p| self.grid.clamp(self.grid.sector_code(p.lat, p.lon)))
            .collect();

        let mut by_sector: HashMap<SectorCode, Vec<usize>> = HashMap::new();
        for (idx, c) in candidates.iter().enumerate() {
            by_sector.entry(c.sector_code).or_default().push(idx);
        }

        let groups = self.grid.group_by_neighborhood(&codes);
        stats.neighborhoods = groups.len();

        for (neighborhood, members) in groups {
            let nearby = self.radius_filter(&neighborhood, candidates, &by_sector);
            let mut planar_cache: HashMap<usize, Option<Polygon<f64>>> = HashMap::new();
            debug!(
                sector = %neighborhood.center(),
                points = members.len(),
                candidates = nearby.len(),
                "Matching neighborhood"
            );

            for idx in members {
                let point = &mut *points[idx];
                point.sector_code = Some(codes[idx]);

                if !point.valid {
                    stats.skipped_invalid += 1;
                } else {
                    let shortlist = self.shortlist(point.coord(), &nearby, candidates);
                    let nearest = exact_nearest(
                        point.coord(),
                        &shortlist,
                        candidates,
                        transform,
                        &mut planar_cache,
                        &mut stats,
                    );

                    match nearest {
                        Some(n) if n.distance < self.config.max_dist => {
                            let building = &candidates[n.candidate];
                            point.building_id = Some(building.id);
                            point.building_distance = n.distance;
                            point.extra_description = building.description.clone();
                            stats.assigned += 1;
                        }
                        _ => stats.unassigned += 1,
                    }
                }

                phrases.index_point(neighborhood.center(), point, superperms);
            }
        }

        stats
    }

    /// Candidats des 9 secteurs dont le centroïde est proche du centre du
    /// secteur courant (`sector_radius` fois la taille de cellule, par axe)
    pub fn radius_filter(
        &self,
        neighborhood: &Neighborhood,
        candidates: &[BuildingCandidate],
        by_sector: &HashMap<SectorCode, Vec<usize>>,
    ) -> Vec<usize> {
        let params = self.grid.params();
        let (center_lat, center_lon) = self.grid.sector_center(neighborhood.center());
        let max_dlat = self.config.sector_radius * params.cell_height;
        let max_dlon = self.config.sector_radius * params.cell_width;

        let mut nearby: Vec<usize> = neighborhood
            .distinct()
            .iter()
            .filter_map(|code| by_sector.get(code))
            .flatten()
            .copied()
            .filter(|&i| {
                let c = candidates[i].centroid;
                (c.x - center_lon).abs() <= max_dlon && (c.y - center_lat).abs() <= max_dlat
            })
            .collect();
        nearby.sort_unstable();
        nearby
    }

    /// Les `top_num` candidats les plus proches en distance approximative,
    /// triés par distance croissante
    pub fn shortlist(
        &self,
        coord: Coord<f64>,
        nearby: &[usize],
        candidates: &[BuildingCandidate],
    ) -> Vec<usize> {
        let (px, py) = (coord.x as f32, coord.y as f32);
        let mut dists: Vec<(f32, usize)> = nearby
            .iter()
            .map(|&i| {
                let c = candidates[i].centroid;
                let dx = c.x as f32 - px;
                let dy = c.y as f32 - py;
                ((dx * dx + dy * dy).sqrt(), i)
            })
            .collect();

        let order = |a: &(f32, usize), b: &(f32, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        let top = self.config.top_num;
        if dists.len() > top {
            if top == 0 {
                return Vec::new();
            }
            dists.select_nth_unstable_by(top - 1, order);
            dists.truncate(top);
        }
        dists.sort_unstable_by(order);
        dists.into_iter().map(|(_, i)| i).collect()
    }
}

/// Distance exacte sur la courte liste
///
/// Arrêt immédiat sur un contour contenant le point (distance 0). Sinon
/// minimum strict : à égalité, le premier candidat de la liste l'emporte.
fn exact_nearest<T: CoordTransform>(
    coord: Coord<f64>,
    shortlist: &[usize],
    candidates: &[BuildingCandidate],
    transform: &T,
    planar_cache: &mut HashMap<usize, Option<Polygon<f64>>>,
    stats: &mut MatchStats,
) -> Option<Nearest> {
    let planar_point = match transform.to_planar(coord) {
        Ok(c) => Point::from(c),
        Err(e) => {
            debug!(error = %e, "Point reprojection failed");
            return None;
        }
    };

    let mut best: Option<Nearest> = None;
    for &i in shortlist {
        stats.exact_computations += 1;
        let candidate = &candidates[i];

        if candidate.outline.intersects(&coord) {
            stats.inside_building += 1;
            return Some(Nearest {
                candidate: i,
                distance: 0.0,
            });
        }

        let planar = planar_cache.entry(i).or_insert_with(|| {
            transform
                .polygon_to_planar(&candidate.outline)
                .map_err(|e| debug!(building = candidate.id, error = %e, "Outline reprojection failed"))
                .ok()
        });
        let Some(planar) = planar else {
            continue;
        };

        let distance = planar_point.euclidean_distance(&*planar);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(Nearest {
                candidate: i,
                distance,
            });
        }
    }
    best
}
