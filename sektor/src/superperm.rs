//! Superpermutations d'indices
//!
//! Pour `k` jetons, produit une suite d'indices `0..k` dans laquelle chacune
//! des `k!` permutations apparaît comme fenêtre contiguë de longueur `k`.
//! Construction gloutonne : on prolonge la fin courante par l'extension la
//! plus courte (longueurs 1 à k-1, ordre lexicographique) qui fait apparaître
//! une permutation non encore couverte.

use std::collections::HashSet;

/// Plus grand `k` supporté
pub const SUPERPERM_MAX: usize = 5;

/// Calcule la superpermutation gloutonne pour `k` symboles
///
/// Retourne `None` pour `k == 0` ou `k > SUPERPERM_MAX`.
pub fn superpermutation(k: usize) -> Option<Vec<usize>> {
    if k == 0 || k > SUPERPERM_MAX {
        return None;
    }

    let base: Vec<u8> = (0..k as u8).collect();
    let mut remaining: HashSet<Vec<u8>> = permutations(&base, k)
        .into_iter()
        .filter(|p| *p != base)
        .collect();
    let extensions: Vec<Vec<u8>> = (1..k).flat_map(|len| permutations(&base, len)).collect();

    let mut sequence: Vec<u8> = Vec::new();
    let mut tail = base.clone();

    while !remaining.is_empty() {
        let last = tail[tail.len() - 1];
        let accepted = extensions
            .iter()
            .filter(|ext| !(ext.len() == 1 && ext[0] == last))
            .map(|ext| {
                let mut candidate = tail.clone();
                candidate.extend_from_slice(ext);
                candidate
            })
            .find(|candidate| remaining.contains(&candidate[candidate.len() - k..]));

        // Impasse : on recolle la plus petite permutation restante
        let candidate = match accepted {
            Some(candidate) => candidate,
            None => {
                let Some(next) = remaining.iter().min().cloned() else {
                    break;
                };
                let mut candidate = tail.clone();
                candidate.extend_from_slice(&next);
                candidate
            }
        };

        remaining.remove(&candidate[candidate.len() - k..]);

        if remaining.is_empty() {
            sequence.extend_from_slice(&candidate);
            tail.clear();
        } else {
            let split = candidate.len() - (k - 1);
            sequence.extend_from_slice(&candidate[..split]);
            tail = candidate[split..].to_vec();
        }
    }

    sequence.extend_from_slice(&tail);
    Some(sequence.into_iter().map(usize::from).collect())
}

/// Permutations de longueur `r` de `pool`, en ordre lexicographique des positions
fn permutations(pool: &[u8], r: usize) -> Vec<Vec<u8>> {
    if r == 0 {
        return vec![Vec::new()];
    }

    let mut out = Vec::new();
    for (i, &head) in pool.iter().enumerate() {
        let mut rest = pool.to_vec();
        rest.remove(i);
        for tail in permutations(&rest, r - 1) {
            let mut perm = Vec::with_capacity(r);
            perm.push(head);
            perm.extend(tail);
            out.push(perm);
        }
    }
    out
}

/// Table mémoïsée des superpermutations pour `k = 1..=max`
#[derive(Debug, Clone)]
pub struct SuperpermTable {
    sequences: Vec<Vec<usize>>,
}

impl SuperpermTable {
    /// Construit la table jusqu'à `max` (borné à [`SUPERPERM_MAX`])
    pub fn new(max: usize) -> Self {
        let sequences = (1..=max.min(SUPERPERM_MAX))
            .filter_map(superpermutation)
            .collect();
        Self { sequences }
    }

    /// Plus grand `k` disponible
    pub fn max_len(&self) -> usize {
        self.sequences.len()
    }

    pub fn get(&self, k: usize) -> Option<&[usize]> {
        if k == 0 {
            return None;
        }
        self.sequences.get(k - 1).map(Vec::as_slice)
    }

    /// Réordonne des jetons distincts selon la superpermutation de leur nombre
    ///
    /// Au-delà de la table, les jetons sont rendus tels quels.
    pub fn permute<'a, S: AsRef<str>>(&self, tokens: &'a [S]) -> Vec<&'a str> {
        match self.get(tokens.len()) {
            Some(seq) => seq.iter().map(|&i| tokens[i].as_ref()).collect(),
            None => tokens.iter().map(AsRef::as_ref).collect(),
        }
    }
}

impl Default for SuperpermTable {
    fn default() -> Self {
        Self::new(SUPERPERM_MAX)
    }
}
