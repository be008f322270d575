//! The gap list: every allowed scaled mass jump between graph nodes.
//!
//! The first `RESIDUE_COUNT` positions hold the single residue masses with
//! absent residues zeroed (Ile folds onto Leu, Gln onto Lys when the
//! tolerance cannot tell them apart, cysteine takes its configured mass).
//! Positions after that hold all unique two-residue sums. A separate
//! three-residue table exists only to prime the first extension step.

use serde::{Deserialize, Serialize};

use crate::config::Parameters;
use crate::residue::{index, ResidueTable, RESIDUE_COUNT};
use crate::scale::{MassScale, ScaledParams};

/// The scaled single- and two-residue jumps allowed during graph traversal
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct GapList {
    /// Jump masses: singles (canonical order, zero = unusable) then pairs
    masses: Vec<i32>,
    /// Node corrections parallel to `masses` (zero for pairs)
    corrections: Vec<i32>,
    /// Number of single-residue slots
    single_count: usize,
    /// Unique three-residue sums not already in the list
    triples: Vec<i32>,
}

impl GapList {
    /// Build the gap list for a run
    pub fn new(
        residues: &ResidueTable,
        scale: &MassScale,
        scaled: &ScaledParams,
        parameters: &Parameters,
    ) -> Self {
        let count = residues.len().max(RESIDUE_COUNT);
        let mut masses = vec![0_i32; count];
        let mut corrections = vec![0_i32; count];

        // Lys and Gln are separable only when the tolerance is finer than
        // 1.5 times their mass difference
        let lys_gln_diff = f64::from(
            scale.residue_masses[index::K] - scale.residue_masses[index::Q],
        ) * 1.5;

        for i in 0..residues.len() {
            let code = residues.get(i).code;
            let absent = parameters.absent_residues.contains(&code);
            masses[i] = if absent
                || i == index::I
                || (i == index::Q && scaled.fragment_err >= lys_gln_diff)
            {
                0
            } else if i == index::C && scaled.cys_mw != 0.0 {
                (scaled.cys_mw + 0.5) as i32
            } else {
                scale.residue_masses[i]
            };
            corrections[i] = if masses[i] == 0 {
                0
            } else {
                scale.residue_corrections[i]
            };
        }

        // All unique two-residue sums, deduplicated within the fragment
        // tolerance against everything already in the list
        let single_count = count;
        for i in 0..single_count {
            for j in i..single_count {
                if masses[i] == 0 || masses[j] == 0 {
                    continue;
                }
                let sum = masses[i] + masses[j];
                let duplicate = masses.iter().any(|&existing| {
                    existing != 0
                        && f64::from(existing) > f64::from(sum) - scaled.fragment_err
                        && f64::from(existing) < f64::from(sum) + scaled.fragment_err
                });
                if !duplicate {
                    masses.push(sum);
                    corrections.push(0);
                }
            }
        }

        // Three-residue sums prime the first extension only; no tolerance
        // dedup here, just uniqueness against themselves and the gap list
        let mut triples = Vec::new();
        for i in 0..single_count {
            if masses[i] == 0 {
                continue;
            }
            for j in i..single_count {
                if masses[j] == 0 {
                    continue;
                }
                for k in j..single_count {
                    if masses[k] == 0 {
                        continue;
                    }
                    let sum = masses[i] + masses[j] + masses[k];
                    if !triples.contains(&sum) && !masses.contains(&sum) {
                        triples.push(sum);
                    }
                }
            }
        }

        Self {
            masses,
            corrections,
            single_count,
            triples,
        }
    }

    /// All jump masses, singles first then pairs; zeros are unusable slots
    pub fn all(&self) -> &[i32] {
        &self.masses
    }

    /// The single-residue slots in canonical residue order
    pub fn singles(&self) -> &[i32] {
        &self.masses[..self.single_count]
    }

    /// The two-residue sums
    pub fn pairs(&self) -> &[i32] {
        &self.masses[self.single_count..]
    }

    /// The number of single-residue slots
    pub fn single_count(&self) -> usize {
        self.single_count
    }

    /// The three-residue sums used for the first extension step
    pub fn triples(&self) -> &[i32] {
        &self.triples
    }

    /// The node correction for a jump index
    pub fn correction(&self, jump: usize) -> i32 {
        self.corrections[jump]
    }

    /// The single-residue jump mass for a canonical residue index
    pub fn single(&self, residue: usize) -> i32 {
        self.masses[residue]
    }

    /// The usable jump mass for a one letter code, following the Ile→Leu and
    /// Gln→Lys folds; `None` for unknown or absent residues
    pub fn single_for_code(&self, residues: &ResidueTable, code: char) -> Option<i32> {
        let slot = residues.index_of(code)?;
        match self.single(slot) {
            0 => match code {
                'I' => residues.index_of('L').map(|i| self.single(i)),
                'Q' => residues.index_of('K').map(|i| self.single(i)),
                _ => None,
            }
            .filter(|&mass| mass != 0),
            mass => Some(mass),
        }
    }

    /// Tests if a mass difference matches any usable single residue within
    /// the tolerance
    pub fn matches_single(&self, difference: i32, tolerance: f64) -> bool {
        self.singles().iter().any(|&g| {
            g != 0
                && f64::from(difference) <= f64::from(g) + tolerance
                && f64::from(difference) >= f64::from(g) - tolerance
        })
    }

    /// Tests if a mass equals a usable single residue exactly
    pub fn is_single(&self, mass: i32) -> bool {
        self.singles().iter().any(|&g| g != 0 && g == mass)
    }

    /// The smallest usable single-residue mass
    pub fn smallest_single(&self) -> Option<i32> {
        self.singles().iter().copied().filter(|&g| g != 0).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(parameters: &Parameters) -> (GapList, MassScale) {
        let residues = ResidueTable::default();
        let scale = MassScale::new(parameters.fragment_err, 1500.0, 0, &residues);
        let scaled = ScaledParams::new(parameters, &scale);
        (GapList::new(&residues, &scale, &scaled, parameters), scale)
    }

    #[test]
    fn isoleucine_is_always_folded() {
        let (gaps, _) = build(&Parameters::default());
        assert_eq!(gaps.single(index::I), 0);
        assert_ne!(gaps.single(index::L), 0);
    }

    #[test]
    fn glutamine_folds_at_coarse_tolerance() {
        let (coarse, _) = build(&Parameters::default()); // 0.5 Da
        assert_eq!(coarse.single(index::Q), 0);
        assert_ne!(coarse.single(index::K), 0);

        let fine = Parameters {
            fragment_err: 0.01,
            ..Parameters::default()
        };
        let (fine_gaps, _) = build(&fine);
        assert_ne!(fine_gaps.single(index::Q), 0);
    }

    #[test]
    fn absent_residues_are_zeroed() {
        let parameters = Parameters {
            absent_residues: vec!['W'],
            ..Parameters::default()
        };
        let (gaps, scale) = build(&parameters);
        assert_eq!(gaps.single(index::W), 0);
        // No pair may equal a sum involving tryptophan exactly
        let trp = scale.residue_masses[index::W];
        let gly = scale.residue_masses[index::G];
        assert!(!gaps.pairs().contains(&(trp + gly)));
    }

    #[test]
    fn cysteine_mass_is_replaceable() {
        let parameters = Parameters {
            cys_mw: 160.031,
            ..Parameters::default()
        };
        let (gaps, scale) = build(&parameters);
        assert_eq!(gaps.single(index::C), scale.scaled(160.031));
    }

    #[test]
    fn pairs_are_unique_within_tolerance() {
        let (gaps, _) = build(&Parameters::default());
        let pairs = gaps.pairs();
        for (i, &a) in pairs.iter().enumerate() {
            for &b in &pairs[i + 1..] {
                assert!((a - b).abs() >= 1, "pair masses {a} and {b} collide");
            }
        }
    }

    #[test]
    fn triples_do_not_repeat_gap_masses() {
        let (gaps, _) = build(&Parameters::default());
        for &t in gaps.triples() {
            assert!(!gaps.all().contains(&t));
        }
    }
}
