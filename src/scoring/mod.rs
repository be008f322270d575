//! Scoring of completed candidate sequences against the observed spectrum.

pub mod fft;
pub mod intensity;
pub mod prob;
pub mod xcorr;

use serde::{Deserialize, Serialize};

/// One residue step of a candidate, in Da
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SequenceStep {
    /// The step mass in Da: a residue mass, or the lump mass of a
    /// two-residue gap
    pub mass: f64,
    /// The canonical residue index when this is a single residue step
    pub residue: Option<usize>,
}

impl SequenceStep {
    /// Tests if this step is a single residue
    pub const fn is_single(&self) -> bool {
        self.residue.is_some()
    }
}

/// A candidate with every score attached, ready for ranking and output
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ScoredSequence {
    /// The steps, N→C
    pub steps: Vec<SequenceStep>,
    /// The number of two-residue gaps used during enumeration
    pub gap_count: i32,
    /// The enumeration score
    pub subsequence_score: f64,
    /// Observed-ion coverage score (0..=1)
    pub intensity_score: f64,
    /// The Bayesian-odds probability score (log10 scale, ≥ 0)
    pub probability_score: f64,
    /// Longest run of single-residue steps over the length
    pub quality: f64,
    /// Normalized cross-correlation score
    pub xcorr: f64,
    /// The combined score used for the final ranking
    pub combined: f64,
    /// Rank in the final report (1 = best)
    pub rank: usize,
}

impl ScoredSequence {
    /// The quality of a step vector: the longest contiguous run of single
    /// residue steps divided by the total length
    pub fn step_quality(steps: &[SequenceStep]) -> f64 {
        if steps.is_empty() {
            return 0.0;
        }
        let mut best = 0_usize;
        let mut run = 0_usize;
        for step in steps {
            if step.is_single() {
                run += 1;
                best = best.max(run);
            } else {
                run = 0;
            }
        }
        best as f64 / steps.len() as f64
    }

    /// The combined score: intensity dominates, cross-correlation and
    /// quality refine the ranking
    pub fn combine(intensity: f64, xcorr: f64, quality: f64) -> f64 {
        (2.0 * intensity + xcorr + quality) / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(mass: f64) -> SequenceStep {
        SequenceStep {
            mass,
            residue: Some(0),
        }
    }

    fn gap(mass: f64) -> SequenceStep {
        SequenceStep {
            mass,
            residue: None,
        }
    }

    #[test]
    fn quality_measures_the_longest_single_run() {
        let steps = vec![single(71.0), single(57.0), gap(200.0), single(99.0)];
        assert!((ScoredSequence::step_quality(&steps) - 0.5).abs() < f64::EPSILON);

        let all_single = vec![single(71.0), single(57.0)];
        assert!((ScoredSequence::step_quality(&all_single) - 1.0).abs() < f64::EPSILON);

        assert_eq!(ScoredSequence::step_quality(&[]), 0.0);
    }

    #[test]
    fn combined_score_is_bounded_by_its_parts() {
        let combined = ScoredSequence::combine(1.0, 1.0, 1.0);
        assert!((combined - 1.0).abs() < f64::EPSILON);
        assert_eq!(ScoredSequence::combine(0.0, 0.0, 0.0), 0.0);
    }
}
