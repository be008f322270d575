//! The intensity scorer: how much of the observed ion current does a
//! candidate explain?
//!
//! Theoretical b, a, y and water/ammonia loss ions are generated for every
//! cleavage at every plausible charge and matched against the observed
//! peaks. Four weighted components make up the score; the per-peak credit
//! vector (`ion_found`) is shared with the probability scorer.

use crate::config::{FragmentationSpec, Parameters};
use crate::masses;
use crate::scoring::{ScoredSequence, SequenceStep};
use crate::spectrum::Spectrum;

/// Credit attenuation when one peak serves as both a b and a y ion
const OVER_USED_IONS: f64 = 0.9;
/// Credit for positions that could be isotopes of matched b or y ions
const IONFOUND_ISOTOPE: f64 = 0.5;
/// The C12/C13 spacing used for the isotope credit
const ISOTOPE_SPACING: f64 = 1.00335;
/// Side-chain loss checked under the oxidized-methionine rule
const OX_MET_LOSS: f64 = 46.0;
/// Fragment tolerance below which a 46 u loss can only be oxidized Met
const OX_MET_RESOLVED: f64 = 0.03;
/// Internal fragments longer than this many residues are not considered
const MAX_INTERNAL_SPAN: usize = 4;

/// The outcome of intensity scoring one candidate
#[derive(Clone, Debug)]
pub struct IntensityOutcome {
    /// The weighted intensity score, 0..=1
    pub score: f64,
    /// Longest single-residue run over the length
    pub quality: f64,
    /// Per-peak credit, aligned with the conditioned spectrum
    pub ion_found: Vec<f64>,
}

/// The fragment tolerance for final scoring: Q-TOF data uses the tighter
/// final tolerance when configured
fn scoring_tolerance(parameters: &Parameters) -> f64 {
    if parameters.fragmentation == FragmentationSpec::QTof && parameters.qtof_err > 0.0 {
        parameters.qtof_err
    } else {
        parameters.fragment_err
    }
}

/// Score one candidate against the conditioned spectrum
pub fn score_candidate(
    steps: &[SequenceStep],
    spectrum: &Spectrum,
    parameters: &Parameters,
) -> IntensityOutcome {
    let tolerance = scoring_tolerance(parameters);
    let attenuation = &parameters.attenuation;
    let peaks = spectrum.peaks();
    let mut ion_found = vec![0.0_f64; peaks.len()];
    if steps.is_empty() {
        return IntensityOutcome {
            score: 0.0,
            quality: 0.0,
            ion_found,
        };
    }

    let precursor_mz = (parameters.peptide_mw
        + f64::from(parameters.charge_state) * masses::HYDROGEN)
        / f64::from(parameters.charge_state);
    let likely_charge = if parameters.charge_state == 1 {
        1
    } else {
        parameters.charge_state - 1
    };
    let ox_met_mult = if tolerance < OX_MET_RESOLVED {
        attenuation.ox_met
    } else {
        attenuation.phe
    };

    // Per-peak index of a matched b ion, to detect b/y shared peaks
    let mut b_peaks = vec![false; peaks.len()];
    let mut hypotheses = 0_usize;
    let mut matched_hypotheses = 0_usize;
    let mut cleavage_with_b = vec![false; steps.len()];
    let mut cleavage_with_y = vec![false; steps.len()];

    let credit = |ion_found: &mut [f64], mz: f64, value: f64| -> Option<usize> {
        let mut best: Option<usize> = None;
        for index in spectrum.range_indices(mz - tolerance, mz + tolerance) {
            if value > ion_found[index] {
                ion_found[index] = value;
            }
            best = Some(index);
        }
        best
    };

    // Walk the cleavages: b grows from the N-terminus, y from the C-terminus
    let mut b_mass = parameters.modified_n_term;
    for (cleavage, step) in steps.iter().enumerate().take(steps.len() - 1) {
        b_mass += step.mass;
        let y_mass: f64 = parameters.modified_c_term
            + 2.0 * masses::HYDROGEN
            + steps[cleavage + 1..].iter().map(|s| s.mass).sum::<f64>();

        for charge in 1..=parameters.charge_state {
            let z = f64::from(charge);
            let to_mz = |mass: f64| (mass + (z - 1.0) * masses::HYDROGEN) / z;

            // b family
            let b_mz = to_mz(b_mass);
            if b_mz * z > (z - 1.0) * 350.0 {
                hypotheses += 1;
                let mut base = if charge <= likely_charge { 1.0 } else { 0.5 };
                if b_mz > precursor_mz {
                    base *= attenuation.high_mass_b_ion;
                }
                if let Some(peak) = credit(&mut ion_found, b_mz, base) {
                    matched_hypotheses += 1;
                    cleavage_with_b[cleavage] = true;
                    b_peaks[peak] = true;
                    // Losses only count where the base ion is present
                    credit(
                        &mut ion_found,
                        to_mz(b_mass - masses::AMMONIA),
                        base * attenuation.neutral_loss,
                    );
                    credit(
                        &mut ion_found,
                        to_mz(b_mass - masses::WATER),
                        base * attenuation.neutral_loss,
                    );
                    credit(&mut ion_found, to_mz(b_mass - OX_MET_LOSS), base * ox_met_mult);
                    let a_mz = to_mz(b_mass - masses::CO);
                    let a_base = if b_mass - masses::CO > 350.0 {
                        base * attenuation.high_mass_a_ion
                    } else {
                        base
                    };
                    credit(&mut ion_found, a_mz, a_base);
                    // Isotope slot of the matched b ion
                    credit(
                        &mut ion_found,
                        b_mz + ISOTOPE_SPACING / z,
                        IONFOUND_ISOTOPE,
                    );
                }
            }

            // y family
            let y_mz = to_mz(y_mass);
            if y_mz * z > (z - 1.0) * 350.0 {
                hypotheses += 1;
                let mut base = if charge <= likely_charge { 1.0 } else { 0.5 };
                if charge == parameters.charge_state && parameters.charge_state > 1 {
                    base *= attenuation.high_charge_y_ion;
                }
                if let Some(peak) = credit(&mut ion_found, y_mz, base) {
                    matched_hypotheses += 1;
                    cleavage_with_y[cleavage] = true;
                    if b_peaks[peak] {
                        ion_found[peak] *= OVER_USED_IONS;
                    }
                    credit(
                        &mut ion_found,
                        to_mz(y_mass - masses::AMMONIA),
                        base * attenuation.neutral_loss,
                    );
                    credit(
                        &mut ion_found,
                        to_mz(y_mass - masses::WATER),
                        base * attenuation.neutral_loss,
                    );
                    credit(&mut ion_found, to_mz(y_mass - OX_MET_LOSS), base * ox_met_mult);
                    credit(
                        &mut ion_found,
                        y_mz + ISOTOPE_SPACING / z,
                        IONFOUND_ISOTOPE,
                    );
                }
            }
        }
    }

    // Internal fragments: short interior stretches, singly charged
    if steps.len() > 4 {
        for start in 1..steps.len() - 2 {
            let mut mass = masses::HYDROGEN;
            for span in 0..MAX_INTERNAL_SPAN {
                let end = start + span;
                if end >= steps.len() - 1 {
                    break;
                }
                mass += steps[end].mass;
                if mass < precursor_mz {
                    credit(&mut ion_found, mass, attenuation.internal_fragment);
                }
            }
        }
    }

    // The four weighted components
    let weights = &parameters.score_weights;
    let total_weight = weights.total();
    let total_normalized: f64 = peaks.iter().map(|p| p.normalized).sum();

    let intensity_component = if total_normalized > 0.0 {
        ion_found
            .iter()
            .zip(peaks)
            .map(|(&found, peak)| found.min(1.0) * peak.normalized)
            .sum::<f64>()
            / total_normalized
    } else {
        0.0
    };

    let cleavages = (steps.len() - 1).max(1);
    let attenuation_component = cleavage_with_b
        .iter()
        .zip(&cleavage_with_y)
        .filter(|(&b, &y)| b && y)
        .count() as f64
        / cleavages as f64;

    let expected_length = (parameters.peptide_mw / masses::AV_RESIDUE_MASS).max(1.0);
    let matched_peaks = ion_found.iter().filter(|&&c| c > 0.0).count();
    let peaks_component = if peaks.is_empty() {
        0.0
    } else {
        let per_residue = matched_peaks as f64 / steps.len() as f64;
        let average = peaks.len() as f64 / expected_length;
        (per_residue / average.max(f64::MIN_POSITIVE)).min(1.0)
    };

    let number_component = if hypotheses == 0 {
        0.0
    } else {
        matched_hypotheses as f64 / hypotheses as f64
    };

    let score = if total_weight > 0.0 {
        (weights.attenuation * attenuation_component
            + weights.intensity * intensity_component
            + weights.peaks * peaks_component
            + weights.number * number_component)
            / total_weight
    } else {
        0.0
    };

    IntensityOutcome {
        score,
        quality: ScoredSequence::step_quality(steps),
        ion_found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::residue::index;
    use crate::spectrum::Peak;

    fn spectrum_of(peaks: &[(f64, f64)]) -> Spectrum {
        let mut spectrum = Spectrum::default();
        spectrum.extend(peaks.iter().map(|&(mz, intensity)| {
            let mut peak = Peak::new(mz, intensity);
            peak.normalized = intensity;
            peak
        }));
        spectrum
    }

    fn step(mass: f64, residue: usize) -> SequenceStep {
        SequenceStep {
            mass,
            residue: Some(residue),
        }
    }

    #[test]
    fn full_coverage_scores_high() {
        // Dipeptide AR, M = 245.15: b1 at 72.04, y1 at 175.12
        let parameters = Parameters {
            peptide_mw: 245.149,
            charge_state: 1,
            ..Parameters::default()
        };
        let spectrum = spectrum_of(&[(72.044, 100.0), (175.119, 100.0)]);
        let steps = vec![step(71.03711, index::A), step(156.10111, index::R)];
        let outcome = score_candidate(&steps, &spectrum, &parameters);
        assert!(
            outcome.score >= 0.8,
            "fully explained spectrum scored {}",
            outcome.score
        );
        assert!((outcome.quality - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wrong_sequence_scores_low() {
        let parameters = Parameters {
            peptide_mw: 245.149,
            charge_state: 1,
            ..Parameters::default()
        };
        let spectrum = spectrum_of(&[(72.044, 100.0), (175.119, 100.0)]);
        // GV explains neither peak (b1 = 58.03, y1 = 118.09)
        let steps = vec![step(57.02146, index::G), step(99.06841, index::V)];
        let outcome = score_candidate(&steps, &spectrum, &parameters);
        assert!(outcome.score < 0.2, "wrong sequence scored {}", outcome.score);
    }

    #[test]
    fn ion_found_aligns_with_peaks() {
        let parameters = Parameters {
            peptide_mw: 245.149,
            charge_state: 1,
            ..Parameters::default()
        };
        let spectrum = spectrum_of(&[(72.044, 100.0), (120.0, 5.0), (175.119, 100.0)]);
        let steps = vec![step(71.03711, index::A), step(156.10111, index::R)];
        let outcome = score_candidate(&steps, &spectrum, &parameters);
        assert_eq!(outcome.ion_found.len(), 3);
        assert!(outcome.ion_found[0] > 0.0);
        assert_eq!(outcome.ion_found[1], 0.0);
        assert!(outcome.ion_found[2] > 0.0);
    }

    #[test]
    fn modified_cysteine_improves_the_matching_run() {
        // With carbamidomethyl cysteine the theoretical
        // ions line up with a spectrum of the modified peptide
        let peaks_modified = &[(72.044, 80.0), (129.066, 80.0), (289.097, 90.0), (147.11, 70.0)];
        let parameters = Parameters {
            peptide_mw: 449.19,
            charge_state: 1,
            cys_mw: 160.031,
            ..Parameters::default()
        };
        let spectrum = spectrum_of(peaks_modified);
        let steps_modified = vec![
            step(71.03711, index::A),
            step(57.02146, index::G),
            step(160.031, index::C),
            step(128.09496, index::K),
        ];
        let steps_plain = vec![
            step(71.03711, index::A),
            step(57.02146, index::G),
            step(103.00919, index::C),
            step(128.09496, index::K),
        ];
        let modified = score_candidate(&steps_modified, &spectrum, &parameters);
        let plain = score_candidate(&steps_plain, &spectrum, &parameters);
        assert!(modified.score > plain.score);
    }
}
