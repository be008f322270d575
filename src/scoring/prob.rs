//! The probability scorer: Bayesian odds that the matched ions are not
//! random.
//!
//! For every predicted ion the score multiplies by `P/P_random` when the ion
//! is found and `(1−P)/(1−P_random)` when it is not, where `P_random` is
//! estimated from the local peak density in a 200 Da sliding window. The
//! final score is the log10 of the product, floored at zero.

use crate::config::Parameters;
use crate::masses;
use crate::residue::{index, ResidueTable};
use crate::scoring::SequenceStep;
use crate::spectrum::Spectrum;

const B_ION_PROB: f64 = 0.7;
const B_MINUS_WATER_PROB: f64 = 0.3;
const B_MINUS_AMMONIA_PROB: f64 = 0.15;
const B_DOUBLY_MULTIPLIER: f64 = 0.5;
const A_ION_PROB: f64 = 0.1;
const Y_ION_PROB: f64 = 0.8;
const Y_MINUS_WATER_PROB: f64 = 0.1;
const Y_MINUS_AMMONIA_PROB: f64 = 0.1;
const Y_DOUBLY_MULTIPLIER: f64 = 0.5;
const IMMONIUM_PROB: f64 = 0.2;
const INTERNAL_PROB: f64 = 0.1;
const INTERNAL_PRO_PROB: f64 = 0.2;

/// Characteristic low-mass (immonium and related) ions per canonical residue
const LOW_MASS_IONS: [[f64; 3]; 20] = [
    /* A */ [44.0500, 0.0, 0.0],
    /* R */ [70.0657, 87.0922, 112.0875],
    /* N */ [87.0558, 0.0, 0.0],
    /* D */ [88.0399, 0.0, 0.0],
    /* C */ [0.0, 0.0, 0.0],
    /* E */ [102.0555, 0.0, 0.0],
    /* Q */ [84.0450, 101.0715, 129.0664],
    /* G */ [0.0, 0.0, 0.0],
    /* H */ [110.0718, 0.0, 0.0],
    /* I */ [86.0970, 120.0483, 0.0],
    /* L */ [86.0970, 0.0, 0.0],
    /* K */ [84.0814, 101.1079, 129.1028],
    /* M */ [104.0534, 0.0, 0.0],
    /* F */ [120.0813, 0.0, 0.0],
    /* P */ [70.0657, 0.0, 0.0],
    /* S */ [60.0449, 0.0, 0.0],
    /* T */ [74.0606, 0.0, 0.0],
    /* W */ [159.0922, 0.0, 0.0],
    /* Y */ [136.0762, 0.0, 0.0],
    /* V */ [72.0813, 0.0, 0.0],
];

struct Scorer<'a> {
    mz: Vec<f64>,
    intensity: Vec<f64>,
    /// 1 = most intense
    rank: Vec<usize>,
    random: Vec<f64>,
    parameters: &'a Parameters,
    tolerance: f64,
}

/// Score one candidate; `ion_found` (from the intensity scorer, aligned to
/// the conditioned spectrum) is updated with the ions this stage finds.
pub fn probability_score(
    steps: &[SequenceStep],
    spectrum: &Spectrum,
    parameters: &Parameters,
    ion_found: &mut [f64],
) -> f64 {
    if spectrum.is_empty() || steps.is_empty() {
        return 0.0;
    }
    let mz: Vec<f64> = spectrum.peaks().iter().map(|p| p.mz.value).collect();
    let intensity: Vec<f64> = spectrum.peaks().iter().map(|p| p.normalized).collect();

    let mut order: Vec<usize> = (0..mz.len()).collect();
    order.sort_by(|&a, &b| intensity[b].total_cmp(&intensity[a]));
    let mut rank = vec![0_usize; mz.len()];
    for (position, &peak) in order.iter().enumerate() {
        rank[peak] = position + 1;
    }

    let mut scorer = Scorer {
        random: random_probabilities(&mz),
        mz,
        intensity,
        rank,
        parameters,
        tolerance: parameters.fragment_err,
    };

    scorer.mark_precursor(ion_found);
    let mut score = scorer.initial_score(steps);
    score = scorer.b_ions(steps, score, ion_found);
    score = scorer.y_ions(steps, score, ion_found);
    score = scorer.internal_ions(steps, score, ion_found);
    score = scorer.immonium_ions(steps, score, ion_found);

    if score > 1.0 {
        score.log10()
    } else {
        0.0
    }
}

/// Per-peak random match probability: the peak count in a 200 Da window
/// (anchored at the spectrum edges) over the window width, clamped away
/// from 0 and 1
fn random_probabilities(mz: &[f64]) -> Vec<f64> {
    let low = mz[0];
    let high = mz[mz.len() - 1];
    mz.iter()
        .map(|&center| {
            let count = if center < low + 100.0 {
                mz.iter().filter(|&&m| m < low + 200.0).count()
            } else if center > high - 100.0 {
                mz.iter().filter(|&&m| m > high - 200.0).count()
            } else {
                mz.iter()
                    .filter(|&&m| m > center - 100.0 && m < center + 100.0)
                    .count()
            };
            (count as f64 / 200.0).clamp(0.005, 0.995)
        })
        .collect()
}

impl Scorer<'_> {
    /// Clamp a scan index the way the odds lookups expect
    fn odds_index(&self, k: usize) -> usize {
        k.clamp(1, self.mz.len()) - 1
    }

    /// Multiply in one found / not-found odds factor
    fn apply(&self, score: f64, probability: f64, found: Option<usize>, scan_end: usize) -> f64 {
        match found {
            Some(index) => score * (probability / self.random[index]),
            None => {
                let index = self.odds_index(scan_end);
                score * ((1.0 - probability) / (1.0 - self.random[index]))
            }
        }
    }

    /// The precursor and its water/ammonia losses are always "found"
    fn mark_precursor(&mut self, ion_found: &mut [f64]) {
        let parameters = self.parameters;
        let precursor = (parameters.peptide_mw
            + f64::from(parameters.charge_state) * masses::HYDROGEN)
            / f64::from(parameters.charge_state);
        for target in [
            precursor,
            precursor - masses::WATER / f64::from(parameters.charge_state),
            precursor - masses::AMMONIA / f64::from(parameters.charge_state),
        ] {
            for (index, &m) in self.mz.iter().enumerate() {
                if m > precursor + self.tolerance {
                    break;
                }
                if (m - target).abs() <= self.tolerance {
                    ion_found[index] = 1.0;
                    self.random[index] = 0.005;
                }
            }
        }
    }

    /// Tryptic C-termini are probable a priori
    fn initial_score(&self, steps: &[SequenceStep]) -> f64 {
        let table = ResidueTable::default();
        let arg = table.get(index::R).monoisotopic;
        let lys = table.get(index::K).monoisotopic;
        let last = steps[steps.len() - 1].mass;
        let terminal_basic = (last - arg).abs() <= self.tolerance
            || (last - lys).abs() <= self.tolerance
            || table.residues().iter().any(|r| {
                let rest = last - r.monoisotopic;
                (rest - arg).abs() <= self.tolerance || (rest - lys).abs() <= self.tolerance
            });
        if terminal_basic {
            0.95
        } else {
            0.05
        }
    }

    /// Tests if an interior step is a two-residue gap
    fn is_gap(&self, steps: &[SequenceStep], position: usize) -> bool {
        position != 0 && position != steps.len() - 1 && !steps[position].is_single()
    }

    fn b_ions(&self, steps: &[SequenceStep], mut score: f64, ion_found: &mut [f64]) -> f64 {
        let mut template = self.parameters.modified_n_term;
        for (position, step) in steps.iter().enumerate() {
            let gap = self.is_gap(steps, position);
            template += step.mass;
            let b17 = template - masses::AMMONIA;
            let b18 = template - masses::WATER;
            let a_template = template - masses::CO;
            for charge in 1..=self.parameters.charge_state {
                let z = f64::from(charge);
                let b = (template + (z - 1.0) * masses::HYDROGEN) / z;
                let b_min17 = (b17 + (z - 1.0) * masses::HYDROGEN) / z;
                let b_min18 = (b18 + (z - 1.0) * masses::HYDROGEN) / z;
                let a = (a_template + (z - 1.0) * masses::HYDROGEN) / z;
                if b * z <= (z - 1.0) * 350.0 || b <= self.mz[0] {
                    continue;
                }

                let mut b_index = None;
                let mut scan_end = 0;
                for (k, &m) in self.mz.iter().enumerate() {
                    scan_end = k;
                    if m > b + self.tolerance {
                        break;
                    }
                    if m > b - self.tolerance {
                        ion_found[k] = 1.0;
                        b_index = Some(k);
                    }
                }

                let mut a_index = None;
                let mut loss17_index = None;
                let mut loss18_index = None;
                if let Some(found) = b_index {
                    let mut k = found;
                    while k > 0 {
                        k -= 1;
                        if self.mz[k] <= a - self.tolerance {
                            break;
                        }
                        let shared = self.intensity[found]
                            / (self.intensity[found] + self.intensity[k]).max(f64::MIN_POSITIVE);
                        for (target, slot) in [
                            (b_min17, &mut loss17_index),
                            (b_min18, &mut loss18_index),
                            (a, &mut a_index),
                        ] {
                            if (self.mz[k] - target).abs() < self.tolerance {
                                *slot = Some(k);
                                if shared > ion_found[k] {
                                    ion_found[k] = shared;
                                }
                            }
                        }
                    }
                }

                let multiplier = if charge == 1 { 1.0 } else { B_DOUBLY_MULTIPLIER };
                score = self.apply(score, B_ION_PROB * multiplier, b_index, scan_end);
                score = self.apply(score, B_MINUS_WATER_PROB * multiplier, loss18_index, scan_end);
                score = self.apply(
                    score,
                    B_MINUS_AMMONIA_PROB * multiplier,
                    loss17_index,
                    scan_end,
                );
                score = self.apply(score, A_ION_PROB * multiplier, a_index, scan_end);

                // A gap means a fragment went unobserved; charge the miss
                // once. Half odds: gaps are often proline, not absence.
                if gap && charge == 1 {
                    score = self.apply(score, B_ION_PROB * 0.5, None, scan_end);
                }
            }
        }
        score
    }

    fn y_ions(&self, steps: &[SequenceStep], mut score: f64, ion_found: &mut [f64]) -> f64 {
        let mut template = self.parameters.modified_c_term + 2.0 * masses::HYDROGEN;
        for position in (0..steps.len()).rev() {
            let gap = self.is_gap(steps, position);
            template += steps[position].mass;
            let y17 = template - masses::AMMONIA;
            let y18 = template - masses::WATER;
            for charge in 1..=self.parameters.charge_state {
                let z = f64::from(charge);
                let y = (template + (z - 1.0) * masses::HYDROGEN) / z;
                let y_min17 = (y17 + (z - 1.0) * masses::HYDROGEN) / z;
                let y_min18 = (y18 + (z - 1.0) * masses::HYDROGEN) / z;
                if y * z <= (z - 1.0) * 350.0 || y <= self.mz[0] {
                    continue;
                }

                let mut y_index = None;
                let mut scan_end = 0;
                for (k, &m) in self.mz.iter().enumerate() {
                    scan_end = k;
                    if m > y + self.tolerance {
                        break;
                    }
                    if m > y - self.tolerance {
                        ion_found[k] = 1.0;
                        y_index = Some(k);
                    }
                }

                let mut loss17_index = None;
                let mut loss18_index = None;
                if let Some(found) = y_index {
                    let mut k = found;
                    while k > 0 {
                        k -= 1;
                        if self.mz[k] <= y_min18 - self.tolerance {
                            break;
                        }
                        let shared = self.intensity[found]
                            / (self.intensity[found] + self.intensity[k]).max(f64::MIN_POSITIVE);
                        for (target, slot) in
                            [(y_min17, &mut loss17_index), (y_min18, &mut loss18_index)]
                        {
                            if (self.mz[k] - target).abs() < self.tolerance {
                                *slot = Some(k);
                                if shared > ion_found[k] {
                                    ion_found[k] = shared;
                                }
                            }
                        }
                    }
                }

                let multiplier = if charge == 1 { 1.0 } else { Y_DOUBLY_MULTIPLIER };
                score = self.apply(score, Y_ION_PROB * multiplier, y_index, scan_end);
                score = self.apply(score, Y_MINUS_WATER_PROB * multiplier, loss18_index, scan_end);
                score = self.apply(
                    score,
                    Y_MINUS_AMMONIA_PROB * multiplier,
                    loss17_index,
                    scan_end,
                );

                if gap && charge == 1 {
                    score = self.apply(score, Y_ION_PROB * 0.5, None, scan_end);
                }
            }
        }
        score
    }

    fn internal_ions(&self, steps: &[SequenceStep], mut score: f64, ion_found: &mut [f64]) -> f64 {
        if steps.len() < 4 {
            return score;
        }
        let proline = ResidueTable::default().get(index::P).monoisotopic;
        let precursor = (self.parameters.peptide_mw
            + f64::from(self.parameters.charge_state) * masses::HYDROGEN)
            / f64::from(self.parameters.charge_state);
        let count = self.mz.len();

        for start in 1..steps.len() - 2 {
            let mut mass = steps[start].mass + masses::HYDROGEN;
            let n_term_pro = (steps[start].mass - proline).abs() < self.tolerance;
            let mut span = 1;
            for end in start + 1..steps.len() - 1 {
                mass += steps[end].mass;
                span += 1;
                if mass >= precursor - self.tolerance || span >= 6 || mass <= self.mz[0] {
                    continue;
                }
                let mut found = false;
                let mut scan_end = 0;
                for (k, &m) in self.mz.iter().enumerate() {
                    scan_end = k;
                    if m > mass + self.tolerance {
                        break;
                    }
                    if (m - mass).abs() < self.tolerance {
                        if n_term_pro {
                            // Internal fragments behind proline are common
                            found = true;
                            ion_found[k] = 1.0;
                        } else if self.rank[k] as f64 / count as f64 > 0.5 {
                            // Only weak peaks are believable internals
                            found = true;
                            let value = self.rank[k] as f64 / count as f64 - 0.5;
                            if value > ion_found[k] {
                                ion_found[k] = value;
                            }
                        }
                        break;
                    }
                }
                let probability = if n_term_pro {
                    INTERNAL_PRO_PROB
                } else {
                    INTERNAL_PROB
                };
                let found_index = if found { Some(self.odds_index(scan_end + 1)) } else { None };
                score = self.apply(score, probability, found_index, scan_end);
            }
        }
        score
    }

    fn immonium_ions(&self, steps: &[SequenceStep], mut score: f64, ion_found: &mut [f64]) -> f64 {
        for step in steps {
            let Some(residue) = step.residue else {
                continue;
            };
            if residue >= LOW_MASS_IONS.len() {
                continue;
            }
            for &target in &LOW_MASS_IONS[residue] {
                if target <= 0.0 || target <= self.mz[0] {
                    continue;
                }
                let mut found = None;
                for (k, &m) in self.mz.iter().enumerate() {
                    if m > 160.0 {
                        break;
                    }
                    if (m - target).abs() < self.tolerance {
                        ion_found[k] = 1.0;
                        found = Some(k);
                    }
                }
                score = match found {
                    Some(k) => score * (IMMONIUM_PROB / self.random[k]),
                    None => score * ((1.0 - IMMONIUM_PROB) / (1.0 - self.random[0])),
                };
            }
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn random_probabilities_are_clamped() {
        let probabilities = random_probabilities(&[100.0, 150.0, 500.0, 900.0]);
        for p in probabilities {
            assert!((0.005..=0.995).contains(&p));
        }
    }

    #[test]
    fn matching_sequence_scores_positive() {
        // Dipeptide AR with its b1 and y1 present
        let parameters = Parameters {
            peptide_mw: 245.149,
            charge_state: 1,
            ..Parameters::default()
        };
        let spectrum = spectrum_of(&[(72.044, 100.0), (175.119, 100.0)]);
        let steps = vec![step(71.03711, index::A), step(156.10111, index::R)];
        let mut ion_found = vec![0.0; spectrum.len()];
        let score = probability_score(&steps, &spectrum, &parameters, &mut ion_found);
        assert!(score > 0.0, "matching sequence scored {score}");
    }

    #[test]
    fn empty_spectrum_scores_zero() {
        let parameters = Parameters::default();
        let spectrum = Spectrum::default();
        let steps = vec![step(71.03711, index::A)];
        let mut ion_found: Vec<f64> = Vec::new();
        assert_eq!(
            probability_score(&steps, &spectrum, &parameters, &mut ion_found),
            0.0
        );
    }

    #[test]
    fn tryptic_terminus_beats_nontryptic() {
        let parameters = Parameters {
            peptide_mw: 245.149,
            charge_state: 1,
            ..Parameters::default()
        };
        let spectrum = spectrum_of(&[(72.044, 100.0), (175.119, 100.0)]);
        let scorer = Scorer {
            random: random_probabilities(&[72.044, 175.119]),
            mz: vec![72.044, 175.119],
            intensity: vec![100.0, 100.0],
            rank: vec![1, 2],
            parameters: &parameters,
            tolerance: parameters.fragment_err,
        };
        let tryptic = vec![step(71.03711, index::A), step(156.10111, index::R)];
        let nontryptic = vec![step(71.03711, index::A), step(99.06841, index::V)];
        assert!(scorer.initial_score(&tryptic) > scorer.initial_score(&nontryptic));
    }
}
