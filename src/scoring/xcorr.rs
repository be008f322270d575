//! The cross-correlation scorer: correlate a synthetic spectrum for each
//! candidate against the observed spectrum on a 0.5 Da grid.
//!
//! The observed spectrum is painted once, normalized Sequest-style, and
//! autocorrelated; each candidate's mock spectrum is then correlated against
//! it and the zero-lag score, with the symmetric-lag background subtracted,
//! is normalized by the autocorrelation.

use crate::config::{FragmentationSpec, Parameters};
use crate::masses;
use crate::residue::{index, ResidueTable};
use crate::scoring::fft;
use crate::scoring::SequenceStep;
use crate::spectrum::Spectrum;

/// At most this many intensity-ranked candidates are cross-correlated
pub const MAX_X_CORR_NUM: usize = 5000;

/// Peak heights on the sides of a main mock peak
const SIDE_PEAK_ATT: f64 = 0.75;
/// Neutral loss height for singly charged precursors
const PLUS1_NEUT_LOSS_ATT: f64 = 0.5;
/// Neutral loss height for multiply charged precursors
const NEUT_LOSS_ATT: f64 = 0.1;
/// Height for b ions that are not very likely
const BAD_B_ATT: f64 = 0.05;
/// Height for a ions
const A_ATT: f64 = 0.5;
/// Height for a ions that are not very likely
const BAD_A_ATT: f64 = 0.05;
/// Height for internal fragment ions
const INT_FRAG_ATT: f64 = 0.1;
/// Height for y ions that are not very likely
const BAD_Y_ATT: f64 = 0.05;
/// Main mock peak height; matches the observed-spectrum window maximum
const FULL_INTENSITY: f64 = 50.0;
/// Attenuation for y ions directly after proline
const PROLINE_Y_ATT: f64 = 0.2;

/// Nominal masses of characteristic low-mass ions per canonical residue
const LOW_MASS_ION: [f64; 20] = [
    44.0, 112.0, 87.0, 88.0, 76.0, 102.0, 102.0, 30.0, 110.0, 86.0, 86.0, 129.0, 104.0, 120.0,
    70.0, 60.0, 74.0, 159.0, 136.0, 72.0,
];
/// Intensity factors for those low-mass ions
const LOW_MASS_ION_FACTOR: [f64; 20] = [
    0.1, 0.1, 0.1, 0.1, 0.0, 0.1, 0.1, 0.0, 0.5, 0.5, 0.5, 0.25, 0.1, 0.5, 0.3, 0.1, 0.1, 0.2,
    0.3, 0.2,
];

/// The observed spectrum prepared for cross-correlation
pub struct XcorrScorer {
    spectrum1: Vec<f64>,
    size: usize,
    autocorrelation: f64,
    side_peak: f64,
    wide_peak: bool,
    parent_mz: f64,
    low_mass_range: f64,
    high_mass_range: f64,
}

/// Max-paint a mock peak and its shoulders onto a 0.5 Da grid
fn add_peak(spectrum: &mut [f64], mass: f64, intensity: f64, side_peak: f64, wide_peak: bool) {
    if intensity < 2.0 {
        return;
    }
    let bin = (mass + 0.5) as usize; // callers pass doubled masses
    if bin <= 2 || bin >= spectrum.len() - 2 {
        return;
    }
    if spectrum[bin] < intensity {
        spectrum[bin] = intensity;
    }
    let side = intensity * side_peak;
    if spectrum[bin - 1] < side {
        spectrum[bin - 1] = side;
    }
    if spectrum[bin + 1] < side {
        spectrum[bin + 1] = side;
    }
    if wide_peak {
        let far = side * side_peak;
        if spectrum[bin - 2] < far {
            spectrum[bin - 2] = far;
        }
        if spectrum[bin + 2] < far {
            spectrum[bin + 2] = far;
        }
    }
}

/// The zero-lag score less the mean asymmetry of the lag spectrum; exact
/// matches are exactly symmetrical, so the subtraction punishes shifts
fn lag_score(mut tau: Vec<f64>) -> f64 {
    for value in &mut tau {
        if *value < 1.0 {
            *value = 0.0;
        }
    }
    let n = tau.len();
    let asymmetry: f64 = (1..250.min(n / 2))
        .map(|i| (tau[i] - tau[n - i]).abs())
        .sum();
    tau[0] - asymmetry / 250.0
}

impl XcorrScorer {
    /// Paint and autocorrelate the observed spectrum
    pub fn new(spectrum: &Spectrum, parameters: &Parameters) -> Self {
        let parent_mz = (parameters.peptide_mw
            + f64::from(parameters.charge_state) * masses::HYDROGEN)
            / f64::from(parameters.charge_state);
        let size = fft::buffer_size((2.0 * (parameters.peptide_mw + 100.0)) as usize);

        let side_peak = if parameters.qtof_err != 0.0 && parameters.qtof_err < 0.25 {
            0.0
        } else {
            SIDE_PEAK_ATT
        };
        let wide_peak = parameters.fragment_err > 0.75;

        let (low_mass_range, high_mass_range) =
            if parameters.fragmentation == FragmentationSpec::IonTrap {
                (parent_mz * 0.333, 2000.0)
            } else {
                (146.0, 2.0 * parent_mz)
            };

        // Sequest-style conditioning: square-root intensities, ten equal m/z
        // windows each normalized to the mock full intensity
        let mut spectrum1 = vec![0.0; size];
        if !spectrum.is_empty() {
            let low = spectrum.peaks()[0].mz.value;
            let high = spectrum.peaks()[spectrum.len() - 1].mz.value;
            let window = ((high - low) / 10.0).max(f64::MIN_POSITIVE);
            let roots: Vec<f64> = spectrum
                .peaks()
                .iter()
                .map(|p| p.intensity.into_inner().sqrt())
                .collect();
            let mut window_max = [0.0_f64; 10];
            for (peak, &root) in spectrum.peaks().iter().zip(&roots) {
                let slot = (((peak.mz.value - low) / window) as usize).min(9);
                window_max[slot] = window_max[slot].max(root);
            }
            for (peak, &root) in spectrum.peaks().iter().zip(&roots) {
                let slot = (((peak.mz.value - low) / window) as usize).min(9);
                if window_max[slot] > 0.0 {
                    let normalized = root / window_max[slot] * FULL_INTENSITY;
                    add_peak(&mut spectrum1, peak.mz.value * 2.0, normalized, side_peak, wide_peak);
                }
            }
        }

        let autocorrelation = match lag_score(fft::correlate(&spectrum1, &spectrum1)) {
            a if a == 0.0 => 0.0001,
            a => a,
        };

        Self {
            spectrum1,
            size,
            autocorrelation,
            side_peak,
            wide_peak,
            parent_mz,
            low_mass_range,
            high_mass_range,
        }
    }

    /// The autocorrelation the scores are normalized by
    pub fn autocorrelation(&self) -> f64 {
        self.autocorrelation
    }

    /// Cross-correlate one candidate's mock spectrum; the result is
    /// normalized so a perfect self-match scores 1
    pub fn score(&self, steps: &[SequenceStep], parameters: &Parameters) -> f64 {
        let spectrum2 = self.mock_spectrum(steps, parameters);
        lag_score(fft::correlate(&spectrum2, &self.spectrum1)) / self.autocorrelation
    }

    /// Score the prepared observed spectrum against itself (exactly 1 by
    /// the normalization convention)
    pub fn self_score(&self) -> f64 {
        lag_score(fft::correlate(&self.spectrum1, &self.spectrum1)) / self.autocorrelation
    }

    /// Tests if a step is, or could contain, a charge-carrying residue
    fn chargeable(step: &SequenceStep, tolerance: f64) -> bool {
        let table = ResidueTable::default();
        if let Some(residue) = step.residue {
            return residue == index::R || residue == index::H || residue == index::K;
        }
        [index::R, index::H, index::K].iter().any(|&basic| {
            let rest = step.mass - table.get(basic).monoisotopic;
            table
                .residues()
                .iter()
                .any(|r| (rest - r.monoisotopic).abs() <= tolerance)
        })
    }

    /// Synthesize the theoretical spectrum for a candidate on the same grid
    fn mock_spectrum(&self, steps: &[SequenceStep], parameters: &Parameters) -> Vec<f64> {
        let mut spectrum2 = vec![0.0; self.size];
        let charge_state = parameters.charge_state;
        let ion_trap = parameters.fragmentation == FragmentationSpec::IonTrap;
        let tolerance = parameters.fragment_err;
        let length = steps.len();
        if length == 0 {
            return spectrum2;
        }

        let in_range = |mass: f64| {
            mass < parameters.scan_mass_high && mass < self.high_mass_range && mass > self.low_mass_range
        };

        // Chargeable residue bookkeeping: one charge lives on the N-terminus
        let mut n_charge_count = 1
            + steps
                .iter()
                .filter(|s| Self::chargeable(s, tolerance))
                .count() as i32;
        let mut c_charge_count = 1_i32;
        let n_term_is_pair = !steps[0].is_single();

        let prefix_masses: Vec<f64> = steps
            .iter()
            .scan(parameters.modified_n_term, |acc, s| {
                *acc += s.mass;
                Some(*acc)
            })
            .collect();
        let total = prefix_masses[length - 1];

        for cleavage in (1..length).rev() {
            let mut full_intensity = FULL_INTENSITY;

            let b_ion = masses::mono_to_av_correct(
                prefix_masses[cleavage - 1],
                parameters.mono_to_av,
            );
            let y_ion = masses::mono_to_av_correct(
                total - prefix_masses[cleavage - 1] + parameters.modified_c_term
                    + 2.0 * masses::HYDROGEN,
                parameters.mono_to_av,
            );

            if Self::chargeable(&steps[cleavage], tolerance) {
                c_charge_count += 1;
                n_charge_count -= 1;
            }

            for charge in 1..=charge_state {
                let z = f64::from(charge);
                let b_mz = (b_ion + (z - 1.0) * masses::HYDROGEN) / z;
                let a_mz = (b_ion - masses::CO + (z - 1.0) * masses::HYDROGEN) / z;
                let y_mz = (y_ion + (z - 1.0) * masses::HYDROGEN) / z;
                // Triply and higher charged fragments are unlikely
                if charge == 3 {
                    full_intensity /= 4.0;
                }

                // b and a ions need chargeable residues on their side, and
                // are skipped for bare one-residue N-terminal pieces
                let b_allowed = n_charge_count >= charge
                    && cleavage != length
                    && (cleavage != 1 || n_term_is_pair);
                if b_allowed && b_mz * z > (z - 1.0) * 500.0 {
                    if in_range(b_mz) && b_mz < parameters.scan_mass_high {
                        let favoured = charge_state == 1
                            || ((charge == 1 || charge <= charge_state - 1)
                                && (b_mz < self.parent_mz
                                    || n_charge_count >= charge_state
                                    || ion_trap));
                        let loss_att = if charge_state == 1 {
                            PLUS1_NEUT_LOSS_ATT
                        } else {
                            NEUT_LOSS_ATT
                        };
                        let (b_height, loss_height) = if favoured {
                            (full_intensity, full_intensity * loss_att)
                        } else {
                            (
                                full_intensity * BAD_B_ATT,
                                full_intensity * BAD_B_ATT * NEUT_LOSS_ATT,
                            )
                        };
                        self.add(&mut spectrum2, b_mz * 2.0, b_height);
                        self.add(&mut spectrum2, (b_mz - masses::AMMONIA / z) * 2.0, loss_height);
                        self.add(&mut spectrum2, (b_mz - masses::WATER / z) * 2.0, loss_height);
                    }

                    if in_range(a_mz) {
                        let a2_position = (n_term_is_pair && cleavage == 1)
                            || (!n_term_is_pair && cleavage == 2);
                        let a_height = if charge_state == 1 {
                            full_intensity * A_ATT
                        } else if charge == 1 && a2_position {
                            full_intensity * A_ATT
                        } else if (charge == 1 || charge <= charge_state - 1)
                            && (b_mz < self.parent_mz || n_charge_count >= charge_state)
                        {
                            full_intensity * A_ATT * BAD_A_ATT
                        } else {
                            full_intensity * A_ATT * BAD_A_ATT * BAD_A_ATT
                        };
                        self.add(&mut spectrum2, a_mz * 2.0, a_height);
                    }
                }

                // y ions
                if c_charge_count >= charge && y_mz * z > (z - 1.0) * 500.0 && in_range(y_mz) {
                    let interior = cleavage > 2 && cleavage < length - 2;
                    let pro_att = if interior
                        && steps[cleavage - 1].residue == Some(index::P)
                    {
                        PROLINE_Y_ATT
                    } else {
                        1.0
                    };
                    let height = full_intensity * pro_att;

                    if charge_state == 1 {
                        self.add(&mut spectrum2, y_mz * 2.0, height);
                        self.add(
                            &mut spectrum2,
                            (y_mz - masses::AMMONIA / z) * 2.0,
                            height * PLUS1_NEUT_LOSS_ATT,
                        );
                        self.add(
                            &mut spectrum2,
                            (y_mz - masses::WATER / z) * 2.0,
                            height * PLUS1_NEUT_LOSS_ATT,
                        );
                    } else {
                        let near_c_term = (cleavage as f64) <= length as f64 / 4.0 && ion_trap;
                        let favoured =
                            charge == 1 || charge <= charge_state - 1 || near_c_term;
                        if favoured {
                            self.add(&mut spectrum2, y_mz * 2.0, height);
                            // Multiply charged y ions are wide; pad them
                            if charge > 1 {
                                self.add(&mut spectrum2, y_mz * 2.0 - 1.0, height);
                                self.add(&mut spectrum2, y_mz * 2.0 + 1.0, height);
                            }
                            for loss in [masses::AMMONIA, masses::WATER] {
                                let loss_mz = (y_mz - loss / z) * 2.0;
                                self.add(&mut spectrum2, loss_mz, height * NEUT_LOSS_ATT);
                                if charge > 1 {
                                    self.add(
                                        &mut spectrum2,
                                        loss_mz - 1.0,
                                        height * NEUT_LOSS_ATT,
                                    );
                                    self.add(
                                        &mut spectrum2,
                                        loss_mz + 1.0,
                                        height * NEUT_LOSS_ATT,
                                    );
                                }
                            }
                        } else {
                            self.add(&mut spectrum2, y_mz * 2.0, height * BAD_Y_ATT);
                            for loss in [masses::AMMONIA, masses::WATER] {
                                self.add(
                                    &mut spectrum2,
                                    (y_mz - loss / z) * 2.0,
                                    height * BAD_Y_ATT * NEUT_LOSS_ATT,
                                );
                            }
                        }
                    }
                }
            }
        }

        // Internal fragments: short interior stretches, +1 only, not on
        // ion traps
        if length > 4 && !ion_trap {
            for i in 1..length - 2 {
                for j in i + 1..length - 1 {
                    if j > i + 3 {
                        break;
                    }
                    let fragment: f64 = masses::HYDROGEN
                        + steps[i..=j].iter().map(|s| s.mass).sum::<f64>();
                    if fragment < parameters.scan_mass_high
                        && fragment < self.parent_mz
                        && in_range(fragment)
                    {
                        self.add(
                            &mut spectrum2,
                            fragment * 2.0,
                            FULL_INTENSITY * INT_FRAG_ATT,
                        );
                    }
                }
            }
        }

        // Low-mass immonium ions
        for step in steps {
            if let Some(residue) = step.residue {
                if residue < LOW_MASS_ION.len() && LOW_MASS_ION[residue] > self.low_mass_range {
                    self.add(
                        &mut spectrum2,
                        LOW_MASS_ION[residue] * 2.0,
                        FULL_INTENSITY * LOW_MASS_ION_FACTOR[residue],
                    );
                }
            }
        }

        // The precursor and its losses never count
        let z = f64::from(charge_state);
        for drop in [
            self.parent_mz,
            self.parent_mz - masses::WATER / z,
            self.parent_mz - masses::AMMONIA / z,
            self.parent_mz - 2.0 * masses::WATER / z,
            self.parent_mz - 2.0 * masses::AMMONIA / z,
        ] {
            let bin = (drop * 2.0 + 0.5) as usize;
            let width = if self.wide_peak { 2 } else { 1 };
            for offset in 0..=width {
                if bin >= offset && bin + offset < spectrum2.len() {
                    spectrum2[bin - offset] = 0.0;
                    spectrum2[bin + offset] = 0.0;
                }
            }
        }

        // Nothing outside the instrument's scan range counts either
        let low_bin = (parameters.scan_mass_low * 2.0) as usize;
        let high_bin = (parameters.scan_mass_high * 2.0) as usize;
        for (bin, value) in spectrum2.iter_mut().enumerate() {
            if bin + 1 < low_bin || bin > high_bin + 1 {
                *value = 0.0;
            }
        }

        spectrum2
    }

    fn add(&self, spectrum: &mut [f64], doubled_mass: f64, intensity: f64) {
        add_peak(spectrum, doubled_mass, intensity, self.side_peak, self.wide_peak);
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
    fn normalized_self_score_is_one() {
        // The normalization convention pins the self-match at exactly 1
        let parameters = Parameters {
            peptide_mw: 500.0,
            charge_state: 1,
            ..Parameters::default()
        };
        let spectrum = spectrum_of(&[(100.0, 50.0), (200.0, 80.0), (350.0, 20.0)]);
        let scorer = XcorrScorer::new(&spectrum, &parameters);
        assert!((scorer.self_score() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn matching_candidate_outscores_a_wrong_one() {
        // Tetrapeptide AGCK, +1, M = 392.17 with reduced cysteine
        let parameters = Parameters {
            peptide_mw: 392.173,
            charge_state: 1,
            scan_mass_low: 50.0,
            scan_mass_high: 2000.0,
            ..Parameters::default()
        };
        let spectrum = spectrum_of(&[
            (72.044, 60.0),   // b1
            (129.066, 70.0),  // b2
            (232.075, 80.0),  // b3
            (147.113, 90.0),  // y1
            (250.122, 60.0),  // y2
            (307.144, 50.0),  // y3
        ]);
        let scorer = XcorrScorer::new(&spectrum, &parameters);
        let right = vec![
            step(71.03711, index::A),
            step(57.02146, index::G),
            step(103.00919, index::C),
            step(128.09496, index::K),
        ];
        let wrong = vec![
            step(99.06841, index::V),
            step(97.05276, index::P),
            step(67.7, index::G),
            step(128.09496, index::K),
        ];
        let right_score = scorer.score(&right, &parameters);
        let wrong_score = scorer.score(&wrong, &parameters);
        assert!(
            right_score > wrong_score,
            "right {right_score} vs wrong {wrong_score}"
        );
        assert!(right_score > 0.0);
    }

    #[test]
    fn mock_peaks_respect_the_scan_range() {
        let parameters = Parameters {
            peptide_mw: 392.173,
            charge_state: 1,
            scan_mass_low: 200.0,
            scan_mass_high: 300.0,
            ..Parameters::default()
        };
        let spectrum = spectrum_of(&[(232.075, 80.0), (250.122, 60.0)]);
        let scorer = XcorrScorer::new(&spectrum, &parameters);
        let steps = vec![
            step(71.03711, index::A),
            step(57.02146, index::G),
            step(103.00919, index::C),
            step(128.09496, index::K),
        ];
        let mock = scorer.mock_spectrum(&steps, &parameters);
        for (bin, &value) in mock.iter().enumerate() {
            if bin + 1 < 400 || bin > 601 {
                assert_eq!(value, 0.0, "bin {bin} outside the scan range is set");
            }
        }
    }
}
