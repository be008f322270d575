//! Refine the peptide mass from complementary fragment pairs.
//!
//! Ion trap spectra usually contain b/y pairs for the same cleavage; their
//! summed neutral mass equals the peptide mass, which is often measured
//! poorly in the MS scan. The refinement votes among pair sums and replaces
//! the configured mass when enough pairs agree.

use log::info;

use crate::config::Parameters;
use crate::masses;
use crate::residue::{index, ResidueTable};
use crate::spectrum::Spectrum;

/// The empirical mass-defect slope used to map a pair sum onto a nominal mass
const MASS_DEFECT: f64 = 0.000_502_75;

/// Refine `parameters.peptide_mw` in place from complementary ion pairs.
/// Returns the number of pairs behind the adjustment, 0 when nothing changed.
pub fn refine_peptide_mw(
    parameters: &mut Parameters,
    spectrum: &Spectrum,
    residues: &ResidueTable,
) -> usize {
    let glycine = residues.get(index::G).monoisotopic;
    let required_pairs = match parameters.peptide_mw {
        m if m < 750.0 => 1,
        m if m < 1500.0 => 2,
        m if m < 2250.0 => 3,
        _ => 4,
    };

    // Neutral fragment masses assuming singly charged ions, and the doubly
    // charged alternative when the precursor can hold the charge
    let singly: Vec<f64> = spectrum
        .peaks()
        .iter()
        .map(|p| p.mz.value - masses::HYDROGEN)
        .collect();
    let doubly: Vec<f64> = if parameters.charge_state > 2 {
        singly
            .iter()
            .map(|&m| {
                let test = (m + masses::HYDROGEN) * 2.0 - 2.0 * masses::HYDROGEN;
                if test < parameters.peptide_mw - glycine + parameters.fragment_err && test > 700.0
                {
                    test
                } else {
                    0.0
                }
            })
            .collect()
    } else {
        vec![0.0; singly.len()]
    };

    let collect_pairs = |window: f64| -> Vec<(f64, f64)> {
        let mut pairs = Vec::new();
        for i in 0..singly.len() {
            for j in i + 1..singly.len() {
                let sum = singly[i] + singly[j];
                if (sum - parameters.peptide_mw).abs() <= window {
                    pairs.push((sum, singly[i]));
                }
                if doubly[j] > singly[i] {
                    let sum = singly[i] + doubly[j];
                    if (sum - parameters.peptide_mw).abs() <= window {
                        pairs.push((sum, singly[i]));
                    }
                }
            }
        }
        pairs
    };

    // First pass with a loose window to estimate the pair-sum deviation
    let loose = collect_pairs(parameters.peptide_err * 2.0);
    let deviation = if loose.len() < 3 {
        parameters.peptide_err
    } else {
        let mean = loose.iter().map(|(s, _)| s).sum::<f64>() / loose.len() as f64;
        let variance = loose
            .iter()
            .map(|(s, _)| (s - mean) * (s - mean))
            .sum::<f64>()
            / (loose.len() - 1) as f64;
        variance.sqrt()
    }
    .clamp(0.5 * parameters.peptide_err, 2.0 * parameters.peptide_err);

    let pairs = collect_pairs(deviation);
    if pairs.is_empty() {
        return 0;
    }

    // Vote on nominal masses, ignoring pairs whose low-mass members sit
    // within a hydrogen of each other (isotope duplicates)
    let mut nominal: Vec<i64> = pairs
        .iter()
        .map(|(sum, _)| (sum - sum * MASS_DEFECT + 0.5) as i64)
        .collect();
    for i in 0..nominal.len() {
        if nominal[i] == 0 {
            continue;
        }
        for j in 0..nominal.len() {
            if i != j
                && nominal[j] == nominal[i]
                && (pairs[i].1 - pairs[j].1).abs() <= masses::HYDROGEN + parameters.fragment_err
            {
                nominal[j] = 0;
            }
        }
    }

    let mut best_count = 0;
    let mut best_mass = 0_i64;
    for &candidate in &nominal {
        if candidate == 0 {
            continue;
        }
        let count = nominal.iter().filter(|&&n| n == candidate).count();
        if count > best_count {
            best_count = count;
            best_mass = candidate;
        }
    }

    if best_count > required_pairs {
        let observed = best_mass as f64;
        let observed = observed + observed * MASS_DEFECT;
        if (observed - parameters.peptide_mw).abs() <= parameters.peptide_err * 1.5 {
            let extra = best_count - required_pairs;
            let refined =
                (observed * extra as f64 + parameters.peptide_mw) / (extra as f64 + 1.0);
            info!(
                "peptide mass adjusted from {:.3} to {refined:.3} using {best_count} ion pairs",
                parameters.peptide_mw
            );
            parameters.peptide_mw = refined;
            return best_count;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::Peak;

    fn spectrum_of(mzs: &[f64]) -> Spectrum {
        let mut spectrum = Spectrum::default();
        spectrum.extend(mzs.iter().map(|&mz| Peak::new(mz, 10.0)));
        spectrum
    }

    #[test]
    fn complementary_pairs_pull_the_mass() {
        // Peptide mass 600.0: construct three b/y style pairs summing to it
        let mut parameters = Parameters {
            peptide_mw: 600.4,
            peptide_err: 0.5,
            charge_state: 2,
            ..Parameters::default()
        };
        let m = 600.0;
        let spectrum = spectrum_of(&[
            150.0 + masses::HYDROGEN,
            m - 150.0 + masses::HYDROGEN,
            220.0 + masses::HYDROGEN,
            m - 220.0 + masses::HYDROGEN,
            275.0 + masses::HYDROGEN,
            m - 275.0 + masses::HYDROGEN,
        ]);
        let pairs = refine_peptide_mw(&mut parameters, &spectrum, &ResidueTable::default());
        assert!(pairs >= 2);
        assert!((parameters.peptide_mw - 600.0).abs() < 0.4);
    }

    #[test]
    fn no_pairs_no_change() {
        let mut parameters = Parameters {
            peptide_mw: 600.0,
            peptide_err: 0.5,
            charge_state: 1,
            ..Parameters::default()
        };
        let spectrum = spectrum_of(&[100.0, 150.0, 210.0]);
        assert_eq!(
            refine_peptide_mw(&mut parameters, &spectrum, &ResidueTable::default()),
            0
        );
        assert!((parameters.peptide_mw - 600.0).abs() < f64::EPSILON);
    }
}
