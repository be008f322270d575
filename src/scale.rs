//! The process-wide integer mass scale.
//!
//! All masses inside the graph, gap list, and enumeration stages are integers
//! `round(mass_Da · S)` for a multiplier `S ∈ {1, 10, 100, 1000}` derived
//! from the fragment tolerance. A parallel correction integer per residue
//! tracks the first decimal of the rounding residual so that long chains of
//! residue additions do not drift.

use serde::{Deserialize, Serialize};

use crate::config::Parameters;
use crate::masses;
use crate::residue::ResidueTable;

/// The tolerance-times-multiplier value above which a scale is accepted;
/// it guarantees at least five graph positions across a tolerance window
const MULTIPLIER_SWITCH: f64 = 2.5;

/// The integer mass scale and every constant frozen onto it
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MassScale {
    /// The multiplier `S`
    pub multiplier: i32,
    /// Scaled monoisotopic residue masses, canonical order
    pub residue_masses: Vec<i32>,
    /// First-decimal corrections for the scaled residue masses
    pub residue_corrections: Vec<i32>,
    /// Scaled element masses (H, C, N, O, P, S)
    pub element_masses: [i32; 6],
    /// First-decimal corrections for the scaled element masses
    pub element_corrections: [i32; 6],
    /// Scaled mass of water
    pub water: i32,
    /// Scaled mass of ammonia
    pub ammonia: i32,
    /// Scaled mass of CO
    pub co: i32,
    /// Scaled average residue mass
    pub av_residue: i32,
    /// Scaled width of the average/mono transition band
    pub transition: f64,
    /// Length of the graph arrays
    pub graph_length: usize,
}

fn scaled(mass: f64, multiplier: i32) -> i32 {
    (mass * f64::from(multiplier) + 0.5) as i32
}

fn correction(mass: f64, scaled_mass: i32, multiplier: i32) -> i32 {
    let residual = mass * f64::from(multiplier) * 10.0 - f64::from(scaled_mass * 10);
    if residual >= 0.0 {
        (residual + 0.5) as i32
    } else {
        (residual - 0.5) as i32
    }
}

impl MassScale {
    /// Derive the scale from the fragment tolerance and freeze all constants.
    /// The graph covers the precursor mass plus the largest scramble offset,
    /// with 10% headroom.
    pub fn new(
        fragment_err: f64,
        peptide_mw: f64,
        wrong_seq_num: usize,
        residues: &ResidueTable,
    ) -> Self {
        let multiplier = [1, 10, 100, 1000]
            .into_iter()
            .find(|m| f64::from(*m) * fragment_err > MULTIPLIER_SWITCH)
            .unwrap_or(1000);

        let residue_masses: Vec<i32> = residues
            .residues()
            .iter()
            .map(|r| scaled(r.monoisotopic, multiplier))
            .collect();
        let residue_corrections: Vec<i32> = residues
            .residues()
            .iter()
            .zip(&residue_masses)
            .map(|(r, &s)| correction(r.monoisotopic, s, multiplier))
            .collect();

        let mut element_masses = [0_i32; 6];
        let mut element_corrections = [0_i32; 6];
        for (i, &mass) in masses::ELEMENTS.iter().enumerate() {
            element_masses[i] = scaled(mass, multiplier);
            element_corrections[i] = correction(mass, element_masses[i], multiplier);
        }

        let graph_length = (f64::from(multiplier)
            * (peptide_mw + wrong_seq_num as f64 * masses::METHYLENE)
            * 1.1) as usize;

        Self {
            multiplier,
            residue_masses,
            residue_corrections,
            element_masses,
            element_corrections,
            water: scaled(masses::WATER, multiplier),
            ammonia: scaled(masses::AMMONIA, multiplier),
            co: scaled(masses::CO, multiplier),
            av_residue: masses::AV_RESIDUE_MASS as i32 * multiplier,
            transition: masses::AV_MONO_TRANSITION * f64::from(multiplier),
            graph_length,
        }
    }

    /// Scale a mass in Da onto the integer grid
    pub fn scaled(&self, mass: f64) -> i32 {
        scaled(mass, self.multiplier)
    }

    /// Scale a mass in Da keeping the fraction (for tolerance arithmetic)
    pub fn scaled_f(&self, mass: f64) -> f64 {
        mass * f64::from(self.multiplier)
    }

    /// The scaled mass of hydrogen
    pub fn hydrogen(&self) -> i32 {
        self.element_masses[0]
    }

    /// Convert a scaled observed mass (average above the switch mass) to
    /// monoisotopic; `mono_to_av` is on the same scale
    pub fn av_to_mono(&self, mass: f64, mono_to_av: f64) -> f64 {
        if mass <= mono_to_av - self.transition {
            return mass;
        }
        let fraction = if mass >= mono_to_av {
            0.0
        } else {
            (mono_to_av - mass) / self.transition
        };
        mass * ((1.0 - masses::AV_TO_MONO) * fraction + masses::AV_TO_MONO)
    }

    /// Convert a scaled computed monoisotopic mass to the observed
    /// convention; `mono_to_av` is on the same scale
    pub fn mono_to_av(&self, mass: f64, mono_to_av: f64) -> f64 {
        if mass <= mono_to_av - self.transition {
            return mass;
        }
        let fraction = if mass >= mono_to_av {
            0.0
        } else {
            (mono_to_av - mass) / self.transition
        };
        mass * (masses::MONO_TO_AV - (masses::MONO_TO_AV - 1.0) * fraction)
    }

    /// The graph window painted for a projected mass under a tolerance, both
    /// in scaled units: the upper bound truncates, the lower bound rounds
    pub fn window(&self, mass: f64, tolerance: f64) -> (i32, i32) {
        let hi = (mass + tolerance) as i32;
        let lo = (mass - tolerance + 0.5) as i32;
        (lo, hi)
    }
}

/// The mass-typed parameter fields scaled in place onto the integer grid.
/// Kept as floats of scaled magnitude, truncated at the points of use, so
/// tolerance arithmetic matches the graph windows exactly.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ScaledParams {
    pub peptide_mw: f64,
    pub peptide_err: f64,
    pub fragment_err: f64,
    pub qtof_err: f64,
    pub ion_offset: f64,
    pub cys_mw: f64,
    pub tag_n_mass: f64,
    pub tag_c_mass: f64,
    pub peak_width: f64,
    pub modified_n_term: f64,
    pub modified_c_term: f64,
    pub mono_to_av: f64,
}

impl ScaledParams {
    /// Scale every mass-typed parameter by the multiplier
    pub fn new(parameters: &Parameters, scale: &MassScale) -> Self {
        let s = f64::from(scale.multiplier);
        let (tag_n_mass, tag_c_mass) = parameters
            .tag
            .as_ref()
            .map_or((0.0, 0.0), |tag| (tag.n_mass * s, tag.c_mass * s));
        Self {
            peptide_mw: parameters.peptide_mw * s,
            peptide_err: parameters.peptide_err * s,
            fragment_err: parameters.fragment_err * s,
            qtof_err: parameters.qtof_err * s,
            ion_offset: parameters.ion_offset * s,
            cys_mw: parameters.cys_mw * s,
            tag_n_mass,
            tag_c_mass,
            peak_width: parameters.peak_width * s,
            modified_n_term: parameters.modified_n_term * s,
            modified_c_term: parameters.modified_c_term * s,
            mono_to_av: parameters.mono_to_av * s,
        }
    }

    /// The precursor m/z in scaled units for a given scaled hydrogen mass
    pub fn precursor_mz(&self, charge: i32, hydrogen: i32) -> f64 {
        (self.peptide_mw + f64::from(charge) * f64::from(hydrogen)) / f64::from(charge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(tolerance: f64) -> MassScale {
        MassScale::new(tolerance, 1000.0, 0, &ResidueTable::default())
    }

    #[test]
    fn multiplier_follows_tolerance() {
        assert_eq!(scale(5.0).multiplier, 1);
        assert_eq!(scale(0.5).multiplier, 10);
        assert_eq!(scale(0.03).multiplier, 100);
        assert_eq!(scale(0.002).multiplier, 1000);
    }

    #[test]
    fn corrections_recover_the_next_decimal() {
        // For every residue the scaled mass plus correction/10 must match a
        // one-decimal-finer rounding, or long chains of additions drift
        let residues = ResidueTable::default();
        let scale = scale(0.5);
        for (index, residue) in residues.residues().iter().enumerate() {
            let fine = (residue.monoisotopic * f64::from(scale.multiplier) * 10.0 + 0.5) as i32;
            let coarse = scale.residue_masses[index] * 10 + scale.residue_corrections[index];
            assert!(
                (fine - coarse).abs() <= 1,
                "residue {} drifts: fine {fine} vs coarse {coarse}",
                residue.code
            );
        }
    }

    #[test]
    fn graph_length_has_headroom() {
        let scale = MassScale::new(0.5, 1000.0, 0, &ResidueTable::default());
        assert!(scale.graph_length >= 10 * 1000);
        assert!(scale.graph_length <= 12 * 1000);
    }

    #[test]
    fn window_bounds_follow_the_rounding_convention() {
        let scale = scale(0.5); // multiplier 10, tolerance 5 scaled units
        let (lo, hi) = scale.window(1000.0, 5.0);
        assert_eq!((lo, hi), (995, 1005));
    }
}
