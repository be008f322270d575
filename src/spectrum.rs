//! Spectrum related code.
//!
//! Peaks are owned by a contiguous vector sorted ascending by m/z; the sort
//! is an invariant maintained by the readers and every projection stage
//! relies on it for binary search.

use std::cmp::Ordering;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::config::Parameters;
use crate::masses;
use crate::system::MassOverCharge;

/// Width of the m/z window with a cap on the number of retained peaks
const SPECTRAL_WINDOW_WIDTH: f64 = 120.0;

/// A single centroided peak
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Peak {
    /// The m/z value of this peak
    pub mz: MassOverCharge,
    /// The raw intensity
    pub intensity: OrderedFloat<f64>,
    /// The intensity normalized to 0..=100 over the conditioned spectrum
    pub normalized: f64,
}

impl Peak {
    /// Make a peak from a bare m/z value in Da per charge
    pub fn new(m_over_z: f64, intensity: f64) -> Self {
        use crate::system::mass_over_charge::mz;
        Self {
            mz: MassOverCharge::new::<mz>(m_over_z),
            intensity: intensity.into(),
            normalized: 0.0,
        }
    }
}

impl PartialOrd for Peak {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Peak {
    /// Use `f64::total_cmp` on `self.mz`
    fn cmp(&self, other: &Self) -> Ordering {
        self.mz.value.total_cmp(&other.mz.value)
    }
}

impl PartialEq for Peak {
    fn eq(&self, other: &Self) -> bool {
        self.mz.value.total_cmp(&other.mz.value) == Ordering::Equal
            && self.intensity.total_cmp(&other.intensity) == Ordering::Equal
    }
}

impl Eq for Peak {}

/// A centroided fragment spectrum of a single peptide
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Spectrum {
    /// Where this spectrum came from, used in the report header
    pub source: String,
    /// The precursor m/z as read from the file header, if present
    pub precursor_mz: Option<f64>,
    /// The precursor charge as read from the file header, if present
    pub precursor_charge: Option<i32>,
    /// Set when the file shape marked this as ion-trap style data
    pub ion_trap_header: bool,
    /// The peaks, sorted ascending by m/z
    pub(crate) peaks: Vec<Peak>,
}

impl Extend<Peak> for Spectrum {
    fn extend<T: IntoIterator<Item = Peak>>(&mut self, iter: T) {
        self.peaks.extend(iter);
        self.peaks.sort_unstable();
    }
}

impl IntoIterator for Spectrum {
    type Item = Peak;
    type IntoIter = std::vec::IntoIter<Peak>;
    fn into_iter(self) -> Self::IntoIter {
        self.peaks.into_iter()
    }
}

impl std::ops::Index<usize> for Spectrum {
    type Output = Peak;
    fn index(&self, index: usize) -> &Self::Output {
        &self.peaks[index]
    }
}

impl Spectrum {
    /// The peaks, ascending by m/z
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// The number of peaks
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    /// Tests if there are no peaks
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Add a single peak, keeping the m/z order
    pub fn add_peak(&mut self, peak: Peak) {
        let index = self.peaks.binary_search(&peak).map_or_else(|i| i, |i| i);
        self.peaks.insert(index, peak);
    }

    /// Return the slice of peaks with m/z in `[low, high]`
    pub fn range(&self, low: f64, high: f64) -> &[Peak] {
        &self.peaks[self.range_indices(low, high)]
    }

    /// The index range of peaks with m/z in `[low, high]`
    pub fn range_indices(&self, low: f64, high: f64) -> std::ops::Range<usize> {
        let left = self
            .peaks
            .partition_point(|p| p.mz.value.total_cmp(&low) == Ordering::Less);
        let right = self
            .peaks
            .partition_point(|p| p.mz.value.total_cmp(&high) != Ordering::Greater);
        left..right.max(left)
    }

    /// Tests if any peak lies within `tolerance` of `mz`
    pub fn contains(&self, mz: f64, tolerance: f64) -> bool {
        !self.range(mz - tolerance, mz + tolerance).is_empty()
    }

    /// The summed raw intensity
    pub fn total_intensity(&self) -> f64 {
        self.peaks.iter().map(|p| *p.intensity).sum()
    }

    /// Condition the spectrum for sequencing: drop peaks below the intensity
    /// threshold (half threshold above the precursor m/z), cap the number of
    /// peaks per 120 Da window and per residue of precursor mass keeping the
    /// most intense, and normalize intensities to 0..=100.
    pub fn condition(&mut self, parameters: &Parameters) {
        if self.peaks.is_empty() {
            return;
        }
        let mean = self.total_intensity() / self.peaks.len() as f64;
        let threshold = parameters.ion_threshold * mean;
        let precursor = self.precursor_mz.unwrap_or(f64::MAX);
        self.peaks.retain(|p| {
            let cutoff = if p.mz.value > precursor {
                threshold * 0.5
            } else {
                threshold
            };
            *p.intensity >= cutoff
        });

        // Per-window cap, windows anchored at the lowest retained m/z
        if parameters.ions_per_window > 0.0 && !self.peaks.is_empty() {
            let per_window = parameters.ions_per_window as usize;
            let start = self.peaks[0].mz.value;
            let mut keep = vec![true; self.peaks.len()];
            for (_, window) in &self
                .peaks
                .iter()
                .enumerate()
                .group_by(|(_, p)| ((p.mz.value - start) / SPECTRAL_WINDOW_WIDTH) as usize)
            {
                let indices: Vec<usize> = window.map(|(i, _)| i).collect();
                if indices.len() > per_window {
                    let mut by_intensity = indices.clone();
                    by_intensity
                        .sort_unstable_by(|&a, &b| self.peaks[b].intensity.cmp(&self.peaks[a].intensity));
                    for &drop in &by_intensity[per_window..] {
                        keep[drop] = false;
                    }
                }
            }
            let mut position = 0;
            self.peaks.retain(|_| {
                let kept = keep[position];
                position += 1;
                kept
            });
        }

        // Total cap scaled to the expected peptide length
        if parameters.ions_per_residue > 0.0 && parameters.peptide_mw > 0.0 {
            let residues = (parameters.peptide_mw / masses::AV_RESIDUE_MASS + 0.5) as usize;
            let cap = (parameters.ions_per_residue * residues as f64) as usize;
            if cap > 0 && self.peaks.len() > cap {
                if let Some(cutoff) = self
                    .peaks
                    .iter()
                    .map(|p| p.intensity)
                    .sorted()
                    .rev()
                    .nth(cap - 1)
                {
                    self.peaks.retain(|p| *p.intensity >= *cutoff);
                }
            }
        }

        let max = self
            .peaks
            .iter()
            .map(|p| *p.intensity)
            .fold(0.0_f64, f64::max);
        if max > 0.0 {
            for peak in &mut self.peaks {
                peak.normalized = *peak.intensity / max * 100.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(mz: f64, intensity: f64) -> Peak {
        Peak::new(mz, intensity)
    }

    fn spectrum(peaks: &[(f64, f64)]) -> Spectrum {
        let mut spectrum = Spectrum::default();
        spectrum.extend(peaks.iter().map(|&(mz, i)| peak(mz, i)));
        spectrum
    }

    #[test]
    fn peaks_stay_sorted() {
        let mut s = spectrum(&[(500.0, 10.0), (200.0, 5.0), (300.0, 2.0)]);
        s.add_peak(peak(250.0, 1.0));
        let mzs: Vec<f64> = s.peaks().iter().map(|p| p.mz.value).collect();
        assert_eq!(mzs, vec![200.0, 250.0, 300.0, 500.0]);
    }

    #[test]
    fn range_is_inclusive() {
        let s = spectrum(&[(100.0, 1.0), (200.0, 1.0), (300.0, 1.0)]);
        assert_eq!(s.range(100.0, 200.0).len(), 2);
        assert_eq!(s.range(150.0, 160.0).len(), 0);
        assert!(s.contains(200.3, 0.5));
        assert!(!s.contains(201.0, 0.5));
    }

    #[test]
    fn conditioning_drops_noise_and_normalizes() {
        let mut s = spectrum(&[(100.0, 100.0), (200.0, 50.0), (300.0, 0.1)]);
        let parameters = Parameters {
            ion_threshold: 0.1,
            ions_per_window: 0.0,
            ions_per_residue: 0.0,
            ..Parameters::default()
        };
        s.condition(&parameters);
        assert_eq!(s.len(), 2);
        assert!((s[0].normalized - 100.0).abs() < f64::EPSILON);
        assert!((s[1].normalized - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn window_cap_keeps_the_most_intense() {
        let mut s = spectrum(&[
            (100.0, 1.0),
            (101.0, 5.0),
            (102.0, 3.0),
            (500.0, 2.0),
        ]);
        let parameters = Parameters {
            ion_threshold: 0.0,
            ions_per_window: 2.0,
            ions_per_residue: 0.0,
            ..Parameters::default()
        };
        s.condition(&parameters);
        assert_eq!(s.len(), 3);
        assert!(s.contains(101.0, 0.1));
        assert!(s.contains(102.0, 0.1));
        assert!(!s.contains(100.0, 0.1));
    }
}
