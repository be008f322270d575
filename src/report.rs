//! The per-spectrum report: resolved configuration, ranked candidates, and
//! the mass-scramble statistics.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{FragmentationSpec, Parameters, Proteolysis};
use crate::residue::ResidueTable;
use crate::scoring::{ScoredSequence, SequenceStep};
use crate::spectrum::Spectrum;

/// Summary of the off-mass control scores
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NullDistribution {
    /// Mean of the best combined scores of the off-mass runs
    pub mean: f64,
    /// Their standard deviation
    pub sd: f64,
    /// The number of off-mass runs
    pub count: usize,
}

impl NullDistribution {
    /// Summarize the best scores of the off-mass runs; needs at least two
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.len() < 2 {
            return None;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let variance = scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>()
            / (scores.len() - 1) as f64;
        Some(Self {
            mean,
            sd: variance.sqrt(),
            count: scores.len(),
        })
    }
}

/// Everything reported for one spectrum
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Report {
    /// The spectrum source (file path or label)
    pub source: String,
    /// The resolved precursor mass
    pub peptide_mw: f64,
    /// The precursor charge
    pub charge_state: i32,
    /// The fragmentation template used
    pub fragmentation: FragmentationSpec,
    /// The proteolysis assumption
    pub proteolysis: Proteolysis,
    /// The fragment tolerance
    pub fragment_err: f64,
    /// The peptide mass tolerance
    pub peptide_err: f64,
    /// The cysteine residue mass, when modified
    pub cys_mw: f64,
    /// How many candidates the report shows
    pub output_seq_num: usize,
    /// The combined-score floor for the report
    pub output_threshold: f64,
    /// The ranked candidates
    pub candidates: Vec<ScoredSequence>,
    /// The null distribution, when scrambling ran
    pub null: Option<NullDistribution>,
    /// Gaussian confidence of the top candidate against the null
    pub confidence: Option<f64>,
}

impl Report {
    /// Build a report from a finished run
    pub fn new(
        parameters: &Parameters,
        spectrum: &Spectrum,
        candidates: Vec<ScoredSequence>,
        null: Option<NullDistribution>,
        confidence: Option<f64>,
    ) -> Self {
        Self {
            source: spectrum.source.clone(),
            peptide_mw: parameters.peptide_mw,
            charge_state: parameters.charge_state,
            fragmentation: parameters.fragmentation,
            proteolysis: parameters.proteolysis,
            fragment_err: parameters.fragment_err,
            peptide_err: parameters.peptide_err,
            cys_mw: parameters.cys_mw,
            output_seq_num: parameters.output_seq_num,
            output_threshold: parameters.output_threshold,
            candidates,
            null,
            confidence,
        }
    }

    /// A report for a spectrum that yielded nothing to sequence
    pub fn no_candidates(parameters: &Parameters, spectrum: &Spectrum) -> Self {
        Self::new(parameters, spectrum, Vec::new(), None, None)
    }

    /// Render the report against a residue table
    pub fn render(&self, residues: &ResidueTable) -> String {
        use fmt::Write;
        let mut out = String::new();
        let _ = writeln!(out, "file            {}", self.source);
        let _ = writeln!(out, "peptide MW      {:.4}", self.peptide_mw);
        let _ = writeln!(out, "charge          {}", self.charge_state);
        let _ = writeln!(
            out,
            "template        {}",
            match self.fragmentation {
                FragmentationSpec::TripleQuad => "triple quadrupole (tryptic)",
                FragmentationSpec::IonTrap => "ion trap (tryptic)",
                FragmentationSpec::QTof => "Q-TOF",
                FragmentationSpec::Generic => "generic",
            }
        );
        let _ = writeln!(
            out,
            "proteolysis     {}",
            match self.proteolysis {
                Proteolysis::Trypsin => "trypsin",
                Proteolysis::LysC => "Lys-C",
                Proteolysis::GluC => "Glu-C",
                Proteolysis::AspN => "Asp-N",
                Proteolysis::None => "none",
            }
        );
        let _ = writeln!(out, "fragment tol    {:.3}", self.fragment_err);
        let _ = writeln!(out, "peptide tol     {:.3}", self.peptide_err);
        if self.cys_mw != 0.0 {
            let _ = writeln!(out, "cysteine        {:.3}", self.cys_mw);
        }
        if let Some(null) = &self.null {
            let _ = writeln!(
                out,
                "null scores     {:.3} ± {:.3} over {} scrambled masses",
                null.mean, null.sd, null.count
            );
        }
        if let Some(confidence) = self.confidence {
            let _ = writeln!(out, "confidence      {confidence:.3}");
        }
        let _ = writeln!(out);

        if self.candidates.is_empty() {
            let _ = writeln!(out, "no candidate sequences");
            return out;
        }

        let _ = writeln!(
            out,
            "{:>4}  {:<30} {:>8} {:>9} {:>8} {:>8} {:>8}",
            "rank", "sequence", "combined", "intensity", "prob", "quality", "xcorr"
        );
        for candidate in self
            .candidates
            .iter()
            .take(self.output_seq_num)
            .filter(|c| c.combined >= self.output_threshold)
        {
            let _ = writeln!(
                out,
                "{:>4}  {:<30} {:>8.3} {:>9.3} {:>8.3} {:>8.3} {:>8.3}",
                candidate.rank,
                render_sequence(&candidate.steps, residues),
                candidate.combined,
                candidate.intensity_score,
                candidate.probability_score,
                candidate.quality,
                candidate.xcorr,
            );
        }
        out
    }
}

/// Render a step vector: single residues as their one letter code,
/// two-residue gaps as the bracketed lump mass
pub fn render_sequence(steps: &[SequenceStep], residues: &ResidueTable) -> String {
    let mut out = String::new();
    for step in steps {
        match step.residue {
            Some(index) => out.push(residues.get(index).code),
            None => out.push_str(&format!("[{:.1}]", step.mass)),
        }
    }
    out
}

/// The output path for a spectrum file: the input with extension `.lut`,
/// never clobbering an existing file
pub fn output_path(input: &Path) -> Option<PathBuf> {
    let base = input.with_extension("lut");
    if !base.exists() {
        return Some(base);
    }
    for counter in 1..=20 {
        let next = input.with_extension(format!("lut{counter}"));
        if !next.exists() {
            return Some(next);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_distribution_needs_two_scores() {
        assert!(NullDistribution::from_scores(&[1.0]).is_none());
        let null = NullDistribution::from_scores(&[1.0, 3.0]).unwrap();
        assert!((null.mean - 2.0).abs() < f64::EPSILON);
        assert!(null.sd > 0.0);
        assert_eq!(null.count, 2);
    }

    #[test]
    fn sequences_render_with_gap_brackets() {
        let residues = ResidueTable::default();
        let steps = vec![
            SequenceStep {
                mass: 71.03711,
                residue: Some(crate::residue::index::A),
            },
            SequenceStep {
                mass: 185.1,
                residue: None,
            },
            SequenceStep {
                mass: 156.10111,
                residue: Some(crate::residue::index::R),
            },
        ];
        assert_eq!(render_sequence(&steps, &residues), "A[185.1]R");
    }

    #[test]
    fn report_renders_a_no_candidate_line() {
        let parameters = Parameters::default();
        let spectrum = Spectrum::default();
        let report = Report::no_candidates(&parameters, &spectrum);
        let rendered = report.render(&ResidueTable::default());
        assert!(rendered.contains("no candidate sequences"));
    }

    #[test]
    fn output_threshold_filters_candidates() {
        let parameters = Parameters {
            output_threshold: 0.5,
            ..Parameters::default()
        };
        let spectrum = Spectrum::default();
        let weak = ScoredSequence {
            steps: vec![SequenceStep {
                mass: 71.03711,
                residue: Some(crate::residue::index::A),
            }],
            gap_count: 0,
            subsequence_score: 1.0,
            intensity_score: 0.1,
            probability_score: 0.0,
            quality: 1.0,
            xcorr: 0.0,
            combined: 0.3,
            rank: 1,
        };
        let report = Report::new(&parameters, &spectrum, vec![weak], None, None);
        let rendered = report.render(&ResidueTable::default());
        assert!(!rendered.contains("0.300"));
    }
}
