//! The engine: one value owning configuration and mass tables, running the
//! whole pipeline per spectrum.
//!
//! A run is: condition the peaks, refine the precursor (ion traps), then for
//! the true precursor mass and each scrambled mass build the graph, sum the
//! nodes, enumerate candidates, and score them. The scrambled runs only feed
//! the null score distribution behind the confidence estimate.

use log::{debug, info};
use probability::distribution::{Distribution, Gaussian};

use crate::autotag::apply_auto_tag;
use crate::config::{FragmentationSpec, Parameters};
use crate::edman::EdmanData;
use crate::error::{Context, CustomError};
use crate::gaps::GapList;
use crate::graph::SpectrumGraph;
use crate::masses;
use crate::precursor::refine_peptide_mw;
use crate::reader;
use crate::report::{NullDistribution, Report};
use crate::residue::ResidueTable;
use crate::scale::{MassScale, ScaledParams};
use crate::scoring::intensity::score_candidate;
use crate::scoring::prob::probability_score;
use crate::scoring::xcorr::{XcorrScorer, MAX_X_CORR_NUM};
use crate::scoring::{ScoredSequence, SequenceStep};
use crate::spectrum::Spectrum;
use crate::subseq::{enumerate, reinsert_tag, Candidate};
use crate::summed::summed_node_score;
use crate::weights::IonWeights;

/// Beam cap for the off-mass control runs
const SCRAMBLE_TOP_SEQ_NUM: usize = 1000;
/// Completed-sequence cap for the off-mass control runs
const SCRAMBLE_FINAL_SEQ_NUM: usize = 5000;

/// The sequencing engine: configuration plus the tables derived from it
pub struct Engine {
    parameters: Parameters,
    residues: ResidueTable,
    weights: IonWeights,
    edman: Option<EdmanData>,
}

impl Engine {
    /// Build an engine: load the residue table, ion weights, and Edman data
    /// the configuration points to.
    ///
    /// # Errors
    /// Configuration errors terminate the run.
    pub fn new(parameters: Parameters) -> Result<Self, CustomError> {
        parameters.validate()?;
        let residues = match &parameters.residue_file {
            Some(path) => ResidueTable::from_file(path)?,
            None => ResidueTable::default(),
        };
        let weights = match &parameters.details_file {
            Some(path) => IonWeights::from_file(path, parameters.fragmentation)?,
            None => IonWeights::for_template(parameters.fragmentation),
        };
        Ok(Self {
            parameters,
            residues,
            weights,
            edman: None,
        })
    }

    /// The current parameters
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The residue table in use
    pub fn residues(&self) -> &ResidueTable {
        &self.residues
    }

    /// Sequence one spectrum end to end
    ///
    /// # Errors
    /// Warning-level errors terminate this spectrum only; the caller decides
    /// whether to continue with the next one.
    pub fn run(&mut self, mut spectrum: Spectrum) -> Result<Report, CustomError> {
        // Resolve deferred configuration against the input file's shape
        if self.parameters.auto_fragmentation {
            self.parameters.fragmentation = if spectrum.ion_trap_header {
                FragmentationSpec::IonTrap
            } else {
                FragmentationSpec::TripleQuad
            };
            self.weights = IonWeights::for_template(self.parameters.fragmentation);
        }
        if let Some(charge) = spectrum.precursor_charge {
            if self.parameters.peptide_mw == 0.0 {
                self.parameters.charge_state = charge;
            }
        }
        if self.parameters.peptide_mw == 0.0 {
            self.parameters.peptide_mw = reader::neutral_mass(&spectrum).ok_or_else(|| {
                CustomError::error(
                    "No precursor mass",
                    "Neither the configuration nor the spectrum file carries a precursor mass",
                    Context::show(&spectrum.source),
                )
            })?;
        }
        self.parameters.validate()?;

        spectrum.condition(&self.parameters);
        if spectrum.is_empty() {
            return Ok(Report::no_candidates(&self.parameters, &spectrum));
        }

        if self.parameters.fragmentation == FragmentationSpec::IonTrap {
            refine_peptide_mw(&mut self.parameters, &spectrum, &self.residues);
        }

        self.parameters.resolve_max_gap_num();
        self.parameters.resolve_wrong_seq_num();
        self.parameters.setup_sequence_tag(&self.residues)?;

        if let Some(path) = self.parameters.edman_file.clone() {
            // The gap list for Edman parsing tracks the true-mass run
            let scale = MassScale::new(
                self.parameters.fragment_err,
                self.parameters.peptide_mw,
                self.parameters.wrong_seq_num,
                &self.residues,
            );
            let scaled = ScaledParams::new(&self.parameters, &scale);
            let gaps = GapList::new(&self.residues, &scale, &scaled, &self.parameters);
            self.edman = Some(EdmanData::from_file(&path, &self.residues, &gaps)?);
        }

        // The scramble loop mutates these; snapshot and restore around it
        let snapshot = self.parameters.snapshot();
        let true_mass = self.parameters.peptide_mw;
        let true_top = self.parameters.top_seq_num;
        let true_final = self.parameters.final_seq_num;
        let wrong_runs = self.parameters.wrong_seq_num as i32;

        let mut null_combined = Vec::new();
        let mut candidates = Vec::new();
        let mut sign = 1_i32;
        for step in -wrong_runs..=0 {
            let offset = if step == 0 {
                self.parameters.top_seq_num = true_top;
                self.parameters.final_seq_num = true_final;
                0.0
            } else {
                self.parameters.top_seq_num = SCRAMBLE_TOP_SEQ_NUM;
                self.parameters.final_seq_num = SCRAMBLE_FINAL_SEQ_NUM;
                let magnitude = (f64::from(step) / 2.0 - 0.5).trunc();
                let offset = magnitude * f64::from(sign);
                sign = -sign;
                offset
            };
            self.parameters.peptide_mw = true_mass + offset * masses::METHYLENE;

            let outcome = self.run_once(&spectrum);
            match outcome {
                Ok(scored) => {
                    if step == 0 {
                        candidates = scored;
                    } else {
                        let best = scored.first().map_or(0.0, |best| best.combined);
                        null_combined.push(best);
                        debug!("scramble offset {offset:+.0}: best combined {best:.3}");
                    }
                }
                Err(error) if step != 0 && error.is_warning() => {
                    // A failed off-mass run contributes a zero to the null
                    null_combined.push(0.0);
                }
                Err(error) => {
                    self.parameters.restore(&snapshot);
                    return Err(error);
                }
            }
        }
        self.parameters.restore(&snapshot);

        let null = NullDistribution::from_scores(&null_combined);
        let confidence = match (&null, candidates.first()) {
            (Some(null), Some(best)) if null.sd > 0.0 => {
                Some(Gaussian::new(null.mean, null.sd).distribution(best.combined))
            }
            _ => None,
        };

        info!(
            "{}: {} candidates at M = {:.3}",
            spectrum.source,
            candidates.len(),
            self.parameters.peptide_mw
        );
        Ok(Report::new(
            &self.parameters,
            &spectrum,
            candidates,
            null,
            confidence,
        ))
    }

    /// One full pipeline pass at the current (possibly scrambled) precursor
    /// mass
    fn run_once(&self, spectrum: &Spectrum) -> Result<Vec<ScoredSequence>, CustomError> {
        let parameters = &self.parameters;
        let scale = MassScale::new(
            parameters.fragment_err,
            parameters.peptide_mw,
            parameters.wrong_seq_num,
            &self.residues,
        );
        let mut scaled = ScaledParams::new(parameters, &scale);
        let gaps = GapList::new(&self.residues, &scale, &scaled, parameters);

        let mut graph = SpectrumGraph::build(
            spectrum,
            parameters,
            &mut scaled,
            &scale,
            &gaps,
            &self.residues,
            &self.weights,
            self.edman.as_ref(),
        )?;

        let one_edge_nodes = summed_node_score(
            &mut graph,
            parameters,
            &scaled,
            &scale,
            &gaps,
            self.weights.total(),
        );

        if parameters.auto_tag
            && parameters.charge_state > 1
            && parameters.fragmentation.is_tryptic()
        {
            let edges =
                apply_auto_tag(&mut graph, spectrum, parameters, &scaled, &scale, &gaps);
            debug!("auto tag: {edges} ladder edges above the precursor");
        }

        let mut candidates = enumerate(
            &mut graph,
            parameters,
            &scaled,
            &scale,
            &gaps,
            &self.residues,
            &one_edge_nodes,
        );

        // Undo the tag excision before anything downstream sees the masses
        if let Some(tag) = &parameters.tag {
            let tag_masses: Vec<i32> = tag
                .sequence
                .iter()
                .filter_map(|&code| gaps.single_for_code(&self.residues, code))
                .collect();
            for candidate in &mut candidates {
                reinsert_tag(candidate, &tag_masses, &scaled);
            }
        }

        Ok(self.score_candidates(candidates, spectrum, &gaps, &scale))
    }

    /// Convert a scaled candidate into Da-domain steps
    fn candidate_steps(&self, candidate: &Candidate, gaps: &GapList, scale: &MassScale) -> Vec<SequenceStep> {
        candidate
            .residues
            .iter()
            .map(|&mass| {
                match gaps
                    .singles()
                    .iter()
                    .position(|&g| g != 0 && g == mass)
                {
                    Some(residue) => SequenceStep {
                        mass: if residue == crate::residue::index::C
                            && self.parameters.cys_mw != 0.0
                        {
                            self.parameters.cys_mw
                        } else {
                            self.residues.get(residue).monoisotopic
                        },
                        residue: Some(residue),
                    },
                    None => SequenceStep {
                        mass: f64::from(mass) / f64::from(scale.multiplier),
                        residue: None,
                    },
                }
            })
            .collect()
    }

    /// Intensity, probability, and cross-correlation scoring plus the final
    /// combined ranking
    fn score_candidates(
        &self,
        candidates: Vec<Candidate>,
        spectrum: &Spectrum,
        gaps: &GapList,
        scale: &MassScale,
    ) -> Vec<ScoredSequence> {
        let parameters = &self.parameters;
        let mut scored: Vec<ScoredSequence> = candidates
            .iter()
            .map(|candidate| {
                let steps = self.candidate_steps(candidate, gaps, scale);
                let outcome = score_candidate(&steps, spectrum, parameters);
                let mut ion_found = outcome.ion_found;
                let probability =
                    probability_score(&steps, spectrum, parameters, &mut ion_found);
                ScoredSequence {
                    steps,
                    gap_count: candidate.gap_count,
                    subsequence_score: candidate.score,
                    intensity_score: outcome.score,
                    probability_score: probability,
                    quality: outcome.quality,
                    xcorr: 0.0,
                    combined: 0.0,
                    rank: 0,
                }
            })
            .collect();

        // Cross-correlate the top intensity scorers only
        scored.sort_by(|a, b| b.intensity_score.total_cmp(&a.intensity_score));
        if !scored.is_empty() {
            let scorer = XcorrScorer::new(spectrum, parameters);
            for sequence in scored.iter_mut().take(MAX_X_CORR_NUM) {
                sequence.xcorr = scorer.score(&sequence.steps, parameters);
            }
        }

        for sequence in &mut scored {
            sequence.combined = ScoredSequence::combine(
                sequence.intensity_score,
                sequence.xcorr,
                sequence.quality,
            );
        }
        scored.sort_by(|a, b| b.combined.total_cmp(&a.combined));
        for (position, sequence) in scored.iter_mut().enumerate() {
            sequence.rank = position + 1;
        }
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::Peak;

    fn spectrum_of(peaks: &[(f64, f64)]) -> Spectrum {
        let mut spectrum = Spectrum {
            source: "test".to_string(),
            ..Spectrum::default()
        };
        spectrum.extend(peaks.iter().map(|&(mz, intensity)| Peak::new(mz, intensity)));
        spectrum
    }

    fn ar_parameters() -> Parameters {
        Parameters {
            peptide_mw: 245.149,
            charge_state: 1,
            fragment_err: 0.5,
            peptide_err: 0.75,
            ion_threshold: 0.0,
            max_gap_num: 1,
            ..Parameters::default()
        }
    }

    #[test]
    fn sequences_a_synthetic_dipeptide() {
        // Dipeptide AR at +1: b1 at 72.04, y1 at 175.12
        let mut engine = Engine::new(ar_parameters()).unwrap();
        let spectrum = spectrum_of(&[(72.044, 80.0), (175.119, 100.0)]);
        let report = engine.run(spectrum).unwrap();
        let top = report.candidates.first().expect("a candidate");
        let rendered = crate::report::render_sequence(&top.steps, engine.residues());
        assert_eq!(rendered, "AR");
        assert!(
            top.intensity_score >= 0.8,
            "intensity score {}",
            top.intensity_score
        );
    }

    #[test]
    fn identical_runs_are_identical() {
        // Same input and configuration must give byte-identical results
        let run = || {
            let mut engine = Engine::new(ar_parameters()).unwrap();
            let spectrum = spectrum_of(&[(72.044, 80.0), (175.119, 100.0)]);
            engine.run(spectrum).unwrap()
        };
        let first = run();
        let second = run();
        assert_eq!(first.candidates, second.candidates);
    }

    #[test]
    fn degenerate_spectrum_reports_no_candidates() {
        let mut engine = Engine::new(ar_parameters()).unwrap();
        let report = engine.run(spectrum_of(&[])).unwrap();
        assert!(report.candidates.is_empty());
    }

    #[test]
    fn snapshot_is_restored_after_scrambling() {
        let parameters = Parameters {
            wrong_seq_num: 2,
            ..ar_parameters()
        };
        let mut engine = Engine::new(parameters).unwrap();
        let mass_before = engine.parameters().peptide_mw;
        let top_before = engine.parameters().top_seq_num;
        let spectrum = spectrum_of(&[(72.044, 80.0), (175.119, 100.0)]);
        engine.run(spectrum).unwrap();
        assert_eq!(engine.parameters().peptide_mw, mass_before);
        assert_eq!(engine.parameters().top_seq_num, top_before);
    }
}
