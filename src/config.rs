//! The configuration surface of the engine: everything read from the
//! parameter file, plus the sequence-tag setup and the snapshot used by the
//! mass-scramble control.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Context, CustomError};
use crate::masses;
use crate::residue::ResidueTable;

/// The fragmentation template, selecting which ion types are considered and
/// under what rules peaks are projected onto the b-ion mass axis
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum FragmentationSpec {
    /// Tryptic peptides fragmented in a triple quadrupole (`T`)
    TripleQuad,
    /// Tryptic peptides fragmented in an ion trap (`L`)
    IonTrap,
    /// Q-TOF data: triple-quad rules with a tighter final tolerance (`Q`)
    QTof,
    /// No instrument specific rules (`G`)
    Generic,
}

impl FragmentationSpec {
    /// Whether the tryptic graph rules apply (proline pairs, terminal boosts)
    pub const fn is_tryptic(self) -> bool {
        matches!(self, Self::TripleQuad | Self::QTof | Self::IonTrap)
    }
}

/// The proteolytic enzyme that produced the peptide
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Proteolysis {
    /// Trypsin: C-terminal Lys or Arg (`T`)
    #[default]
    Trypsin,
    /// Lys-C: C-terminal Lys (`K`)
    LysC,
    /// Glu-C (V8): C-terminal Glu or Asp (`E`)
    GluC,
    /// Asp-N: N-terminal Asp (`D`)
    AspN,
    /// Unknown or none (`N`)
    None,
}

/// Whether the input peaks are centroided
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum PeakShape {
    #[default]
    Centroid,
    Profile,
    /// Decide from the data
    Auto,
}

/// An optional user supplied sequence tag: a short stretch of known sequence
/// bracketed by the masses of its flanking y ions
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct SequenceTag {
    /// The unsequenced N-terminal mass (Da), derived from the high y ion
    pub n_mass: f64,
    /// The unsequenced C-terminal mass (Da), derived from the low y ion
    pub c_mass: f64,
    /// The tag residues in N→C order
    pub sequence: Vec<char>,
}

/// All engine parameters. Mass-typed fields are in Da; the scaled integer
/// rendition used by the graph stages lives in [`crate::scale::ScaledParams`].
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Parameters {
    /// The peptide (neutral precursor) mass in Da
    pub peptide_mw: f64,
    /// The peptide mass tolerance in Da
    pub peptide_err: f64,
    /// The precursor charge state
    pub charge_state: i32,
    /// The fragment ion mass tolerance in Da
    pub fragment_err: f64,
    /// The final fragment tolerance used in scoring Q-TOF data (0 = unused)
    pub qtof_err: f64,
    /// A constant m/z offset added to every read peak
    pub ion_offset: f64,
    /// The fragmentation template
    pub fragmentation: FragmentationSpec,
    /// Set when the template should be decided from the input file shape
    pub auto_fragmentation: bool,
    /// The proteolytic enzyme
    pub proteolysis: Proteolysis,
    /// Centroid or profile input
    pub peak_shape: PeakShape,
    /// Input was deconvolved to singly charged fragments upstream
    pub deconvolved: bool,
    /// The mass above which observed masses are taken as average rather than
    /// monoisotopic; the transition is linear over the 400 Da below it
    pub mono_to_av: f64,
    /// Peak width at 10% height (0 = auto)
    pub peak_width: f64,
    /// Fraction of the mean intensity below which peaks are dropped
    pub ion_threshold: f64,
    /// Maximum retained peaks per 120 Da window
    pub ions_per_window: f64,
    /// Maximum retained peaks per average residue of precursor mass
    pub ions_per_residue: f64,
    /// Run the automatic sequence-tag finder
    pub auto_tag: bool,
    /// Maximum number of extensions kept per partial sequence
    pub max_ext_num: usize,
    /// Maximum number of two-residue gaps per sequence (−1 = derive from mass)
    pub max_gap_num: i32,
    /// Relative score cutoff for extensions (fraction of the best)
    pub ext_thresh: f64,
    /// The beam width
    pub top_seq_num: usize,
    /// Capacity of the completed-sequence store
    pub final_seq_num: usize,
    /// Number of candidates written to the report
    pub output_seq_num: usize,
    /// Combined-score cutoff for the report
    pub output_threshold: f64,
    /// Number of off-mass control runs (rounded up to even)
    pub wrong_seq_num: usize,
    /// Residues known to be present
    pub present_residues: Vec<char>,
    /// Residues known to be absent
    pub absent_residues: Vec<char>,
    /// Mass of the N-terminal group (H for a free N-terminus)
    pub modified_n_term: f64,
    /// Mass of the C-terminal group (OH for a free acid)
    pub modified_c_term: f64,
    /// Cysteine residue mass including any alkyl modification (0 = table value)
    pub cys_mw: f64,
    /// Low y ion bracketing the sequence tag (0 = no tag)
    pub tag_low_y: f64,
    /// The tag sequence as entered, low mass to high mass (C→N)
    pub tag_entry: String,
    /// High y ion bracketing the sequence tag (0 = no tag)
    pub tag_high_y: f64,
    /// The resolved sequence tag, if any
    pub tag: Option<SequenceTag>,
    /// Optional Edman sequencing data file
    pub edman_file: Option<PathBuf>,
    /// Optional residue table file
    pub residue_file: Option<PathBuf>,
    /// Optional ion-weight details file
    pub details_file: Option<PathBuf>,
    /// Scan range lower bound of the instrument (Da)
    pub scan_mass_low: f64,
    /// Scan range upper bound of the instrument (Da)
    pub scan_mass_high: f64,
    /// Intensity-score component weights
    pub score_weights: ScoreWeights,
    /// The configurable attenuation constants of the intensity scorer
    pub attenuation: Attenuation,
}

/// Weights for the four components of the intensity score
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Presence of both b and y ions
    pub attenuation: f64,
    /// Fraction of the ion current accounted for
    pub intensity: f64,
    /// Peaks per residue against an average peptide
    pub peaks: f64,
    /// Number of ions accounted for
    pub number: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            attenuation: 0.0,
            intensity: 1.0,
            peaks: 0.0,
            number: 0.0,
        }
    }
}

impl ScoreWeights {
    /// The sum of all component weights
    pub fn total(&self) -> f64 {
        self.attenuation + self.intensity + self.peaks + self.number
    }
}

/// Runtime-configurable attenuation constants applied to matched ion signal
/// in the intensity scorer; all default to 1 (no attenuation)
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Attenuation {
    pub neutral_loss: f64,
    pub internal_fragment: f64,
    pub high_mass_b_ion: f64,
    pub high_mass_a_ion: f64,
    pub high_charge_y_ion: f64,
    pub ox_met: f64,
    pub phe: f64,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            neutral_loss: 1.0,
            internal_fragment: 1.0,
            high_mass_b_ion: 1.0,
            high_mass_a_ion: 1.0,
            high_charge_y_ion: 1.0,
            ox_met: 1.0,
            phe: 1.0,
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            peptide_mw: 0.0,
            peptide_err: 0.75,
            charge_state: 1,
            fragment_err: 0.5,
            qtof_err: 0.0,
            ion_offset: 0.0,
            fragmentation: FragmentationSpec::TripleQuad,
            auto_fragmentation: false,
            proteolysis: Proteolysis::Trypsin,
            peak_shape: PeakShape::Centroid,
            deconvolved: false,
            mono_to_av: 1800.0,
            peak_width: 0.0,
            ion_threshold: 0.1,
            ions_per_window: 12.0,
            ions_per_residue: 7.0,
            auto_tag: false,
            max_ext_num: 7,
            max_gap_num: -1,
            ext_thresh: 0.1,
            top_seq_num: 2000,
            final_seq_num: 20000,
            output_seq_num: 10,
            output_threshold: 0.0,
            wrong_seq_num: 0,
            present_residues: Vec::new(),
            absent_residues: Vec::new(),
            modified_n_term: masses::HYDROGEN,
            modified_c_term: masses::HYDROXYL,
            cys_mw: 0.0,
            tag_low_y: 0.0,
            tag_entry: String::new(),
            tag_high_y: 0.0,
            tag: None,
            edman_file: None,
            residue_file: None,
            details_file: None,
            scan_mass_low: 0.0,
            scan_mass_high: 4000.0,
            score_weights: ScoreWeights::default(),
            attenuation: Attenuation::default(),
        }
    }
}

fn parse_field<T: std::str::FromStr>(
    value: &str,
    key: &str,
    line_number: usize,
    line: &str,
) -> Result<T, CustomError> {
    value.trim().parse().map_err(|_| {
        CustomError::error(
            "Invalid parameter value",
            format!("The value for '{key}' could not be parsed"),
            Context::full_line(line_number, line),
        )
    })
}

fn parse_residue_set(value: &str) -> Vec<char> {
    if value.trim() == "*" {
        Vec::new()
    } else {
        value
            .trim()
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }
}

impl Parameters {
    /// Read parameters from a text file of `key = value` lines. `#` starts a
    /// comment; unknown keys are configuration errors.
    ///
    /// # Errors
    /// On unreadable files, unparseable values, unknown keys, or values that
    /// fail [`Self::validate`].
    pub fn from_file(path: &Path) -> Result<Self, CustomError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            CustomError::error(
                "Cannot open parameter file",
                err,
                Context::show(path.display()),
            )
        })?;
        let mut parameters = Self::default();
        for (line_index, raw_line) in content.lines().enumerate() {
            let line_number = line_index + 1;
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                CustomError::error(
                    "Invalid parameter line",
                    "A parameter line has the shape 'key = value'",
                    Context::full_line(line_number, raw_line),
                )
            })?;
            let key = key.trim();
            let value = value.trim();
            parameters.apply(key, value, line_number, raw_line)?;
        }
        parameters.validate()?;
        Ok(parameters)
    }

    fn apply(
        &mut self,
        key: &str,
        value: &str,
        line_number: usize,
        line: &str,
    ) -> Result<(), CustomError> {
        match key {
            "peptideMW" => self.peptide_mw = parse_field(value, key, line_number, line)?,
            "peptideErr" => self.peptide_err = parse_field(value, key, line_number, line)?,
            "chargeState" => self.charge_state = parse_field(value, key, line_number, line)?,
            "fragmentErr" => self.fragment_err = parse_field(value, key, line_number, line)?,
            "qtofErr" => self.qtof_err = parse_field(value, key, line_number, line)?,
            "ionOffset" => self.ion_offset = parse_field(value, key, line_number, line)?,
            "fragmentPattern" => match value {
                "T" => self.fragmentation = FragmentationSpec::TripleQuad,
                "L" => self.fragmentation = FragmentationSpec::IonTrap,
                "Q" => self.fragmentation = FragmentationSpec::QTof,
                "G" => self.fragmentation = FragmentationSpec::Generic,
                "D" => {
                    self.fragmentation = FragmentationSpec::TripleQuad;
                    self.auto_fragmentation = true;
                }
                _ => {
                    return Err(CustomError::error(
                        "Unknown fragmentation template",
                        "Use T (triple quad), L (ion trap), Q (Q-TOF), G (generic), or D (auto)",
                        Context::full_line(line_number, line),
                    ))
                }
            },
            "proteolysis" => match value {
                "T" => self.proteolysis = Proteolysis::Trypsin,
                "K" => self.proteolysis = Proteolysis::LysC,
                "E" => self.proteolysis = Proteolysis::GluC,
                "D" => self.proteolysis = Proteolysis::AspN,
                "N" => self.proteolysis = Proteolysis::None,
                _ => {
                    return Err(CustomError::error(
                        "Unknown proteolysis",
                        "Use T (trypsin), K (Lys-C), E (Glu-C), D (Asp-N), or N (none)",
                        Context::full_line(line_number, line),
                    ))
                }
            },
            "centroidOrProfile" => match value {
                "C" => self.peak_shape = PeakShape::Centroid,
                "P" => self.peak_shape = PeakShape::Profile,
                "D" => self.peak_shape = PeakShape::Auto,
                _ => {
                    return Err(CustomError::error(
                        "Unknown peak shape",
                        "Use C (centroid), P (profile), or D (auto)",
                        Context::full_line(line_number, line),
                    ))
                }
            },
            "maxent3" => self.deconvolved = value == "Y" || value == "1",
            "monoToAv" => self.mono_to_av = parse_field(value, key, line_number, line)?,
            "peakWidth" => self.peak_width = parse_field(value, key, line_number, line)?,
            "ionThreshold" => self.ion_threshold = parse_field(value, key, line_number, line)?,
            "ionsPerWindow" => self.ions_per_window = parse_field(value, key, line_number, line)?,
            "ionsPerResidue" => {
                self.ions_per_residue = parse_field(value, key, line_number, line)?;
            }
            "autoTag" => self.auto_tag = value == "Y" || value == "1",
            "maxExtNum" => self.max_ext_num = parse_field(value, key, line_number, line)?,
            "maxGapNum" => self.max_gap_num = parse_field(value, key, line_number, line)?,
            "extThresh" => self.ext_thresh = parse_field(value, key, line_number, line)?,
            "topSeqNum" => self.top_seq_num = parse_field(value, key, line_number, line)?,
            "finalSeqNum" => self.final_seq_num = parse_field(value, key, line_number, line)?,
            "outputSeqNum" => self.output_seq_num = parse_field(value, key, line_number, line)?,
            "outputThreshold" => {
                self.output_threshold = parse_field(value, key, line_number, line)?;
            }
            "wrongSeqNum" => self.wrong_seq_num = parse_field(value, key, line_number, line)?,
            "aaPresent" => self.present_residues = parse_residue_set(value),
            "aaAbsent" => self.absent_residues = parse_residue_set(value),
            "modifiedNTerm" => self.modified_n_term = parse_field(value, key, line_number, line)?,
            "modifiedCTerm" => self.modified_c_term = parse_field(value, key, line_number, line)?,
            "cysMW" => self.cys_mw = parse_field(value, key, line_number, line)?,
            "tagLowY" => self.tag_low_y = parse_field(value, key, line_number, line)?,
            "tagSequence" => self.tag_entry = value.trim_matches('*').to_string(),
            "tagHighY" => self.tag_high_y = parse_field(value, key, line_number, line)?,
            "edmanFile" => self.edman_file = Some(PathBuf::from(value)),
            "residueFile" => self.residue_file = Some(PathBuf::from(value)),
            "detailsFile" => self.details_file = Some(PathBuf::from(value)),
            "scanMassLow" => self.scan_mass_low = parse_field(value, key, line_number, line)?,
            "scanMassHigh" => self.scan_mass_high = parse_field(value, key, line_number, line)?,
            "attenuationWeight" => {
                self.score_weights.attenuation = parse_field(value, key, line_number, line)?;
            }
            "intensityWeight" => {
                self.score_weights.intensity = parse_field(value, key, line_number, line)?;
            }
            "peaksWeight" => {
                self.score_weights.peaks = parse_field(value, key, line_number, line)?;
            }
            "numberWeight" => {
                self.score_weights.number = parse_field(value, key, line_number, line)?;
            }
            "neutralLossMultiplier" => {
                self.attenuation.neutral_loss = parse_field(value, key, line_number, line)?;
            }
            "internalFragMultiplier" => {
                self.attenuation.internal_fragment = parse_field(value, key, line_number, line)?;
            }
            "highMassBIonMultiplier" => {
                self.attenuation.high_mass_b_ion = parse_field(value, key, line_number, line)?;
            }
            "highMassAIonMultiplier" => {
                self.attenuation.high_mass_a_ion = parse_field(value, key, line_number, line)?;
            }
            "highChargeYIonMultiplier" => {
                self.attenuation.high_charge_y_ion = parse_field(value, key, line_number, line)?;
            }
            "oxMetMultiplier" => {
                self.attenuation.ox_met = parse_field(value, key, line_number, line)?;
            }
            "pheMultiplier" => {
                self.attenuation.phe = parse_field(value, key, line_number, line)?;
            }
            _ => {
                return Err(CustomError::error(
                    "Unknown parameter",
                    format!("The key '{key}' is not a recognised parameter"),
                    Context::full_line(line_number, line),
                ))
            }
        }
        Ok(())
    }

    /// Check the parameters for out-of-range values
    ///
    /// # Errors
    /// A configuration error terminating the run
    pub fn validate(&self) -> Result<(), CustomError> {
        if !(1..=9).contains(&self.charge_state) {
            return Err(CustomError::error(
                "Invalid charge state",
                "The precursor charge state must be in 1..=9",
                Context::none(),
            ));
        }
        if self.fragment_err <= 0.0 {
            return Err(CustomError::error(
                "Invalid fragment tolerance",
                "The fragment tolerance must be positive",
                Context::none(),
            ));
        }
        if self.peptide_err <= 0.0 {
            return Err(CustomError::error(
                "Invalid peptide tolerance",
                "The peptide mass tolerance must be positive",
                Context::none(),
            ));
        }
        if !(0.0..=1.0).contains(&self.ext_thresh) {
            return Err(CustomError::error(
                "Invalid extension threshold",
                "extThresh is a fraction of the best extension score, in 0..=1",
                Context::none(),
            ));
        }
        if self.top_seq_num == 0 || self.final_seq_num == 0 {
            return Err(CustomError::error(
                "Invalid sequence caps",
                "topSeqNum and finalSeqNum must be at least 1",
                Context::none(),
            ));
        }
        let attenuations = [
            self.attenuation.neutral_loss,
            self.attenuation.internal_fragment,
            self.attenuation.high_mass_b_ion,
            self.attenuation.high_mass_a_ion,
            self.attenuation.high_charge_y_ion,
            self.attenuation.ox_met,
            self.attenuation.phe,
        ];
        if attenuations.iter().any(|a| !(0.0..=1.0).contains(a)) {
            return Err(CustomError::error(
                "Invalid attenuation multiplier",
                "All attenuation multipliers are fractions in 0..=1",
                Context::none(),
            ));
        }
        Ok(())
    }

    /// Derive `maxGapNum` from the precursor mass when it was left at −1
    pub fn resolve_max_gap_num(&mut self) {
        if self.max_gap_num == -1 {
            self.max_gap_num = if self.peptide_mw < 1400.0 {
                1
            } else if self.peptide_mw < 2000.0 {
                2
            } else {
                3
            };
        }
    }

    /// Round `wrongSeqNum` up to an even count so the off-mass offsets pair up
    pub fn resolve_wrong_seq_num(&mut self) {
        if self.wrong_seq_num % 2 == 1 {
            self.wrong_seq_num += 1;
        }
    }

    /// Convert the tag entry (`low-y`, sequence low→high, `high-y`) into the
    /// internal [`SequenceTag`]: terminal unsequenced masses plus the tag in
    /// N→C order. Must run after the precursor mass is final.
    ///
    /// # Errors
    /// Logic inconsistencies: tag masses out of range, unknown residues, or a
    /// tag that does not add up to the peptide mass.
    pub fn setup_sequence_tag(&mut self, residues: &ResidueTable) -> Result<(), CustomError> {
        self.tag = None;
        if self.tag_entry.is_empty() || self.tag_low_y == 0.0 || self.tag_high_y == 0.0 {
            return Ok(());
        }
        if self.tag_high_y > self.peptide_mw || self.tag_low_y > self.peptide_mw {
            return Err(CustomError::warning(
                "Invalid sequence tag",
                "A tag y ion mass exceeds the peptide mass",
                Context::show(&self.tag_entry),
            ));
        }
        if self.tag_high_y < 0.0 || self.tag_low_y < 0.0 {
            return Err(CustomError::warning(
                "Invalid sequence tag",
                "A tag y ion mass is negative",
                Context::show(&self.tag_entry),
            ));
        }
        let c_mass = self.tag_low_y - 2.0 * masses::HYDROGEN;
        let n_mass = self.peptide_mw - (self.tag_high_y - 2.0 * masses::HYDROGEN);
        // The tag is entered from low to high mass, i.e. C→N; flip it.
        let sequence: Vec<char> = self
            .tag_entry
            .chars()
            .rev()
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let mut tag_mass = c_mass + n_mass;
        for &code in &sequence {
            let residue_index = residues.index_of(code).ok_or_else(|| {
                CustomError::warning(
                    "Invalid sequence tag",
                    format!("The tag contains the unknown residue '{code}'"),
                    Context::show(&self.tag_entry),
                )
            })?;
            tag_mass += if code == 'C' && self.cys_mw != 0.0 {
                self.cys_mw
            } else {
                residues.get(residue_index).monoisotopic
            };
        }
        let corrected = masses::mono_to_av_correct(tag_mass, self.mono_to_av);
        if (corrected - self.peptide_mw).abs() > self.peptide_err {
            return Err(CustomError::warning(
                "Inconsistent sequence tag",
                "The tag and its flanking masses do not add up to the peptide mass",
                Context::show(&self.tag_entry),
            ));
        }
        self.tag = Some(SequenceTag {
            n_mass,
            c_mass,
            sequence,
        });
        Ok(())
    }

    /// Take a snapshot of the fields mutated by the scramble loop
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            peptide_mw: self.peptide_mw,
            peptide_err: self.peptide_err,
            fragment_err: self.fragment_err,
            peak_width: self.peak_width,
            mono_to_av: self.mono_to_av,
            qtof_err: self.qtof_err,
            ion_offset: self.ion_offset,
            cys_mw: self.cys_mw,
            modified_n_term: self.modified_n_term,
            modified_c_term: self.modified_c_term,
            max_gap_num: self.max_gap_num,
            top_seq_num: self.top_seq_num,
            final_seq_num: self.final_seq_num,
            tag: self.tag.clone(),
        }
    }

    /// Restore a snapshot taken with [`Self::snapshot`]
    pub fn restore(&mut self, snapshot: &ParamSnapshot) {
        self.peptide_mw = snapshot.peptide_mw;
        self.peptide_err = snapshot.peptide_err;
        self.fragment_err = snapshot.fragment_err;
        self.peak_width = snapshot.peak_width;
        self.mono_to_av = snapshot.mono_to_av;
        self.qtof_err = snapshot.qtof_err;
        self.ion_offset = snapshot.ion_offset;
        self.cys_mw = snapshot.cys_mw;
        self.modified_n_term = snapshot.modified_n_term;
        self.modified_c_term = snapshot.modified_c_term;
        self.max_gap_num = snapshot.max_gap_num;
        self.top_seq_num = snapshot.top_seq_num;
        self.final_seq_num = snapshot.final_seq_num;
        self.tag = snapshot.tag.clone();
    }
}

/// The configuration fields mutated between mass-scramble iterations,
/// snapshotted at run entry and restored on exit
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ParamSnapshot {
    pub peptide_mw: f64,
    pub peptide_err: f64,
    pub fragment_err: f64,
    pub peak_width: f64,
    pub mono_to_av: f64,
    pub qtof_err: f64,
    pub ion_offset: f64,
    pub cys_mw: f64,
    pub modified_n_term: f64,
    pub modified_c_term: f64,
    pub max_gap_num: i32,
    pub top_seq_num: usize,
    pub final_seq_num: usize,
    pub tag: Option<SequenceTag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Parameters::default().validate().unwrap();
    }

    #[test]
    fn auto_gap_number_follows_mass() {
        let mut low = Parameters {
            peptide_mw: 800.0,
            ..Parameters::default()
        };
        low.resolve_max_gap_num();
        assert_eq!(low.max_gap_num, 1);

        let mut mid = Parameters {
            peptide_mw: 1500.0,
            ..Parameters::default()
        };
        mid.resolve_max_gap_num();
        assert_eq!(mid.max_gap_num, 2);

        let mut high = Parameters {
            peptide_mw: 2400.0,
            ..Parameters::default()
        };
        high.resolve_max_gap_num();
        assert_eq!(high.max_gap_num, 3);
    }

    #[test]
    fn explicit_gap_number_is_kept() {
        let mut parameters = Parameters {
            peptide_mw: 2400.0,
            max_gap_num: 1,
            ..Parameters::default()
        };
        parameters.resolve_max_gap_num();
        assert_eq!(parameters.max_gap_num, 1);
    }

    #[test]
    fn tag_setup_reverses_and_checks_mass() {
        // KAELR, M = 601.38: low-y 289.16 brackets [LR], high-y 531.3 is [AELR]
        let mut parameters = Parameters {
            peptide_mw: 601.38,
            peptide_err: 0.8,
            tag_low_y: 289.16,
            tag_entry: "LE".to_string(), // entered low→high = C→N
            tag_high_y: 531.3,
            ..Parameters::default()
        };
        let residues = ResidueTable::default();
        parameters.setup_sequence_tag(&residues).unwrap();
        let tag = parameters.tag.as_ref().unwrap();
        assert_eq!(tag.sequence, vec!['E', 'L']);
        assert!(tag.n_mass > 0.0 && tag.c_mass > 0.0);
    }

    #[test]
    fn tag_above_peptide_mass_is_rejected() {
        let mut parameters = Parameters {
            peptide_mw: 500.0,
            tag_low_y: 289.16,
            tag_entry: "LE".to_string(),
            tag_high_y: 531.3,
            ..Parameters::default()
        };
        let residues = ResidueTable::default();
        let err = parameters.setup_sequence_tag(&residues).unwrap_err();
        assert!(err.is_warning());
    }
}
