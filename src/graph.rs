//! The sequence graph: fragment evidence projected onto the b-ion mass axis.
//!
//! Every observed peak is assumed to be each of several ion types in turn
//! (b, a, y, and their water/ammonia losses) at each plausible charge, and
//! each hypothesis is converted to the mass of the singly charged b ion that
//! would imply. Evidence from N-terminal hypotheses accumulates in
//! `evidence_n`, C-terminal in `evidence_c`; the summed-node scorer later
//! fills in `node`.

use serde::{Deserialize, Serialize};

use crate::config::{FragmentationSpec, Parameters, Proteolysis};
use crate::edman::EdmanData;
use crate::error::{Context, CustomError};
use crate::gaps::GapList;
use crate::residue::{index, ResidueTable};
use crate::scale::{MassScale, ScaledParams};
use crate::spectrum::Spectrum;
use crate::weights::IonWeights;

/// Seed value for the N-terminal node
const N_NODE_VALUE: i8 = 10;
/// Seed value for the C-terminal node band
const C_NODE_VALUE: i8 = 10;
/// Evidence from a disfavoured fragment charge is multiplied by this
const HIGH_CHARGE_MULT: f64 = 0.5;
/// Evidence from b ions above the precursor m/z is multiplied by this
const HIGH_MASS_B_MULT: f64 = 0.5;
/// Evidence from a ions above 350 Da is multiplied by this
const HIGH_MASS_A_MULT: f64 = 0.1;
/// Minimum mass per charge for a fragment to hold that charge (Da)
const MIN_MASS_PER_CHARGE: f64 = 300.0;

/// The fragment ion hypotheses projected by the templates
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum IonKind {
    B,
    BLoss,
    A,
    ALoss,
    Y,
    YLoss,
}

/// The three dense evidence arrays indexed by scaled b-ion mass
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SpectrumGraph {
    /// Evidence from N-terminal interpretations
    pub evidence_n: Vec<i8>,
    /// Evidence from C-terminal interpretations, mapped to the b axis
    pub evidence_c: Vec<i8>,
    /// Final summed node scores, filled in by the summed-node scorer
    pub node: Vec<i8>,
}

impl SpectrumGraph {
    /// The graph length
    pub fn len(&self) -> usize {
        self.node.len()
    }

    /// Tests if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    /// The scaled-mass bounds of the super-node band (−1 markers), if a
    /// sequence tag was overlaid
    pub fn super_node_range(&self) -> Option<(i32, i32)> {
        let low = self
            .evidence_n
            .iter()
            .zip(&self.evidence_c)
            .position(|(&n, &c)| n == -1 && c == -1)?;
        let high = self
            .evidence_n
            .iter()
            .zip(&self.evidence_c)
            .rposition(|(&n, &c)| n == -1 && c == -1)?;
        Some((low as i32, high as i32))
    }

    /// Build the graph for one spectrum. `scaled.peptide_mw` is reduced by
    /// the tag mass when a sequence tag is excised.
    pub fn build(
        spectrum: &Spectrum,
        parameters: &Parameters,
        scaled: &mut ScaledParams,
        scale: &MassScale,
        gaps: &GapList,
        residues: &ResidueTable,
        weights: &IonWeights,
        edman: Option<&EdmanData>,
    ) -> Result<Self, CustomError> {
        let mut graph = Self {
            evidence_n: vec![0; scale.graph_length],
            evidence_c: vec![0; scale.graph_length],
            node: vec![0; scale.graph_length],
        };

        let mut builder = Builder {
            graph: &mut graph,
            peaks: spectrum
                .peaks()
                .iter()
                .map(|p| f64::from(scale.scaled(p.mz.value)))
                .collect(),
            parameters,
            scaled,
            scale,
            gaps,
            residues,
            weights,
            ion_present: Vec::new(),
        };

        builder.seed_terminals()?;
        builder.project_template()?;
        builder.remove_silly_nodes();
        if parameters.proteolysis != Proteolysis::None {
            builder.seed_cleavage_residue();
        }
        if let Some(edman) = edman {
            builder.overlay_edman(edman, weights.total());
        }
        if parameters.tag.is_some() {
            builder.overlay_tag()?;
        }
        Ok(graph)
    }
}

/// Saturating evidence write: clamp to the open byte interval, 63 on overflow
fn add_evidence(slot: &mut i8, weight: f64) {
    let value = i32::from(*slot) + weight as i32;
    *slot = if value < 127 && value > -127 {
        value as i8
    } else {
        63
    };
}

struct Builder<'a> {
    graph: &'a mut SpectrumGraph,
    /// Scaled integral peak m/z values, ascending
    peaks: Vec<f64>,
    parameters: &'a Parameters,
    scaled: &'a mut ScaledParams,
    scale: &'a MassScale,
    gaps: &'a GapList,
    residues: &'a ResidueTable,
    weights: &'a IonWeights,
    /// Marks scaled a-ion masses already credited, gating the a−17/−18 pass
    ion_present: Vec<bool>,
}

impl Builder<'_> {
    fn graph_len(&self) -> i32 {
        self.graph.node.len() as i32
    }

    fn max_fragment_charge(&self) -> i32 {
        if self.parameters.deconvolved {
            1
        } else {
            self.parameters.charge_state
        }
    }

    fn likely_fragment_charge(&self) -> i32 {
        if self.parameters.deconvolved || self.parameters.charge_state == 1 {
            1
        } else {
            self.parameters.charge_state - 1
        }
    }

    /// Seed the N-terminal node and the C-terminal node band
    fn seed_terminals(&mut self) -> Result<(), CustomError> {
        let first = self.scaled.modified_n_term as usize;
        self.graph.evidence_n[first] = N_NODE_VALUE;
        self.graph.evidence_c[first] = N_NODE_VALUE;
        self.graph.node[first] = N_NODE_VALUE + N_NODE_VALUE;

        let last = self.scaled.peptide_mw - self.scaled.modified_c_term;
        let last = self.scale.av_to_mono(last, self.scaled.mono_to_av);
        let high = (last + self.scaled.peptide_err) as i32;
        let low = (last - self.scaled.peptide_err) as i32;
        if high >= self.graph_len() || low <= 0 {
            return Err(CustomError::warning(
                "Graph length exceeded",
                "The C-terminal node band does not fit the graph; the peptide mass and tolerance are inconsistent",
                Context::none(),
            ));
        }
        for i in low..=high {
            self.graph.evidence_n[i as usize] = C_NODE_VALUE;
            self.graph.evidence_c[i as usize] = C_NODE_VALUE;
            self.graph.node[i as usize] = C_NODE_VALUE + C_NODE_VALUE;
        }
        Ok(())
    }

    /// Project every peak under the template's ion set
    fn project_template(&mut self) -> Result<(), CustomError> {
        self.ion_present = vec![false; self.graph.node.len()];
        let kinds = [
            (IonKind::B, self.weights.b),
            (IonKind::BLoss, self.weights.b_minus_17_18),
            (IonKind::A, self.weights.a),
            (IonKind::ALoss, self.weights.a_minus_17_18),
            (IonKind::Y, self.weights.y),
            (IonKind::YLoss, self.weights.y_minus_17_18),
        ];
        for (kind, weight) in kinds {
            if weight != 0 {
                self.project_kind(kind, f64::from(weight))?;
            }
        }
        Ok(())
    }

    /// One full pass over the peaks for one ion hypothesis
    fn project_kind(&mut self, kind: IonKind, weight: f64) -> Result<(), CustomError> {
        let ion_trap = self.parameters.fragmentation == FragmentationSpec::IonTrap;
        let tolerance = self.scaled.fragment_err;
        let hydrogen = f64::from(self.scale.hydrogen());
        let water = f64::from(self.scale.water);
        let ammonia = f64::from(self.scale.ammonia);
        let co = f64::from(self.scale.co);
        let likely = self.likely_fragment_charge();
        let s = f64::from(self.scale.multiplier);
        let precursor_mz = self
            .scaled
            .precursor_mz(self.parameters.charge_state, self.scale.hydrogen());

        for peak_index in 0..self.peaks.len() {
            let mz = self.peaks[peak_index];
            for charge in 1..=self.max_fragment_charge() {
                if !self.is_plausible(mz, charge) {
                    continue;
                }
                // Non-ion-trap b ions above the precursor m/z also need a
                // supporting a ion
                if kind == IonKind::B
                    && !ion_trap
                    && mz > self.scaled.peptide_mw / f64::from(self.parameters.charge_state)
                        + tolerance * 2.0
                    && !self.has_supporting_a_ion(mz, charge)
                {
                    continue;
                }

                // Convert to the singly charged equivalent, then to
                // monoisotopic convention
                let singly = mz * f64::from(charge) - f64::from(charge - 1) * hydrogen;
                let singly = self.scale.av_to_mono(singly, self.scaled.mono_to_av);

                // The window of b-axis positions this hypothesis paints
                let (lo, hi, b_equiv) = match kind {
                    IonKind::B => {
                        let (lo, hi) = self.scale.window(singly, tolerance);
                        (lo, hi, singly)
                    }
                    IonKind::BLoss => {
                        let hi = (singly + water + tolerance) as i32;
                        let lo = (singly + ammonia - tolerance + 0.5) as i32;
                        (lo, hi, singly + water)
                    }
                    IonKind::A => {
                        let (lo, hi) = self.scale.window(singly + co, tolerance);
                        (lo, hi, singly + co)
                    }
                    IonKind::ALoss => {
                        let (lo, hi) = self.scale.window(singly + water + co, tolerance);
                        (lo, hi, singly + water + co)
                    }
                    IonKind::Y | IonKind::YLoss => {
                        let peptide = self
                            .scale
                            .av_to_mono(self.scaled.peptide_mw, self.scaled.mono_to_av);
                        let b = peptide - singly + 2.0 * hydrogen;
                        match kind {
                            IonKind::Y => {
                                // High mass y²⁺ ions (low b equivalents) get
                                // a charge-widened window on ion traps
                                if ion_trap && b <= 372.0 * s {
                                    let wide = tolerance * f64::from(charge);
                                    let hi = (b + wide) as i32;
                                    let lo = (b - wide + 0.5) as i32;
                                    (lo, hi, b)
                                } else {
                                    let (lo, hi) = self.scale.window(b, tolerance);
                                    (lo, hi, b)
                                }
                            }
                            _ => {
                                let hi = (b - ammonia + tolerance) as i32;
                                let lo = (b - water - tolerance + 0.5) as i32;
                                (lo, hi, b - water)
                            }
                        }
                    }
                };

                if hi >= self.graph_len() {
                    return Err(CustomError::warning(
                        "Graph length exceeded",
                        "A projected fragment lands beyond the end of the graph",
                        Context::none(),
                    ));
                }
                let lo = lo.max(0);

                for position in lo..=hi {
                    let slot = position as usize;
                    let charge_mult = if charge <= likely { 1.0 } else { HIGH_CHARGE_MULT };
                    match kind {
                        IonKind::B => {
                            if ion_trap {
                                // Ion trap b: credit only above y1-for-Lys,
                                // no high-mass attenuation
                                if charge <= likely && b_equiv <= 147.0 * s {
                                    continue;
                                }
                                add_evidence(
                                    &mut self.graph.evidence_n[slot],
                                    weight * charge_mult,
                                );
                            } else {
                                let mass_mult = if b_equiv < precursor_mz && b_equiv > 147.0 * s {
                                    1.0
                                } else {
                                    HIGH_MASS_B_MULT
                                };
                                add_evidence(
                                    &mut self.graph.evidence_n[slot],
                                    weight * charge_mult * mass_mult,
                                );
                            }
                        }
                        IonKind::BLoss => {
                            if self.graph.evidence_n[slot] != 0 {
                                add_evidence(
                                    &mut self.graph.evidence_n[slot],
                                    weight * charge_mult,
                                );
                            }
                        }
                        IonKind::A => {
                            if self.graph.evidence_n[slot] != 0 {
                                let mass_mult = if b_equiv < 350.0 * s {
                                    1.0
                                } else {
                                    HIGH_MASS_A_MULT
                                };
                                add_evidence(
                                    &mut self.graph.evidence_n[slot],
                                    weight * charge_mult * mass_mult,
                                );
                                let a_position = slot.saturating_sub(self.scale.co as usize);
                                self.ion_present[a_position] = true;
                            }
                        }
                        IonKind::ALoss => {
                            let a_position = slot.saturating_sub(self.scale.co as usize);
                            if self.ion_present[a_position] {
                                let mass_mult = if b_equiv < 350.0 * s {
                                    1.0
                                } else {
                                    HIGH_MASS_A_MULT
                                };
                                add_evidence(
                                    &mut self.graph.evidence_n[slot],
                                    weight * charge_mult * mass_mult,
                                );
                            }
                        }
                        IonKind::Y => {
                            let low_mass_retained = ion_trap && b_equiv <= 373.0 * s;
                            let mult = if charge <= likely || low_mass_retained {
                                1.0
                            } else {
                                HIGH_CHARGE_MULT
                            };
                            add_evidence(&mut self.graph.evidence_c[slot], weight * mult);
                        }
                        IonKind::YLoss => {
                            if self.graph.evidence_c[slot] != 0 {
                                add_evidence(
                                    &mut self.graph.evidence_c[slot],
                                    weight * charge_mult,
                                );
                            }
                        }
                    }
                }
            }
        }

        // Positions whose value stayed below the base weight arose only from
        // disfavoured-charge hypotheses with no corroboration
        match kind {
            IonKind::B => {
                let weight = weight as i8;
                for slot in &mut self.graph.evidence_n {
                    if *slot < weight {
                        *slot = 0;
                    }
                }
            }
            IonKind::Y => {
                let weight = weight as i8;
                let start = if ion_trap { (373.0 * s) as usize } else { 0 };
                for slot in &mut self.graph.evidence_c[start.min(self.scale.graph_length)..] {
                    if *slot < weight {
                        *slot = 0;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// The plausibility filter applied to every peak/charge hypothesis:
    /// rejects the precursor and its water loss, immonium-dominated masses,
    /// fragments too light to hold the assumed charge, and masses beyond the
    /// peptide
    fn is_plausible(&self, mz: f64, charge: i32) -> bool {
        let s = f64::from(self.scale.multiplier);
        let tolerance = self.scaled.fragment_err;
        let hydrogen = f64::from(self.scale.hydrogen());
        let co = f64::from(self.scale.co);
        let max_charge = self.max_fragment_charge();

        if mz < f64::from(charge - 1) * (MIN_MASS_PER_CHARGE * s + 0.5) {
            return false;
        }

        let precursor = self
            .scaled
            .precursor_mz(max_charge, self.scale.hydrogen());
        if (mz - precursor).abs() <= tolerance {
            return false;
        }
        let water_loss = (self.scaled.peptide_mw - f64::from(self.scale.water)
            + f64::from(max_charge) * hydrogen)
            / f64::from(max_charge);
        if (mz - water_loss).abs() <= tolerance {
            return false;
        }

        if mz < 115.0 * s {
            return false;
        }

        // Common immonium ions and the tryptic y1 region
        let phe = f64::from(self.scale.residue_masses[index::F]) - co + hydrogen;
        let tyr = f64::from(self.scale.residue_masses[index::Y]) - co + hydrogen;
        let trp = f64::from(self.scale.residue_masses[index::W]) - co + hydrogen;
        for veto in [phe, tyr, trp, 129.0 * s] {
            if (mz - veto).abs() <= tolerance {
                return false;
            }
        }

        let singly = mz * f64::from(charge) - f64::from(charge - 1) * hydrogen;
        let glycine = f64::from(self.scale.residue_masses[index::G]);
        singly <= self.scaled.peptide_mw - glycine
    }

    /// Look for an a ion supporting a b hypothesis above the precursor m/z
    fn has_supporting_a_ion(&self, mz: f64, charge: i32) -> bool {
        let target = (mz - f64::from(self.scale.co)) / f64::from(charge);
        self.peaks
            .iter()
            .take_while(|&&p| p <= mz)
            .any(|&p| (p - target).abs() <= self.scaled.fragment_err)
    }

    /// Zero every low-mass position that no residue combination can reach
    /// from the N-terminal node
    fn remove_silly_nodes(&mut self) {
        let first = (self.scaled.modified_n_term + 0.5) as i32;
        let glycine = self.scale.residue_masses[index::G];
        let alanine = self.scale.residue_masses[index::A];
        let s = self.scale.multiplier;

        // Below one glycine only the N-terminal node itself may live
        for i in 0..(first + glycine).min(self.graph_len()) {
            if i != first {
                self.graph.evidence_n[i as usize] = 0;
                self.graph.evidence_c[i as usize] = 0;
            }
        }

        // One residue reaches up to two alanines
        for i in first + glycine..(first + alanine * 2).min(self.graph_len()) {
            let slot = i as usize;
            if self.graph.evidence_n[slot] == 0 && self.graph.evidence_c[slot] == 0 {
                continue;
            }
            let reachable = self
                .gaps
                .singles()
                .iter()
                .any(|&g| g != 0 && first + g == i);
            if !reachable {
                self.graph.evidence_n[slot] = 0;
                self.graph.evidence_c[slot] = 0;
            }
        }

        // One or two residues cover 142..239 (above that, three residues
        // always can)
        for i in first + 142 * s..(first + 239 * s).min(self.graph_len()) {
            let slot = i as usize;
            if self.graph.evidence_n[slot] == 0 && self.graph.evidence_c[slot] == 0 {
                continue;
            }
            let singles = self.gaps.singles();
            let mut reachable = singles.iter().any(|&g| g != 0 && first + g == i);
            if !reachable {
                'outer: for (a, &ga) in singles.iter().enumerate() {
                    if ga == 0 {
                        continue;
                    }
                    for &gb in &singles[a..] {
                        if gb != 0 && first + ga + gb == i {
                            reachable = true;
                            break 'outer;
                        }
                    }
                }
            }
            if !reachable {
                self.graph.evidence_n[slot] = 0;
                self.graph.evidence_c[slot] = 0;
            }
        }
    }

    /// Guarantee the node one enzyme-specific residue below the C-terminus:
    /// the y1 ion is often unobserved but the cleavage is assumed
    fn seed_cleavage_residue(&mut self) {
        let ion_trap = self.parameters.fragmentation == FragmentationSpec::IonTrap;

        // The highest band of C evidence is the C-terminal node band
        let mut i = self.graph_len() - 1;
        while i > 0 && self.graph.evidence_c[i as usize] == 0 {
            i -= 1;
        }
        if i == 0 {
            return;
        }
        let c_term = i as usize;

        let seed = |residue: usize, value: i8, boost: bool, builder: &mut Self| {
            let position = c_term.wrapping_sub(builder.scale.residue_masses[residue] as usize);
            if position >= builder.graph.node.len() {
                return;
            }
            if boost {
                // Ion trap data shows the complementary b ion, other
                // instruments the y2; quadruple whichever applies
                if ion_trap {
                    builder.graph.evidence_n[position] =
                        builder.graph.evidence_n[position].saturating_mul(4);
                } else {
                    builder.graph.evidence_c[position] =
                        builder.graph.evidence_c[position].saturating_mul(4);
                }
            }
            if builder.graph.evidence_c[position] == 0 && builder.graph.evidence_n[position] == 0 {
                builder.graph.evidence_c[position] = value;
                builder.graph.evidence_n[position] = value;
            }
        };

        match self.parameters.proteolysis {
            Proteolysis::Trypsin => {
                seed(index::K, 10, true, self);
                seed(index::R, 10, true, self);
            }
            Proteolysis::LysC => seed(index::K, 1, false, self),
            Proteolysis::GluC => {
                seed(index::E, 1, false, self);
                seed(index::D, 1, false, self);
            }
            Proteolysis::AspN => {
                let position =
                    (self.scale.residue_masses[index::D] + self.scale.hydrogen()) as usize;
                if position < self.graph.node.len()
                    && self.graph.evidence_c[position] == 0
                    && self.graph.evidence_n[position] == 0
                {
                    self.graph.evidence_c[position] = 1;
                    self.graph.evidence_n[position] = 1;
                }
            }
            Proteolysis::None => {}
        }
    }

    /// Add Edman sequencing evidence: every residue permutation consistent
    /// with each prefix of the Edman table marks its node
    fn overlay_edman(&mut self, edman: &EdmanData, total_ion_weight: i32) {
        let half = (f64::from(total_ion_weight) * 0.5) as i8;
        let hydrogen = self.scale.hydrogen();
        let graph_length = self.graph.node.len();
        for prefix in 1..=edman.cycle_count() {
            let evidence_n = &mut self.graph.evidence_n;
            let evidence_c = &mut self.graph.evidence_c;
            edman.for_each_prefix_sum(prefix, |sum| {
                let node = (hydrogen + sum) as usize;
                if node >= graph_length {
                    return;
                }
                for evidence in [&mut *evidence_n, &mut *evidence_c] {
                    if evidence[node] != 0 {
                        evidence[node] = evidence[node].saturating_add(half);
                    } else if prefix == 1 {
                        evidence[node] = 1;
                    }
                }
            });
        }
    }

    /// Overlay the user-supplied sequence tag: mark the tag entry band with
    /// super-nodes and excise the tag region so enumeration sees a shorter
    /// graph. Reduces the scaled peptide mass by the tag mass.
    fn overlay_tag(&mut self) -> Result<(), CustomError> {
        let Some(tag) = self.parameters.tag.as_ref() else {
            return Ok(());
        };
        let tolerance = self.scaled.fragment_err;

        // Scaled masses of the tag residues, honouring the cysteine override
        // and the isobaric folds
        let mut tag_masses = Vec::with_capacity(tag.sequence.len());
        for &code in &tag.sequence {
            let mass = self.gaps.single_for_code(self.residues, code).ok_or_else(|| {
                CustomError::warning(
                    "Invalid sequence tag",
                    format!("The tag residue '{code}' is unknown or configured as absent"),
                    Context::none(),
                )
            })?;
            tag_masses.push(mass);
        }
        let tag_mass: i32 = tag_masses.iter().sum();

        // The C-terminal unsequenced mass expressed as an offset above the
        // tag's top node: it includes the C-terminal group, which the b axis
        // does not carry
        let c_mass = self
            .scale
            .av_to_mono(self.scaled.tag_c_mass, self.scaled.mono_to_av)
            - self.scaled.modified_c_term;
        let c_hi = (c_mass + tolerance) as i32;
        let c_lo = (c_mass - tolerance + 0.5) as i32;

        let n_mass = self
            .scale
            .av_to_mono(self.scaled.tag_n_mass, self.scaled.mono_to_av);
        let n_hi = (n_mass + tolerance) as i32;
        let n_lo = ((n_mass - tolerance + 0.5) as i32).max(self.scale.hydrogen());

        let mut any_super = false;
        for node in n_lo..=n_hi {
            if node >= self.graph_len() {
                return Err(CustomError::warning(
                    "Graph length exceeded",
                    "The sequence tag band lands beyond the end of the graph",
                    Context::none(),
                ));
            }
            // The node above the tag must carry the C-terminal-side evidence
            let top = node + tag_mass;
            let supported = (top + c_lo..=top + c_hi)
                .any(|i| i >= 0 && i < self.graph_len() && self.graph.evidence_n[i as usize] != 0);
            if supported {
                self.graph.evidence_n[node as usize] = -1;
                self.graph.evidence_c[node as usize] = -1;
                any_super = true;
            }
        }
        if !any_super {
            return Ok(());
        }

        // Excise: shift everything above the tag down over the wound
        let Some(top_super) = self.graph.evidence_n.iter().rposition(|&v| v == -1) else {
            return Ok(());
        };
        let top_super = top_super as i32;
        let mut destination = top_super + 1;
        let mut origin = destination + tag_mass;
        while origin < self.graph_len() {
            self.graph.evidence_n[destination as usize] = self.graph.evidence_n[origin as usize];
            self.graph.evidence_c[destination as usize] = self.graph.evidence_c[origin as usize];
            destination += 1;
            origin += 1;
        }
        while destination < self.graph_len() {
            self.graph.evidence_n[destination as usize] = 0;
            self.graph.evidence_c[destination as usize] = 0;
            destination += 1;
        }

        self.scaled.peptide_mw -= f64::from(tag_mass);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::Peak;

    fn make_context(
        peptide_mw: f64,
        peaks: &[(f64, f64)],
    ) -> (Spectrum, Parameters, MassScale, ScaledParams, GapList, ResidueTable) {
        let mut spectrum = Spectrum::default();
        spectrum.extend(peaks.iter().map(|&(mz, intensity)| {
            let mut peak = Peak::new(mz, intensity);
            peak.normalized = intensity;
            peak
        }));
        let parameters = Parameters {
            peptide_mw,
            charge_state: 1,
            ..Parameters::default()
        };
        let residues = ResidueTable::default();
        let scale = MassScale::new(parameters.fragment_err, peptide_mw, 0, &residues);
        let scaled = ScaledParams::new(&parameters, &scale);
        let gaps = GapList::new(&residues, &scale, &scaled, &parameters);
        (spectrum, parameters, scale, scaled, gaps, residues)
    }

    fn build(
        spectrum: &Spectrum,
        parameters: &Parameters,
        scale: &MassScale,
        scaled: &mut ScaledParams,
        gaps: &GapList,
        residues: &ResidueTable,
    ) -> SpectrumGraph {
        let weights = IonWeights::for_template(parameters.fragmentation);
        SpectrumGraph::build(
            spectrum, parameters, scaled, scale, gaps, residues, &weights, None,
        )
        .unwrap()
    }

    #[test]
    fn terminals_are_seeded() {
        let (spectrum, parameters, scale, mut scaled, gaps, residues) =
            make_context(500.0, &[]);
        let graph = build(&spectrum, &parameters, &scale, &mut scaled, &gaps, &residues);
        let n_term = scaled.modified_n_term as usize;
        assert_eq!(graph.evidence_n[n_term], N_NODE_VALUE);

        let c_term = (scaled.peptide_mw - scaled.modified_c_term) as usize;
        assert!(graph.evidence_c[c_term] >= C_NODE_VALUE);
    }

    #[test]
    fn complementary_y_and_b_share_a_node() {
        // A y interpretation must land at the node of the complementary b;
        // the graph makes no distinction between the two. Peptide AR (M = 245.15): b1(A) = 72.04,
        // y1(R) = 175.12 must both mark the node at scaled 72.04.
        let (spectrum, parameters, scale, mut scaled, gaps, residues) =
            make_context(245.150, &[(200.0, 10.0), (175.119, 50.0)]);
        let graph = build(&spectrum, &parameters, &scale, &mut scaled, &gaps, &residues);
        let b1 = scale.scaled(72.044) as usize;
        assert!(
            graph.evidence_c[b1] != 0,
            "y1 should project C evidence onto the b1 node"
        );
    }

    #[test]
    fn sub_glycine_noise_is_removed() {
        let (spectrum, parameters, scale, mut scaled, gaps, residues) =
            make_context(800.0, &[(120.5, 40.0)]);
        let graph = build(&spectrum, &parameters, &scale, &mut scaled, &gaps, &residues);
        let n_term = scaled.modified_n_term as usize;
        let glycine = scale.residue_masses[crate::residue::index::G] as usize;
        for i in 0..n_term + glycine {
            if i != n_term {
                assert_eq!(graph.evidence_n[i], 0, "position {i} below Gly must be clear");
            }
        }
    }

    #[test]
    fn tryptic_cleavage_node_is_guaranteed() {
        let (spectrum, parameters, scale, mut scaled, gaps, residues) =
            make_context(600.0, &[]);
        let graph = build(&spectrum, &parameters, &scale, &mut scaled, &gaps, &residues);
        let last = scale.av_to_mono(
            scaled.peptide_mw - scaled.modified_c_term,
            scaled.mono_to_av,
        );
        let c_term = (last + scaled.peptide_err) as usize;
        let lys_node = c_term - scale.residue_masses[crate::residue::index::K] as usize;
        let arg_node = c_term - scale.residue_masses[crate::residue::index::R] as usize;
        assert!(graph.evidence_c[lys_node] != 0 || graph.evidence_n[lys_node] != 0);
        assert!(graph.evidence_c[arg_node] != 0 || graph.evidence_n[arg_node] != 0);
    }
}
