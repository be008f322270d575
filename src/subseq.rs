//! The subsequence enumerator: best-first extension from the N-terminus
//! through the scored graph.
//!
//! A beam of partial sequences, kept sorted descending by score, is extended
//! one step at a time. Extensions jump by one residue wherever the graph has
//! a node, or bridge two residues (with a penalty) where fragmentation left
//! no evidence; sequences that land on a C-terminal node within the peptide
//! mass tolerance are promoted to the completed store.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::{Parameters, Proteolysis};
use crate::gaps::GapList;
use crate::graph::SpectrumGraph;
use crate::residue::{index, ResidueTable};
use crate::scale::{MassScale, ScaledParams};

/// Maximum peptide length in residue steps
pub const MAX_PEPTIDE_LENGTH: usize = 60;

/// Penalty multipliers for two-residue gaps, by what the endpoints are
const EDGE_EDGE_PENALTY: f64 = 0.9;
const PROLINE_PENALTY: f64 = 0.75;
const PRECURSOR_PENALTY: f64 = 0.65;
const NODE_EDGE_PENALTY: f64 = 0.4;
const NODE_NODE_PENALTY: f64 = 0.2;

/// A partial sequence in the beam
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PartialSequence {
    /// The scaled jump masses walked so far
    pub residues: Vec<i32>,
    /// Sum of the node values along the path
    pub score: i32,
    /// The scaled mass reached (the node this sequence sits on)
    pub node_value: i32,
    /// Carry accumulator for the first decimal of the scaled masses
    pub node_correction: i16,
    /// The number of two-residue gaps used (the seed step not counted)
    pub gap_count: i32,
}

/// A completed candidate sequence
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Candidate {
    /// The scaled jump masses, N→C
    pub residues: Vec<i32>,
    /// The enumeration score, adjusted for expected peptide length
    pub score: f64,
    /// The scaled mass reached
    pub node_value: i32,
    /// The residual carry at completion
    pub node_correction: i16,
    /// The number of two-residue gaps
    pub gap_count: i32,
}

/// A proposed extension of one beam entry
#[derive(Copy, Clone, Debug)]
struct Extension {
    mass: i32,
    score: i32,
    node_correction: i16,
    gap_size: i32,
    single: bool,
}

/// The completion band and the enzyme-specific terminal residues
struct Termination {
    max_last_node: i32,
    min_last_node: i32,
    /// (residue mass, landing band low, landing band high)
    terminal_residues: Vec<(i32, i32, i32)>,
}

/// Everything the extension steps need to share
struct Enumerator<'a> {
    graph: &'a SpectrumGraph,
    parameters: &'a Parameters,
    scaled: &'a ScaledParams,
    scale: &'a MassScale,
    gaps: &'a GapList,
    residues: &'a ResidueTable,
    one_edge_nodes: &'a [i32],
    termination: Termination,
    low_super: i32,
    high_super: i32,
    present_masses: Vec<i32>,
    completed: Vec<Candidate>,
    top_seq_num: usize,
    final_seq_num: usize,
    started: Instant,
}

/// Run the enumeration and return the completed candidates, best first.
/// `graph.node` is mutated: super-node markers become ordinary high-value
/// nodes for the duration.
pub fn enumerate(
    graph: &mut SpectrumGraph,
    parameters: &Parameters,
    scaled: &ScaledParams,
    scale: &MassScale,
    gaps: &GapList,
    residues: &ResidueTable,
    one_edge_nodes: &[i32],
) -> Vec<Candidate> {
    let length = graph.len() as i32;

    // Locate and neutralize the super-node band: the markers become maximal
    // nodes the threshold logic recognises by score
    let (mut low_super, mut high_super) = (0, length - 1);
    if parameters.tag.is_some() {
        if let Some(low) = graph.node.iter().position(|&v| v == -1) {
            low_super = low as i32;
        }
        if let Some(high) = graph.node.iter().rposition(|&v| v == -1) {
            high_super = high as i32;
        }
        for value in &mut graph.node {
            if *value == -1 {
                *value = 127;
            }
        }
    }

    // The completion band: the highest contiguous run of positive nodes
    let mut max_last_node = 0;
    let mut min_last_node = 0;
    let mut i = length - 1;
    while i > 0 {
        if graph.node[i as usize] > 0 {
            max_last_node = i;
            while i > 0 && graph.node[i as usize] > 0 {
                min_last_node = i;
                i -= 1;
            }
            break;
        }
        i -= 1;
    }
    if max_last_node == 0 {
        return Vec::new();
    }

    let mut terminal_residues = Vec::new();
    let mut add_terminal = |residue: usize| {
        let mass = scale.residue_masses[residue];
        terminal_residues.push((mass, min_last_node - mass, max_last_node - mass));
    };
    match parameters.proteolysis {
        Proteolysis::Trypsin => {
            add_terminal(index::R);
            add_terminal(index::K);
        }
        Proteolysis::LysC => add_terminal(index::K),
        Proteolysis::GluC => {
            add_terminal(index::E);
            add_terminal(index::D);
        }
        Proteolysis::AspN | Proteolysis::None => {}
    }

    let present_masses: Vec<i32> = parameters
        .present_residues
        .iter()
        .filter_map(|&code| gaps.single_for_code(residues, code))
        .collect();

    let mut enumerator = Enumerator {
        graph,
        parameters,
        scaled,
        scale,
        gaps,
        residues,
        one_edge_nodes,
        termination: Termination {
            max_last_node,
            min_last_node,
            terminal_residues,
        },
        low_super,
        high_super,
        present_masses,
        completed: Vec::new(),
        top_seq_num: parameters.top_seq_num,
        final_seq_num: parameters.final_seq_num,
        started: Instant::now(),
    };

    let mut beam = enumerator.seed_beam();
    while !beam.is_empty() {
        // The cooperative time governor: narrow the beam when the spectrum
        // is taking too long
        let elapsed = enumerator.started.elapsed().as_secs();
        if elapsed > 60 {
            enumerator.top_seq_num = parameters.top_seq_num / 4;
        } else if elapsed > 30 {
            enumerator.top_seq_num = parameters.top_seq_num / 2;
        }
        beam = enumerator.extend_all(beam);
    }

    enumerator.completed
}

/// Insert into a descending-by-score list with a capacity: when full, the
/// worst entry is the one replaced
fn insert_ranked<T, F: Fn(&T) -> f64>(list: &mut Vec<T>, item: T, cap: usize, score: F) {
    if list.len() >= cap {
        if let Some(last) = list.last() {
            if score(&item) <= score(last) {
                return;
            }
        }
        list.pop();
    }
    let position = list
        .partition_point(|existing| score(existing) >= score(&item));
    list.insert(position, item);
}

impl Enumerator<'_> {
    fn graph_len(&self) -> i32 {
        self.graph.len() as i32
    }

    fn skips_super_node(&self, from: i32, to: i32) -> bool {
        from < self.low_super && to > self.high_super
    }

    /// The initial node-correction: the first decimal of the N-terminal
    /// modification mass
    fn seed_correction(&self) -> i16 {
        let fine = (self.scaled.modified_n_term * 10.0 + 0.5) as i32;
        let coarse = ((self.scaled.modified_n_term + 0.5) as i32) * 10;
        (fine - coarse) as i16
    }

    /// The first extension step: jump one, two, or three residues from the
    /// N-terminal node to any non-zero node
    fn seed_beam(&mut self) -> Vec<PartialSequence> {
        let n_terminus = (self.scaled.modified_n_term + 0.5) as i32;
        let glycine = self.scale.residue_masses[index::G];
        let tryptophan = self.scale.residue_masses[index::W];

        // Collect candidate first jumps
        let mut extensions: Vec<(i32, i32)> = Vec::new(); // (jump, score)
        let scan_end = (tryptophan * 3).min(self.graph_len());
        for node in n_terminus + glycine..scan_end {
            if self.graph.node[node as usize] == 0 {
                continue;
            }
            let jump = node - n_terminus;
            let reachable = self.gaps.all().iter().any(|&g| g != 0 && g == jump)
                || self.gaps.triples().contains(&jump);
            if !reachable {
                continue;
            }
            if self.skips_super_node(n_terminus, node) {
                continue;
            }
            if node <= self.termination.max_last_node {
                extensions.push((jump, i32::from(self.graph.node[node as usize])));
            }
        }

        // Consolidate extensions one scaled unit apart (mass slop around one
        // peak) into their average position
        for i in 0..extensions.len() {
            if extensions[i].1 == 0 {
                continue;
            }
            let mut cluster = vec![i];
            let mut sum = extensions[i].0;
            loop {
                let before = cluster.len();
                for j in 0..extensions.len() {
                    if cluster.contains(&j) || extensions[j].1 == 0 {
                        continue;
                    }
                    if cluster
                        .iter()
                        .any(|&c| (extensions[c].0 - extensions[j].0).abs() == 1)
                    {
                        cluster.push(j);
                        sum += extensions[j].0;
                    }
                }
                if cluster.len() == before {
                    break;
                }
            }
            if cluster.len() > 1 {
                extensions[i].0 = (f64::from(sum) / cluster.len() as f64 + 0.5) as i32;
                for &j in &cluster[1..] {
                    extensions[j].1 = 0;
                }
            }
        }

        // Among extensions within the fragment tolerance of each other keep
        // the better scoring one
        for i in 0..extensions.len() {
            if extensions[i].1 == 0 {
                continue;
            }
            for j in 0..extensions.len() {
                if i == j || extensions[j].1 == 0 {
                    continue;
                }
                if (f64::from(extensions[i].0) - f64::from(extensions[j].0)).abs()
                    <= self.scaled.fragment_err
                {
                    if extensions[i].1 >= extensions[j].1 {
                        extensions[j].1 = 0;
                    } else {
                        extensions[i].1 = 0;
                    }
                }
            }
        }

        // A longer first jump that differs from a shorter one by a residue
        // will be rebuilt by normal extension; drop it here
        for i in 0..extensions.len() {
            for j in i + 1..extensions.len() {
                let difference = extensions[j].0 - extensions[i].0;
                if self
                    .gaps
                    .matches_single(difference, self.scaled.fragment_err)
                {
                    extensions[j].1 = 0;
                }
            }
        }

        let best = extensions.iter().map(|e| e.1).max().unwrap_or(0);
        let mut threshold = (f64::from(best) * self.parameters.ext_thresh) as i32;
        // A super-node seed (score beyond any evidence sum) suspends the
        // threshold so the tag is never pruned away
        if self.parameters.tag.is_some() && best > 100 {
            threshold = 0;
        }

        let correction = self.seed_correction();
        let mut beam: Vec<PartialSequence> = Vec::new();
        for (jump, score) in extensions {
            if score == 0 || score < threshold {
                continue;
            }
            let top_seq_num = self.top_seq_num;
            insert_ranked(
                &mut beam,
                PartialSequence {
                    residues: vec![jump],
                    score,
                    node_value: n_terminus + jump,
                    node_correction: correction,
                    gap_count: 0,
                },
                top_seq_num,
                |p| f64::from(p.score),
            );
        }
        beam
    }

    /// One beam step: propose extensions for every entry, prune, promote
    fn extend_all(&mut self, beam: Vec<PartialSequence>) -> Vec<PartialSequence> {
        let mut next_beam: Vec<PartialSequence> = Vec::new();
        for partial in &beam {
            let extensions = self.propose(partial);
            if extensions.is_empty() {
                continue;
            }
            let extensions = self.prune(extensions);
            self.store(partial, &extensions, &mut next_beam);
        }
        next_beam
    }

    /// Collect the valid single-residue and two-residue extensions
    fn propose(&self, partial: &PartialSequence) -> Vec<Extension> {
        let mut extensions = Vec::new();
        let mut extendable_by_single = false;

        for (slot, &jump) in self.gaps.singles().iter().enumerate() {
            if jump == 0 {
                continue;
            }
            let target = partial.node_value + jump;
            if self.skips_super_node(partial.node_value, target)
                || target >= self.graph_len()
                || target > self.termination.max_last_node
            {
                continue;
            }
            if self.graph.node[target as usize] != 0 {
                extensions.push(Extension {
                    mass: jump,
                    score: i32::from(self.graph.node[target as usize]),
                    node_correction: self.gaps.correction(slot) as i16,
                    gap_size: 0,
                    single: true,
                });
                extendable_by_single = true;
            }
        }

        for &jump in self.gaps.pairs() {
            let target = partial.node_value + jump;
            if self.skips_super_node(partial.node_value, target)
                || target >= self.graph_len()
                || target > self.termination.max_last_node
            {
                continue;
            }
            if self.graph.node[target as usize] == 0 {
                continue;
            }
            // A pair that decomposes into a found single extension plus
            // another residue would cover the same path twice
            let covered = extensions.iter().filter(|e| e.single).any(|single| {
                self.gaps
                    .matches_single(jump - single.mass, self.scaled.fragment_err)
            });
            if covered {
                continue;
            }
            extensions.push(self.score_pair_extension(
                partial.node_value,
                jump,
                i32::from(self.graph.node[target as usize]),
                extendable_by_single,
            ));
        }

        extensions
    }

    /// Score a two-residue gap by what its endpoints are
    fn score_pair_extension(
        &self,
        start: i32,
        jump: i32,
        node_score: i32,
        extendable_by_single: bool,
    ) -> Extension {
        let end = start + jump;
        let one_edge_n = !extendable_by_single;
        let one_edge_c = self.one_edge_nodes.binary_search(&end).is_ok();

        let proline = self.gaps.single(index::P);
        let proline_possible = proline != 0
            && self
                .gaps
                .matches_single(jump - proline, self.scaled.fragment_err);

        // For doubly charged precursors a gap spanning the precursor m/z is
        // excused: both flanking fragments hide under the precursor
        let mut precursor_region = false;
        if self.parameters.charge_state == 2 {
            let precursor = self
                .scaled
                .precursor_mz(self.parameters.charge_state, self.scale.hydrogen());
            let low = precursor - 2.0 * self.scaled.fragment_err;
            let high = precursor + 2.0 * self.scaled.fragment_err + 0.5;
            let glycine = self.scale.residue_masses[index::G];
            if f64::from(start + glycine) <= precursor && f64::from(end - glycine) >= precursor {
                let entry_ok = self.gaps.singles().iter().any(|&g| {
                    g != 0 && f64::from(start + g) >= low && f64::from(start + g) <= high
                });
                let exit_ok = self.gaps.singles().iter().any(|&g| {
                    g != 0 && f64::from(end - g) >= low && f64::from(end - g) <= high
                });
                precursor_region = entry_ok && exit_ok;
            }
        }

        let (multiplier, gap_size) = if one_edge_c && one_edge_n {
            // Joining two dead ends is what one-edge nodes are for
            (EDGE_EDGE_PENALTY, 0)
        } else if proline_possible && self.parameters.fragmentation.is_tryptic() {
            (PROLINE_PENALTY, 0)
        } else if precursor_region {
            (PRECURSOR_PENALTY, 1)
        } else if one_edge_c || one_edge_n {
            (NODE_EDGE_PENALTY, 1)
        } else {
            (NODE_NODE_PENALTY, 1)
        };

        Extension {
            mass: jump,
            score: (f64::from(node_score) * multiplier) as i32,
            node_correction: 0,
            gap_size,
            single: false,
        }
    }

    /// Singles before pairs, descending score within each; keep the top
    /// `maxExtNum` over the relative threshold plus ties with the last kept
    fn prune(&self, mut extensions: Vec<Extension>) -> Vec<Extension> {
        let best = extensions.iter().map(|e| e.score).max().unwrap_or(0);
        let mut threshold = (f64::from(best) * self.parameters.ext_thresh) as i32;
        if self.parameters.tag.is_some() && best > 100 {
            threshold = 0;
        }

        extensions.sort_by(|a, b| {
            b.single
                .cmp(&a.single)
                .then_with(|| b.score.cmp(&a.score))
        });

        let mut kept: Vec<Extension> = Vec::new();
        for extension in &extensions {
            if extension.score < threshold {
                continue;
            }
            if kept.len() < self.parameters.max_ext_num {
                kept.push(*extension);
            } else if kept
                .last()
                .is_some_and(|last| last.score == extension.score)
                && kept.len() < self.top_seq_num
            {
                kept.push(*extension);
            }
        }
        kept
    }

    /// Apply the surviving extensions to one beam entry: promote finished
    /// sequences, keep the rest in the new beam
    fn store(
        &mut self,
        partial: &PartialSequence,
        extensions: &[Extension],
        next_beam: &mut Vec<PartialSequence>,
    ) {
        for extension in extensions {
            if partial.residues.len() >= MAX_PEPTIDE_LENGTH {
                return;
            }
            let mut residues = partial.residues.clone();
            residues.push(extension.mass);
            let mut score = partial.score + extension.score;
            let gap_count = partial.gap_count + extension.gap_size;
            let mut node_value = partial.node_value + extension.mass;

            // Carry the accumulated first-decimal residual into the mass
            let mut node_correction = partial.node_correction + extension.node_correction;
            if node_correction >= 10 {
                node_correction -= 10;
                node_value += 1;
            } else if node_correction <= -10 {
                node_correction += 10;
                node_value -= 1;
            }

            // A known cleavage residue can finish the sequence even without
            // a y1 ion
            for &(mass, band_low, band_high) in &self.termination.terminal_residues {
                if node_value >= band_low && node_value <= band_high {
                    score +=
                        i32::from(self.graph.node[self.termination.max_last_node as usize]);
                    residues.push(mass);
                    node_value += mass;
                    break;
                }
            }

            if node_value >= self.termination.min_last_node
                && node_value <= self.termination.max_last_node
            {
                // Landed on a C-terminal node: a completion attempt, and the
                // end of this line either way
                if gap_count <= self.parameters.max_gap_num
                    && self.correct_mass(&residues)
                {
                    let length_adjuster = f64::from(node_value)
                        / f64::from(self.scale.av_residue)
                        / residues.len() as f64;
                    let final_seq_num = self.final_seq_num;
                    insert_ranked(
                        &mut self.completed,
                        Candidate {
                            residues,
                            score: f64::from(score) * length_adjuster,
                            node_value,
                            node_correction,
                            gap_count,
                        },
                        final_seq_num,
                        |c| c.score,
                    );
                }
            } else if node_value < self.termination.min_last_node
                && gap_count <= self.parameters.max_gap_num
            {
                let top_seq_num = self.top_seq_num;
                insert_ranked(
                    next_beam,
                    PartialSequence {
                        residues,
                        score,
                        node_value,
                        node_correction,
                        gap_count,
                    },
                    top_seq_num,
                    |p| f64::from(p.score),
                );
            }
        }
    }

    /// The promotion checks: peptide mass within tolerance after the
    /// average/monoisotopic correction, the tag along the mass axis, and
    /// every present residue witnessed
    fn correct_mass(&self, residues: &[i32]) -> bool {
        let mass: i32 = residues.iter().sum();
        let calc =
            self.scaled.modified_n_term + self.scaled.modified_c_term + f64::from(mass);
        let calc = self.scale.mono_to_av(calc, self.scaled.mono_to_av);
        if (calc - self.scaled.peptide_mw).abs() > self.scaled.peptide_err {
            return false;
        }

        if self.parameters.tag.is_some() {
            let target = self.scaled.tag_n_mass;
            let tolerance = self.scaled.fragment_err;
            let mut n_mass = self.scaled.modified_n_term;
            let mut on_axis = (n_mass - target).abs() <= tolerance;
            if !on_axis {
                for &residue in residues {
                    n_mass += f64::from(residue);
                    if n_mass >= target - tolerance {
                        on_axis = n_mass <= target + tolerance;
                        break;
                    }
                }
            }
            if !on_axis {
                return false;
            }
        }

        'present: for &required in &self.present_masses {
            // A single step
            if residues.contains(&required) {
                continue;
            }
            // Inside a two-residue gap
            for &step in residues {
                if !self.gaps.is_single(step)
                    && self
                        .gaps
                        .matches_single(step - required, self.scaled.fragment_err)
                {
                    continue 'present;
                }
            }
            // Inside the tag
            if let Some(tag) = &self.parameters.tag {
                for &code in &tag.sequence {
                    if self.gaps.single_for_code(self.residues, code) == Some(required) {
                        continue 'present;
                    }
                }
            }
            return false;
        }
        true
    }
}

/// Reinsert an excised sequence tag into a completed candidate's residue
/// vector, at the prefix position whose cumulative mass hits the tag's
/// N-terminal mass
pub fn reinsert_tag(
    candidate: &mut Candidate,
    tag_masses: &[i32],
    scaled: &ScaledParams,
) {
    let target = scaled.tag_n_mass;
    let tolerance = scaled.fragment_err;
    let mut n_mass = scaled.modified_n_term;
    let mut position = 0;
    if (n_mass - target).abs() > tolerance {
        for (i, &residue) in candidate.residues.iter().enumerate() {
            n_mass += f64::from(residue);
            position = i + 1;
            if n_mass >= target - tolerance && n_mass <= target + tolerance {
                break;
            }
        }
    }
    for (offset, &mass) in tag_masses.iter().enumerate() {
        candidate.residues.insert(position + offset, mass);
    }
    candidate.node_value += tag_masses.iter().sum::<i32>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::residue::ResidueTable;

    #[test]
    fn ranked_insert_keeps_descending_order_and_cap() {
        let mut list: Vec<i32> = Vec::new();
        for value in [5, 9, 1, 7, 3, 8] {
            insert_ranked(&mut list, value, 4, |&v| f64::from(v));
        }
        assert_eq!(list, vec![9, 8, 7, 5]);
        // A value worse than the worst is discarded when full
        insert_ranked(&mut list, 2, 4, |&v| f64::from(v));
        assert_eq!(list, vec![9, 8, 7, 5]);
    }

    /// Build a context where peptide AGK (M = 274.176) has full b-ion
    /// coverage, then check the enumerator recovers it
    fn agk_context() -> (
        SpectrumGraph,
        Parameters,
        MassScale,
        ScaledParams,
        GapList,
        Vec<i32>,
    ) {
        let parameters = Parameters {
            peptide_mw: 274.176,
            charge_state: 1,
            max_gap_num: 1,
            ..Parameters::default()
        };
        let residues = ResidueTable::default();
        let scale = MassScale::new(parameters.fragment_err, parameters.peptide_mw, 0, &residues);
        let scaled = ScaledParams::new(&parameters, &scale);
        let gaps = GapList::new(&residues, &scale, &scaled, &parameters);

        let mut graph = SpectrumGraph {
            evidence_n: vec![0; scale.graph_length],
            evidence_c: vec![0; scale.graph_length],
            node: vec![0; scale.graph_length],
        };
        // Hand-scored nodes: N-term, b1 (A), b2 (AG), C-terminal band
        let ala = scale.residue_masses[index::A];
        let gly = scale.residue_masses[index::G];
        let lys = scale.residue_masses[index::K];
        let n_term = (scaled.modified_n_term + 0.5) as i32;
        graph.node[n_term as usize] = 20;
        graph.node[(n_term + ala) as usize] = 30;
        graph.node[(n_term + ala + gly) as usize] = 30;
        let c_node = n_term + ala + gly + lys;
        for i in c_node - 2..=c_node + 2 {
            graph.node[i as usize] = 20;
        }
        (graph, parameters, scale, scaled, gaps, Vec::new())
    }

    #[test]
    fn enumerates_a_fully_supported_peptide() {
        let (mut graph, parameters, scale, scaled, gaps, one_edge) = agk_context();
        let candidates = enumerate(
            &mut graph,
            &parameters,
            &scaled,
            &scale,
            &gaps,
            &ResidueTable::default(),
            &one_edge,
        );
        assert!(!candidates.is_empty(), "AGK must be recoverable");

        let ala = scale.residue_masses[index::A];
        let gly = scale.residue_masses[index::G];
        let lys = scale.residue_masses[index::K];
        let expected = vec![ala, gly, lys];
        assert!(
            candidates.iter().any(|c| c.residues == expected),
            "expected A-G-K among {:?}",
            candidates.iter().map(|c| &c.residues).collect::<Vec<_>>()
        );
    }

    #[test]
    fn beam_results_are_sorted_descending() {
        let (mut graph, parameters, scale, scaled, gaps, one_edge) = agk_context();
        let candidates = enumerate(
            &mut graph,
            &parameters,
            &scaled,
            &scale,
            &gaps,
            &ResidueTable::default(),
            &one_edge,
        );
        for window in candidates.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
    }

    #[test]
    fn gap_count_counts_two_residue_steps() {
        // Remove the b2 node: AGK is only reachable with A + [GK] gap or
        // [AG] + K gap
        let (mut graph, parameters, scale, scaled, gaps, one_edge) = agk_context();
        let n_term = (scaled.modified_n_term + 0.5) as i32;
        let ala = scale.residue_masses[index::A];
        let gly = scale.residue_masses[index::G];
        graph.node[(n_term + ala + gly) as usize] = 0;
        let candidates = enumerate(
            &mut graph,
            &parameters,
            &scaled,
            &scale,
            &gaps,
            &ResidueTable::default(),
            &one_edge,
        );
        for candidate in &candidates {
            let pairs = candidate
                .residues
                .iter()
                .filter(|&&r| !gaps.is_single(r))
                .count();
            // The seed step is exempt from gap accounting
            let counted = candidate
                .residues
                .iter()
                .skip(1)
                .filter(|&&r| !gaps.is_single(r))
                .count();
            assert!(candidate.gap_count as usize <= pairs);
            assert_eq!(candidate.gap_count as usize, counted.min(pairs));
        }
    }

    #[test]
    fn completion_mass_is_within_tolerance() {
        let (mut graph, parameters, scale, scaled, gaps, one_edge) = agk_context();
        let candidates = enumerate(
            &mut graph,
            &parameters,
            &scaled,
            &scale,
            &gaps,
            &ResidueTable::default(),
            &one_edge,
        );
        for candidate in &candidates {
            let mass: i32 = candidate.residues.iter().sum();
            let calc = scaled.modified_n_term + scaled.modified_c_term + f64::from(mass);
            let calc = scale.mono_to_av(calc, scaled.mono_to_av);
            assert!((calc - scaled.peptide_mw).abs() <= scaled.peptide_err);
        }
    }

    #[test]
    fn tag_reinsertion_restores_the_mass() {
        let mut candidate = Candidate {
            residues: vec![710, 1280],
            score: 10.0,
            node_value: 10 + 710 + 1280,
            node_correction: 0,
            gap_count: 0,
        };
        let scaled = ScaledParams {
            peptide_mw: 0.0,
            peptide_err: 5.0,
            fragment_err: 5.0,
            qtof_err: 0.0,
            ion_offset: 0.0,
            cys_mw: 0.0,
            tag_n_mass: 720.0,
            tag_c_mass: 0.0,
            peak_width: 0.0,
            modified_n_term: 10.0,
            modified_c_term: 170.0,
            mono_to_av: 18000.0,
        };
        reinsert_tag(&mut candidate, &[570, 990], &scaled);
        assert_eq!(candidate.residues, vec![710, 570, 990, 1280]);
        assert_eq!(candidate.node_value, 2000 + 570 + 990);
    }
}
