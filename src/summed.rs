//! The summed-node scorer: connect graph nodes backward from the
//! C-terminus.
//!
//! Walking down from each C-terminal seed by residue-mass jumps, every
//! reachable node gets a bonus-weighted score written into `node`; nodes
//! that connect to the C-terminus but cannot be extended any further toward
//! the N-terminus are collected as one-edge nodes, the bridge targets for
//! two-residue gaps during forward enumeration.

use crate::config::{FragmentationSpec, Parameters, Proteolysis};
use crate::gaps::GapList;
use crate::graph::SpectrumGraph;
use crate::residue::index;
use crate::scale::{MassScale, ScaledParams};

/// Scales the bonus for edges whose endpoints both carry two-terminal
/// evidence
const TOTALIONVAL_MULTIPLIER: f64 = 1.0;

/// Which termini contributed evidence at a node
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Terminal {
    None,
    Both,
    COnly,
    NOnly,
}

fn classify(graph: &SpectrumGraph) -> Vec<Terminal> {
    graph
        .evidence_c
        .iter()
        .zip(&graph.evidence_n)
        .map(|(&c, &n)| match (c != 0, n != 0) {
            (true, true) => Terminal::Both,
            (true, false) => Terminal::COnly,
            (false, true) => Terminal::NOnly,
            (false, false) => Terminal::None,
        })
        .collect()
}

/// Fill `graph.node` from the evidence arrays and return the ascending,
/// deduplicated one-edge node list.
pub fn summed_node_score(
    graph: &mut SpectrumGraph,
    parameters: &Parameters,
    scaled: &ScaledParams,
    scale: &MassScale,
    gaps: &GapList,
    total_ion_weight: i32,
) -> Vec<i32> {
    let length = graph.len() as i32;
    let mut one_edge_nodes = Vec::new();

    // The ion-trap low-mass cutoff: roughly one third of the precursor
    let low_mass_cutoff = (scaled.peptide_mw
        + f64::from(parameters.charge_state) * f64::from(scale.hydrogen()))
        / f64::from(parameters.charge_state)
        * 0.333;

    // Super-node band when a sequence tag is active
    let (low_super, high_super) = graph.super_node_range().unwrap_or((0, length - 1));

    // Bands one Arg/Lys below the C-terminal band, for the ion-trap y2
    // compensation
    let mut i = length - 1;
    while i > 0 && graph.evidence_c[i as usize] == 0 {
        i -= 1;
    }
    let high_arg = i - gaps.single(index::R);
    let high_lys = i - gaps.single(index::K);
    while i > 0 && graph.evidence_c[i as usize] != 0 {
        i -= 1;
    }
    i += 1;
    let low_arg = i - gaps.single(index::R);
    let low_lys = i - gaps.single(index::K);

    let mut evidence = classify(graph);
    // Super-node markers count as two-terminal evidence
    for (slot, kind) in evidence.iter_mut().enumerate() {
        if graph.evidence_c[slot] == -1 && graph.evidence_n[slot] == -1 {
            *kind = Terminal::Both;
        }
    }
    for value in &mut graph.node {
        *value = 0;
    }

    let tryptic_template = matches!(
        parameters.fragmentation,
        FragmentationSpec::TripleQuad | FragmentationSpec::QTof | FragmentationSpec::IonTrap
    );
    let y2_compensation = parameters.fragmentation == FragmentationSpec::IonTrap
        && scaled.peptide_mw > 1200.0 * f64::from(scale.multiplier)
        && parameters.proteolysis == Proteolysis::Trypsin
        && parameters.charge_state <= 2;

    // Each contiguous position of the C-terminal band is an independent seed
    let mut first_seed = true;
    let mut i = length - 1;
    while i > 0 && (first_seed || evidence[i as usize] != Terminal::None) {
        i -= 1;
        if evidence[i as usize] == Terminal::None {
            continue;
        }
        first_seed = false;
        let mut current = i;

        let seed_value = i32::from(graph.evidence_c[current as usize])
            + i32::from(graph.evidence_n[current as usize]);
        graph.node[current as usize] = seed_value.min(127) as i8;

        while current != 0 {
            let mut extended = false;

            for jump in gaps.singles() {
                if *jump == 0 {
                    continue;
                }
                let next = current - jump;
                if skips_super_node(current, next, low_super, high_super) {
                    continue;
                }
                if next >= 0 && evidence[next as usize] != Terminal::None {
                    extended = true;
                    assign_node_value(
                        graph,
                        &evidence,
                        next,
                        current,
                        total_ion_weight,
                        scale.av_residue,
                    );
                }
            }

            // Proline fragments poorly; tryptic templates also try every
            // two-residue jump containing it
            if tryptic_template {
                let proline = gaps.single(index::P);
                for jump in gaps.singles() {
                    if *jump == 0 || proline == 0 {
                        continue;
                    }
                    let next = current - jump - proline;
                    if skips_super_node(current, next, low_super, high_super) {
                        continue;
                    }
                    if next >= 0 && evidence[next as usize] != Terminal::None {
                        extended = true;
                        assign_pro_node_value(graph, &evidence, next, current, total_ion_weight);
                    }
                }
            }

            // Ion-trap spectra above 1200 Da lose their y2 ions below the
            // one-third cutoff; allow arbitrary pairs just below Arg/Lys
            if y2_compensation
                && ((current <= high_arg && current >= low_arg)
                    || (current <= high_lys && current >= low_lys))
            {
                let singles = gaps.singles();
                for (a, &jump_a) in singles.iter().enumerate() {
                    if jump_a == 0 {
                        continue;
                    }
                    for &jump_b in &singles[a..] {
                        if jump_b == 0 {
                            continue;
                        }
                        let next = current - jump_a - jump_b;
                        if skips_super_node(current, next, low_super, high_super) {
                            continue;
                        }
                        let y2 = 147 * scale.multiplier + jump_a.min(jump_b);
                        if f64::from(y2) > low_mass_cutoff {
                            continue;
                        }
                        if next >= 0 && evidence[next as usize] != Terminal::None {
                            extended = true;
                            assign_node_value(
                                graph,
                                &evidence,
                                next,
                                current,
                                total_ion_weight,
                                scale.av_residue,
                            );
                        }
                    }
                }
            }

            if !extended {
                one_edge_nodes.push(current);
            }

            current = find_current_node(graph, current, scale.multiplier);
        }

        // Flip this seed's scores negative so the next seed can tell its own
        // connections from a previous seed's
        for value in &mut graph.node {
            if *value > 0 {
                *value = -*value;
            }
        }
    }

    for value in &mut graph.node {
        if *value < 0 {
            *value = -*value;
        }
    }

    one_edge_nodes.sort_unstable();
    one_edge_nodes.dedup();
    one_edge_nodes.retain(|&n| n > 0);

    add_extra_nodes(graph, &evidence, scaled, scale);

    // Super-nodes must survive as the -1 marker the enumerator recognises
    for slot in 0..graph.len() {
        if graph.evidence_n[slot] == -1 && graph.evidence_c[slot] == -1 {
            graph.node[slot] = -1;
        }
    }

    one_edge_nodes
}

fn skips_super_node(current: i32, next: i32, low_super: i32, high_super: i32) -> bool {
    current > high_super && next < low_super
}

/// Score a reachable node: evidence sum plus a bonus when the edge endpoints
/// corroborate each other, adjusted for the length of the jump so long gaps
/// are not overrewarded
fn assign_node_value(
    graph: &mut SpectrumGraph,
    evidence: &[Terminal],
    next: i32,
    current: i32,
    total_ion_weight: i32,
    av_residue: i32,
) {
    let adjuster = (f64::from(current - next) / f64::from(av_residue) + 99.0) / 100.0;

    let bonus_applies = evidence[next as usize] == Terminal::Both
        || evidence[current as usize] == Terminal::Both
        || evidence[next as usize] == evidence[current as usize];
    let mut score = i32::from(graph.evidence_c[next as usize])
        + i32::from(graph.evidence_n[next as usize]);
    if bonus_applies {
        score += (f64::from(total_ion_weight) * TOTALIONVAL_MULTIPLIER) as i32;
    }
    let score = (f64::from(score) * adjuster + 0.5) as i32;

    write_max(graph, next, score);
}

/// Score a proline-containing two-residue jump; only edges whose endpoints
/// both carry C-terminal (or two-terminal) evidence earn the half bonus
fn assign_pro_node_value(
    graph: &mut SpectrumGraph,
    evidence: &[Terminal],
    next: i32,
    current: i32,
    total_ion_weight: i32,
) {
    let qualifying = |t: Terminal| matches!(t, Terminal::Both | Terminal::COnly);
    let score = if qualifying(evidence[next as usize]) && qualifying(evidence[current as usize]) {
        i32::from(graph.evidence_c[next as usize])
            + i32::from(graph.evidence_n[next as usize])
            + (f64::from(total_ion_weight) * TOTALIONVAL_MULTIPLIER * 0.5) as i32
    } else {
        0
    };

    write_max(graph, next, score);
}

/// Make a previously negative (prior-seed) value positive, then keep the
/// larger of the existing and the new score, clamped to the byte range
fn write_max(graph: &mut SpectrumGraph, node: i32, score: i32) {
    let slot = node as usize;
    if graph.node[slot] < 0 {
        graph.node[slot] = -graph.node[slot];
    }
    let score = if score > 127 || score < -127 { 127 } else { score };
    if score as i8 > graph.node[slot] {
        graph.node[slot] = score as i8;
    }
}

/// The next node down that connected to the C-terminus, or 0 when the walk
/// is done. The search gives up after the largest residue plus slack.
fn find_current_node(graph: &SpectrumGraph, current: i32, multiplier: i32) -> i32 {
    let mut i = current;
    while i > 0 {
        i -= 1;
        if i < current - 190 * multiplier {
            return 0;
        }
        if graph.node[i as usize] > 0 {
            return i;
        }
    }
    0
}

/// Overlay strong but un-chainable evidence: a run of consecutive non-zero
/// evidence none of which connected to the C-terminus still contributes its
/// summed evidence, so high-tolerance data is not starved of nodes
fn add_extra_nodes(
    graph: &mut SpectrumGraph,
    evidence: &[Terminal],
    scaled: &ScaledParams,
    scale: &MassScale,
) {
    let tight_tolerance = scaled.fragment_err <= 0.5 * f64::from(scale.multiplier);
    let mut i = graph.len() as i32 - 1;
    while i >= 0 {
        if evidence[i as usize] != Terminal::None {
            // Walk down the contiguous evidence run looking for a node that
            // already connected
            let mut already_connected = false;
            let mut j = i;
            while j >= 0 && evidence[j as usize] != Terminal::None {
                if graph.node[j as usize] != 0 {
                    already_connected = true;
                }
                j -= 1;
            }
            // With tight tolerances adjacent evidence is not mass slop, so
            // the run contributes even next to a connected node
            if !already_connected || tight_tolerance {
                for k in j + 1..=i {
                    let slot = k as usize;
                    let value = (i32::from(graph.evidence_c[slot])
                        + i32::from(graph.evidence_n[slot]))
                    .clamp(-127, 127) as i8;
                    if value > graph.node[slot] {
                        graph.node[slot] = value;
                    }
                }
            }
            i = j + 1;
        }
        i -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::residue::ResidueTable;
    use crate::spectrum::{Peak, Spectrum};
    use crate::weights::IonWeights;

    /// Build a graph for peptide-like evidence placed by hand
    fn context(peptide_mw: f64) -> (Parameters, MassScale, ScaledParams, GapList, ResidueTable) {
        let parameters = Parameters {
            peptide_mw,
            charge_state: 1,
            ..Parameters::default()
        };
        let residues = ResidueTable::default();
        let scale = MassScale::new(parameters.fragment_err, peptide_mw, 0, &residues);
        let scaled = ScaledParams::new(&parameters, &scale);
        let gaps = GapList::new(&residues, &scale, &scaled, &parameters);
        (parameters, scale, scaled, gaps, residues)
    }

    fn graph_for(
        peaks: &[(f64, f64)],
        parameters: &Parameters,
        scale: &MassScale,
        scaled: &mut ScaledParams,
        gaps: &GapList,
        residues: &ResidueTable,
    ) -> SpectrumGraph {
        let mut spectrum = Spectrum::default();
        spectrum.extend(peaks.iter().map(|&(mz, intensity)| {
            let mut peak = Peak::new(mz, intensity);
            peak.normalized = intensity;
            peak
        }));
        let weights = IonWeights::for_template(parameters.fragmentation);
        SpectrumGraph::build(
            &spectrum, parameters, scaled, scale, gaps, residues, &weights, None,
        )
        .unwrap()
    }

    #[test]
    fn one_edge_nodes_are_ascending_unique_and_positive() {
        // Peptide AGK, M = 274.18: b ions at 72.04 (A), 129.07 (AG)
        let (parameters, scale, mut scaled, gaps, residues) = context(274.18);
        let mut graph = graph_for(
            &[(72.04, 50.0), (129.07, 60.0), (204.13, 40.0)],
            &parameters,
            &scale,
            &mut scaled,
            &gaps,
            &residues,
        );
        let one_edge =
            summed_node_score(&mut graph, &parameters, &scaled, &scale, &gaps, 15);
        for window in one_edge.windows(2) {
            assert!(window[0] < window[1], "one-edge nodes must be strictly ascending");
        }
        assert!(one_edge.iter().all(|&n| n > 0));
    }

    #[test]
    fn all_final_scores_are_positive() {
        let (parameters, scale, mut scaled, gaps, residues) = context(274.18);
        let mut graph = graph_for(
            &[(72.04, 50.0), (129.07, 60.0)],
            &parameters,
            &scale,
            &mut scaled,
            &gaps,
            &residues,
        );
        summed_node_score(&mut graph, &parameters, &scaled, &scale, &gaps, 15);
        assert!(graph.node.iter().all(|&v| v >= 0));
    }

    #[test]
    fn connected_nodes_outscore_strays() {
        // AGK: the AG node (129.07 b) is one Lys jump below the C-terminal
        // node and should earn the connection bonus
        let (parameters, scale, mut scaled, gaps, residues) = context(274.18);
        let mut graph = graph_for(
            &[(129.07, 60.0), (146.2, 10.0)],
            &parameters,
            &scale,
            &mut scaled,
            &gaps,
            &residues,
        );
        summed_node_score(&mut graph, &parameters, &scaled, &scale, &gaps, 15);
        let ag_node = scale.scaled(129.066) as usize;
        let window = 6;
        let best_connected = (ag_node - window..=ag_node + window)
            .map(|i| graph.node[i])
            .max()
            .unwrap();
        assert!(best_connected > 0, "the AG node must be reachable");
    }
}
