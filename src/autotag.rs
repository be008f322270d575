//! The automatic sequence-tag finder.
//!
//! Multiply charged tryptic spectra usually show a clean ladder of singly
//! charged y ions above the precursor m/z. Peak pairs up there that differ
//! by exactly one residue mass are read as a fragment of sequence, and the
//! summed-node scores they support are boosted so enumeration prefers paths
//! consistent with the ladder. Peaks with a stronger partner 28 u below are
//! skipped: an a/b pair marks an N-terminal ion, not a y.

use crate::config::Parameters;
use crate::gaps::GapList;
use crate::graph::SpectrumGraph;
use crate::scale::{MassScale, ScaledParams};
use crate::spectrum::Spectrum;

/// Ladder-supported nodes get their summed score multiplied by this
const TAG_BOOST: i32 = 2;

/// Boost `graph.node` along y-ion ladders found above the precursor m/z.
/// Returns the number of ladder edges found.
pub fn apply_auto_tag(
    graph: &mut SpectrumGraph,
    spectrum: &Spectrum,
    parameters: &Parameters,
    scaled: &ScaledParams,
    scale: &MassScale,
    gaps: &GapList,
) -> usize {
    let tolerance = scaled.fragment_err;
    let hydrogen = f64::from(scale.hydrogen());
    let precursor = scaled.precursor_mz(parameters.charge_state, scale.hydrogen());
    let co = f64::from(scale.co);

    // The singly charged y candidates above the precursor
    let mut candidates: Vec<f64> = Vec::new();
    for (index, peak) in spectrum.peaks().iter().enumerate() {
        let mz = f64::from(scale.scaled(peak.mz.value));
        if mz <= precursor + tolerance {
            continue;
        }
        // An intense partner CO below marks a b ion with its a ion; the
        // higher mass member of such a pair is the b
        let a_partner = spectrum.peaks()[..index]
            .iter()
            .rev()
            .map(|p| (f64::from(scale.scaled(p.mz.value)), *p.intensity))
            .take_while(|&(partner, _)| partner > mz - co - tolerance * 2.0)
            .any(|(partner, intensity)| {
                (partner - (mz - co)).abs() <= tolerance && intensity < *peak.intensity
            });
        if !a_partner {
            candidates.push(mz);
        }
    }

    // Pairs one residue apart form the ladder; boost the b-axis nodes of
    // both ends
    let peptide = scale.av_to_mono(scaled.peptide_mw, scaled.mono_to_av);
    let mut edges = 0;
    for (i, &low) in candidates.iter().enumerate() {
        for &high in &candidates[i + 1..] {
            let difference = (high - low + 0.5) as i32;
            if !gaps.matches_single(difference, tolerance) {
                continue;
            }
            edges += 1;
            for y in [low, high] {
                let node = peptide - y + 2.0 * hydrogen;
                let (lo, hi) = scale.window(node, tolerance);
                for position in lo.max(0)..=hi {
                    let slot = position as usize;
                    if slot >= graph.node.len() {
                        break;
                    }
                    if graph.node[slot] > 0 {
                        graph.node[slot] =
                            (i32::from(graph.node[slot]) * TAG_BOOST).min(127) as i8;
                    }
                }
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parameters;
    use crate::residue::ResidueTable;
    use crate::spectrum::Peak;

    fn context() -> (Parameters, MassScale, ScaledParams, GapList) {
        let parameters = Parameters {
            peptide_mw: 1000.0,
            charge_state: 2,
            ..Parameters::default()
        };
        let residues = ResidueTable::default();
        let scale = MassScale::new(parameters.fragment_err, 1000.0, 0, &residues);
        let scaled = ScaledParams::new(&parameters, &scale);
        let gaps = GapList::new(&residues, &scale, &scaled, &parameters);
        (parameters, scale, scaled, gaps)
    }

    fn empty_graph(scale: &MassScale) -> SpectrumGraph {
        SpectrumGraph {
            evidence_n: vec![0; scale.graph_length],
            evidence_c: vec![0; scale.graph_length],
            node: vec![0; scale.graph_length],
        }
    }

    #[test]
    fn ladder_above_the_precursor_boosts_nodes() {
        let (parameters, scale, scaled, gaps) = context();
        let mut graph = empty_graph(&scale);

        // Precursor m/z ≈ 501; two y ions above it one alanine apart
        let mut spectrum = Spectrum::default();
        spectrum.extend([Peak::new(600.0, 50.0), Peak::new(671.037, 60.0)]);

        // Their b-axis nodes, pre-scored by the summed stage
        let peptide = scaled.peptide_mw;
        let node_low = (peptide - 6710.37 + 20.0 + 0.5) as usize;
        let node_high = (peptide - 6000.0 + 20.0 + 0.5) as usize;
        graph.node[node_low] = 10;
        graph.node[node_high] = 12;

        let edges = apply_auto_tag(&mut graph, &spectrum, &parameters, &scaled, &scale, &gaps);
        assert_eq!(edges, 1);
        assert_eq!(graph.node[node_low], 20);
        assert_eq!(graph.node[node_high], 24);
    }

    #[test]
    fn peaks_below_the_precursor_are_ignored() {
        let (parameters, scale, scaled, gaps) = context();
        let mut graph = empty_graph(&scale);
        let mut spectrum = Spectrum::default();
        spectrum.extend([Peak::new(200.0, 50.0), Peak::new(271.037, 60.0)]);
        let edges = apply_auto_tag(&mut graph, &spectrum, &parameters, &scaled, &scale, &gaps);
        assert_eq!(edges, 0);
    }

    #[test]
    fn a_b_pairs_are_not_read_as_y_ions() {
        let (parameters, scale, scaled, gaps) = context();
        let mut graph = empty_graph(&scale);
        // 628 has a weaker partner exactly CO below (an a/b signature), so
        // it is read as a b ion and excluded; no ladder pair remains
        let mut spectrum = Spectrum::default();
        spectrum.extend([
            Peak::new(600.005, 30.0),
            Peak::new(628.0, 50.0),
            Peak::new(780.0, 60.0),
        ]);
        let edges = apply_auto_tag(&mut graph, &spectrum, &parameters, &scaled, &scale, &gaps);
        assert_eq!(edges, 0);
    }
}
