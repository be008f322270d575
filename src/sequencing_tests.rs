//! End-to-end sequencing runs on synthetic spectra built from theoretical
//! fragment masses.

use crate::config::Parameters;
use crate::engine::Engine;
use crate::masses;
use crate::report::render_sequence;
use crate::residue::ResidueTable;
use crate::spectrum::{Peak, Spectrum};

fn spectrum_of(peaks: &[(f64, f64)]) -> Spectrum {
    let mut spectrum = Spectrum {
        source: "synthetic".to_string(),
        ..Spectrum::default()
    };
    spectrum.extend(peaks.iter().map(|&(mz, intensity)| Peak::new(mz, intensity)));
    spectrum
}

/// Neutral peptide mass for a sequence of canonical one letter codes, with
/// an optional cysteine replacement mass
fn peptide_mass(sequence: &str, cys_mw: f64) -> f64 {
    let table = ResidueTable::default();
    sequence
        .chars()
        .map(|code| {
            if code == 'C' && cys_mw != 0.0 {
                cys_mw
            } else {
                table.get(table.index_of(code).unwrap()).monoisotopic
            }
        })
        .sum::<f64>()
        + masses::WATER
}

/// Singly charged b and y ions for a peptide, skipping b1 (rarely observed
/// and vetoed by the low-mass filter anyway)
fn b_y_ions(sequence: &str, cys_mw: f64) -> Vec<(f64, f64)> {
    let table = ResidueTable::default();
    let residue_masses: Vec<f64> = sequence
        .chars()
        .map(|code| {
            if code == 'C' && cys_mw != 0.0 {
                cys_mw
            } else {
                table.get(table.index_of(code).unwrap()).monoisotopic
            }
        })
        .collect();
    let mut peaks = Vec::new();
    let mut b = masses::HYDROGEN;
    for (i, &mass) in residue_masses.iter().enumerate().take(residue_masses.len() - 1) {
        b += mass;
        if i > 0 {
            peaks.push((b, 60.0));
        }
        let y: f64 = residue_masses[i + 1..].iter().sum::<f64>()
            + masses::WATER
            + masses::HYDROGEN;
        peaks.push((y, 80.0));
    }
    peaks
}

fn base_parameters(peptide_mw: f64) -> Parameters {
    Parameters {
        peptide_mw,
        charge_state: 1,
        fragment_err: 0.5,
        peptide_err: 0.75,
        ion_threshold: 0.0,
        max_gap_num: 1,
        ..Parameters::default()
    }
}

fn top_sequence(parameters: Parameters, peaks: &[(f64, f64)]) -> (String, crate::scoring::ScoredSequence) {
    let mut engine = Engine::new(parameters).unwrap();
    let report = engine.run(spectrum_of(peaks)).unwrap();
    let top = report.candidates.first().expect("no candidates").clone();
    (render_sequence(&top.steps, engine.residues()), top)
}

#[test]
fn recovers_a_synthetic_dipeptide() {
    // Dipeptide AR at +1, tryptic, 0.5 Da tolerance: b1 at 72, y1 at 175
    let mass = peptide_mass("AR", 0.0);
    let (sequence, top) = top_sequence(
        base_parameters(mass),
        &[(72.044, 80.0), (175.119, 100.0)],
    );
    assert_eq!(sequence, "AR");
    assert!(top.intensity_score >= 0.8, "intensity {}", top.intensity_score);
}

#[test]
fn recovers_agck_with_reduced_cysteine() {
    let mass = peptide_mass("AGCK", 0.0);
    let peaks = b_y_ions("AGCK", 0.0);
    let (sequence, top) = top_sequence(base_parameters(mass), &peaks);
    assert_eq!(sequence, "AGCK");
    assert!(top.xcorr >= 0.3, "cross-correlation {}", top.xcorr);
    assert!(top.probability_score > 0.0, "probability {}", top.probability_score);
}

#[test]
fn modified_cysteine_outscores_the_unmodified_masses() {
    // The same peptide alkylated: the modified run must match the modified
    // spectrum better than the unmodified residue masses would
    let cys = 160.031;
    let mass = peptide_mass("AGCK", cys);
    let peaks = b_y_ions("AGCK", cys);
    let parameters = Parameters {
        cys_mw: cys,
        ..base_parameters(mass)
    };
    let (sequence, top) = top_sequence(parameters.clone(), &peaks);
    assert_eq!(sequence, "AGCK");

    // Score the unmodified residue masses against the same spectrum
    let table = ResidueTable::default();
    let plain_steps: Vec<crate::scoring::SequenceStep> = "AGCK"
        .chars()
        .map(|code| {
            let index = table.index_of(code).unwrap();
            crate::scoring::SequenceStep {
                mass: table.get(index).monoisotopic,
                residue: Some(index),
            }
        })
        .collect();
    let mut spectrum = spectrum_of(&peaks);
    spectrum.condition(&parameters);
    let plain = crate::scoring::intensity::score_candidate(&plain_steps, &spectrum, &parameters);
    assert!(
        top.intensity_score > plain.score,
        "modified {} vs unmodified {}",
        top.intensity_score,
        plain.score
    );
}

#[test]
fn absent_residue_constraint_excludes_tryptophan() {
    // AWK fully supported: unconstrained the top candidate contains W, with
    // W declared absent the best W-free candidate takes over
    let mass = peptide_mass("AWK", 0.0);
    let peaks = b_y_ions("AWK", 0.0);

    let (unconstrained, _) = top_sequence(base_parameters(mass), &peaks);
    assert!(unconstrained.contains('W'), "unconstrained top {unconstrained}");

    let constrained_parameters = Parameters {
        absent_residues: vec!['W'],
        ..base_parameters(mass)
    };
    let (constrained, _) = top_sequence(constrained_parameters, &peaks);
    assert!(!constrained.contains('W'), "constrained top {constrained}");
    assert!(constrained.starts_with('A') || constrained.starts_with('['));
}

#[test]
fn sequence_tag_is_excised_and_restored() {
    // KAELR with the tag "EL" bracketed by y1 and y3: the tag region is
    // excised during enumeration and the reported candidate carries EL
    // contiguously at the right mass
    let mass = peptide_mass("KAELR", 0.0);
    let table = ResidueTable::default();
    let arg = table.get(table.index_of('R').unwrap()).monoisotopic;
    let leu = table.get(table.index_of('L').unwrap()).monoisotopic;
    let glu = table.get(table.index_of('E').unwrap()).monoisotopic;
    let y1 = arg + masses::WATER + masses::HYDROGEN;
    let y3 = glu + leu + y1;

    let parameters = Parameters {
        tag_low_y: y1,
        tag_entry: "LE".to_string(), // entered low→high mass, i.e. C→N
        tag_high_y: y3,
        ..base_parameters(mass)
    };
    let peaks = b_y_ions("KAELR", 0.0);
    let (sequence, _) = top_sequence(parameters, &peaks);
    assert!(
        sequence.contains("EL"),
        "tag must appear contiguously, got {sequence}"
    );
}

#[test]
fn scrambled_masses_score_below_the_true_mass() {
    // Ten off-mass runs: the null distribution must sit below the
    // true-mass best candidate
    let mass = peptide_mass("AGCK", 0.0);
    let peaks = b_y_ions("AGCK", 0.0);
    let parameters = Parameters {
        wrong_seq_num: 10,
        ..base_parameters(mass)
    };
    let mut engine = Engine::new(parameters).unwrap();
    let report = engine.run(spectrum_of(&peaks)).unwrap();
    let top = report.candidates.first().expect("no candidates");
    let null = report.null.expect("no null distribution");
    assert_eq!(null.count, 10);
    assert!(
        null.mean < top.combined,
        "null mean {} vs best {}",
        null.mean,
        top.combined
    );
}

#[test]
fn one_edge_nodes_hold_their_invariants_end_to_end() {
    use crate::gaps::GapList;
    use crate::graph::SpectrumGraph;
    use crate::scale::{MassScale, ScaledParams};
    use crate::summed::summed_node_score;
    use crate::weights::IonWeights;

    let mass = peptide_mass("AGCK", 0.0);
    let parameters = base_parameters(mass);
    let residues = ResidueTable::default();
    let scale = MassScale::new(parameters.fragment_err, mass, 0, &residues);
    let mut scaled = ScaledParams::new(&parameters, &scale);
    let gaps = GapList::new(&residues, &scale, &scaled, &parameters);
    let weights = IonWeights::for_template(parameters.fragmentation);

    let mut spectrum = spectrum_of(&b_y_ions("AGCK", 0.0));
    spectrum.condition(&parameters);
    let mut graph = SpectrumGraph::build(
        &spectrum, &parameters, &mut scaled, &scale, &gaps, &residues, &weights, None,
    )
    .unwrap();
    let one_edge = summed_node_score(&mut graph, &parameters, &scaled, &scale, &gaps, weights.total());

    // Ascending, unique, none extensible by a single residue
    for window in one_edge.windows(2) {
        assert!(window[0] < window[1]);
    }
    for &node in &one_edge {
        for &jump in gaps.singles() {
            if jump == 0 {
                continue;
            }
            let below = node - jump;
            if below > 0 {
                assert!(
                    graph.evidence_n[below as usize] == 0
                        && graph.evidence_c[below as usize] == 0,
                    "one-edge node {node} extends by {jump}"
                );
            }
        }
    }
}
