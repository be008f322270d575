//! De novo peptide sequencing from tandem mass spectra.
//!
//! One MS/MS spectrum of a single peptide, together with its precursor mass
//! and charge, goes in; a ranked list of candidate amino acid sequences
//! consistent with that spectrum comes out. The pipeline: project fragment
//! peaks into a scored mass graph, sum node evidence reachable from the
//! C-terminus, enumerate candidate subsequences by bounded best-first
//! extension, and rank completed candidates by intensity coverage, a
//! probability score, and FFT cross-correlation.
//!
//! ```no_run
//! use denovo::{Engine, Parameters};
//!
//! let parameters = Parameters::from_file("run.params".as_ref())?;
//! let mut engine = Engine::new(parameters)?;
//! let spectrum = denovo::reader::open("peptide.dta".as_ref(), 0.0)?;
//! let report = engine.run(spectrum)?;
//! println!("{}", report.render(engine.residues()));
//! # Ok::<(), denovo::CustomError>(())
//! ```

#[macro_use]
extern crate uom;

pub mod autotag;
pub mod config;
pub mod edman;
mod error;
pub mod gaps;
pub mod graph;
pub mod masses;
pub mod precursor;
pub mod reader;
pub mod report;
pub mod residue;
pub mod scale;
pub mod scoring;
pub mod spectrum;
pub mod subseq;
pub mod summed;
pub mod system;
pub mod weights;

mod engine;

#[cfg(test)]
mod sequencing_tests;

pub use config::{FragmentationSpec, Parameters, Proteolysis};
pub use engine::Engine;
pub use error::{Context, CustomError};
pub use report::Report;
pub use residue::ResidueTable;
pub use spectrum::{Peak, Spectrum};
