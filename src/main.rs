//! Command line entry point for the de novo sequencing engine.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use denovo::{Engine, Parameters};

#[derive(Parser, Debug)]
#[command(author, version, about = "De novo peptide sequencing from tandem mass spectra")]
struct Cli {
    /// The spectrum file (tab-delimited, DTA-style, or ion-trap text)
    #[arg()]
    spectrum: PathBuf,

    /// Parameter file
    #[arg(short = 'p', long, default_value = "denovo.params")]
    params: PathBuf,

    /// Output file (defaults to the spectrum path with extension .lut)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Ion-weight details file
    #[arg(short = 'd', long)]
    details: Option<PathBuf>,

    /// Residue table file
    #[arg(short = 'r', long)]
    residues: Option<PathBuf>,

    /// Override the precursor (neutral peptide) mass in Da
    #[arg(short = 'm', long)]
    mass: Option<f64>,

    /// Quiet: errors only
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Verbose: stage-by-stage progress
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LevelFilter::Error
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), denovo::CustomError> {
    let mut parameters = if cli.params.exists() {
        Parameters::from_file(&cli.params)?
    } else {
        Parameters::default()
    };
    if let Some(mass) = cli.mass {
        parameters.peptide_mw = mass;
    }
    if let Some(details) = &cli.details {
        parameters.details_file = Some(details.clone());
    }
    if let Some(residues) = &cli.residues {
        parameters.residue_file = Some(residues.clone());
    }

    let spectrum = denovo::reader::open(&cli.spectrum, parameters.ion_offset)?;
    let mut engine = Engine::new(parameters)?;
    let report = engine.run(spectrum)?;
    let rendered = report.render(engine.residues());

    let output = match &cli.output {
        Some(path) => Some(path.clone()),
        None => denovo::report::output_path(&cli.spectrum),
    };
    match output {
        Some(path) => std::fs::write(&path, &rendered).map_err(|err| {
            denovo::CustomError::error(
                "Cannot write output file",
                err,
                denovo::Context::show(path.display()),
            )
        })?,
        None => {
            return Err(denovo::CustomError::error(
                "Cannot pick an output file",
                "Too many old output files exist next to the spectrum; clean up or pass -o",
                denovo::Context::none(),
            ))
        }
    }
    if !cli.quiet {
        print!("{rendered}");
    }
    Ok(())
}
