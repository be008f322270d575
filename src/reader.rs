//! Readers for the supported peak list formats.
//!
//! Every reader produces the same normalized [`Spectrum`]; the engine never
//! sees the format again. Three text forms are supported: a bare
//! tab/space-delimited m/z–intensity list, DTA-style files whose first line
//! carries `(M+H)+ charge`, and ion-trap text with an embedded precursor
//! header line.

use std::path::Path;

use crate::error::{Context, CustomError};
use crate::masses;
use crate::spectrum::{Peak, Spectrum};

/// Read a spectrum from a file, sniffing the format from the first
/// non-empty line.
///
/// # Errors
/// When the file cannot be read or a peak line does not parse.
pub fn open(path: &Path, ion_offset: f64) -> Result<Spectrum, CustomError> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        CustomError::error(
            "Cannot open spectrum file",
            err,
            Context::show(path.display()),
        )
    })?;
    let source = path.display().to_string();
    parse(&content, &source, ion_offset)
}

/// Parse spectrum text. Exposed separately so tests and callers with
/// in-memory data skip the filesystem.
///
/// # Errors
/// When a line does not parse as its detected format.
pub fn parse(content: &str, source: &str, ion_offset: f64) -> Result<Spectrum, CustomError> {
    let mut spectrum = Spectrum {
        source: source.to_string(),
        ..Spectrum::default()
    };

    let mut peaks = Vec::new();
    let mut saw_header = false;
    for (line_index, raw_line) in content.lines().enumerate() {
        let line_number = line_index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        // An ion-trap style precursor header: `precursor m/z, charge`
        if let Some(rest) = line.strip_prefix("precursor") {
            let fields: Vec<&str> = rest
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|f| !f.is_empty())
                .collect();
            if fields.len() < 2 {
                return Err(CustomError::warning(
                    "Invalid precursor header",
                    "A precursor header holds the precursor m/z and the charge",
                    Context::full_line(line_number, raw_line),
                ));
            }
            let mz: f64 = parse_number(fields[0], line_number, raw_line)?;
            let charge: i32 = fields[1].trim().parse().map_err(|_| {
                CustomError::warning(
                    "Invalid precursor header",
                    "The precursor charge is not an integer",
                    Context::full_line(line_number, raw_line),
                )
            })?;
            spectrum.precursor_mz = Some(mz);
            spectrum.precursor_charge = Some(charge);
            spectrum.ion_trap_header = true;
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(CustomError::warning(
                "Invalid peak line",
                "A peak line holds an m/z value and an intensity",
                Context::full_line(line_number, raw_line),
            ));
        }
        let first: f64 = parse_number(fields[0], line_number, raw_line)?;
        let second: f64 = parse_number(fields[1], line_number, raw_line)?;

        // DTA convention: the first data line is `(M+H)+ charge`, marked by
        // an integral second field on the very first line
        if !saw_header && peaks.is_empty() && spectrum.precursor_mz.is_none() {
            saw_header = true;
            let charge = second as i32;
            if f64::from(charge) == second && (1..=9).contains(&charge) && first > 100.0 {
                // DTA carries (M+H) regardless of charge
                let neutral = first - masses::HYDROGEN;
                spectrum.precursor_charge = Some(charge);
                spectrum.precursor_mz =
                    Some((neutral + f64::from(charge) * masses::HYDROGEN) / f64::from(charge));
                continue;
            }
        }

        peaks.push(Peak::new(first + ion_offset, second));
    }

    spectrum.extend(peaks);
    Ok(spectrum)
}

fn parse_number(field: &str, line_number: usize, line: &str) -> Result<f64, CustomError> {
    field.trim().parse().map_err(|_| {
        CustomError::warning(
            "Invalid number",
            format!("'{field}' is not a number"),
            Context::full_line(line_number, line),
        )
    })
}

/// The neutral peptide mass implied by a spectrum header, if any
pub fn neutral_mass(spectrum: &Spectrum) -> Option<f64> {
    let mz = spectrum.precursor_mz?;
    let charge = f64::from(spectrum.precursor_charge.unwrap_or(1));
    Some(mz * charge - charge * masses::HYDROGEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_delimited() {
        let spectrum = parse("100.0\t50\n200.0\t25\n", "test", 0.0).unwrap();
        assert_eq!(spectrum.len(), 2);
        assert!(spectrum.precursor_mz.is_none());
    }

    #[test]
    fn dta_header_is_consumed() {
        let spectrum = parse("246.157 1\n72.04 30\n175.12 70\n", "test", 0.0).unwrap();
        assert_eq!(spectrum.len(), 2);
        assert_eq!(spectrum.precursor_charge, Some(1));
        let neutral = neutral_mass(&spectrum).unwrap();
        assert!((neutral - 245.149).abs() < 0.01);
    }

    #[test]
    fn ion_trap_header_flags_the_spectrum() {
        let spectrum = parse("precursor 750.5, 2\n100.0 10\n", "test", 0.0).unwrap();
        assert!(spectrum.ion_trap_header);
        assert_eq!(spectrum.precursor_charge, Some(2));
        assert_eq!(spectrum.len(), 1);
    }

    #[test]
    fn offset_is_applied() {
        let spectrum = parse("100.0 10\n", "test", 0.5).unwrap();
        assert!((spectrum[0].mz.value - 100.5).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_line_is_an_error() {
        assert!(parse("100.0\n", "test", 0.0).is_err());
        assert!(parse("abc def\n", "test", 0.0).is_err());
    }
}
