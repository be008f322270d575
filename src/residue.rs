//! The amino acid residue table driving all mass arithmetic.
//!
//! Unlike a fixed enum of amino acids, the table is data: cysteine can carry
//! an alkylation mass, whole residues can be declared absent, and the table
//! can be replaced wholesale from a residues file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Context, CustomError};

/// The number of canonical residues
pub const RESIDUE_COUNT: usize = 20;

/// Canonical residue indices, in the order used throughout the engine
pub mod index {
    pub const A: usize = 0;
    pub const R: usize = 1;
    pub const N: usize = 2;
    pub const D: usize = 3;
    pub const C: usize = 4;
    pub const E: usize = 5;
    pub const Q: usize = 6;
    pub const G: usize = 7;
    pub const H: usize = 8;
    pub const I: usize = 9;
    pub const L: usize = 10;
    pub const K: usize = 11;
    pub const M: usize = 12;
    pub const F: usize = 13;
    pub const P: usize = 14;
    pub const S: usize = 15;
    pub const T: usize = 16;
    pub const W: usize = 17;
    pub const Y: usize = 18;
    pub const V: usize = 19;
}

/// A single amino acid residue
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Residue {
    /// The one letter code
    pub code: char,
    /// The monoisotopic residue mass in Da
    pub monoisotopic: f64,
    /// The average residue mass in Da
    pub average: f64,
    /// The nominal (integer) residue mass
    pub nominal: i32,
}

/// The table of residues used by a run
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ResidueTable {
    residues: Vec<Residue>,
}

impl Default for ResidueTable {
    fn default() -> Self {
        Self {
            residues: CANONICAL.to_vec(),
        }
    }
}

/// The 20 canonical residues with monoisotopic, average, and nominal masses.
/// Data source: <https://proteomicsresource.washington.edu/protocols06/masses.php>
const CANONICAL: [Residue; RESIDUE_COUNT] = [
    Residue { code: 'A', monoisotopic: 71.03711, average: 71.0788, nominal: 71 },
    Residue { code: 'R', monoisotopic: 156.10111, average: 156.1875, nominal: 156 },
    Residue { code: 'N', monoisotopic: 114.04293, average: 114.1038, nominal: 114 },
    Residue { code: 'D', monoisotopic: 115.02694, average: 115.0886, nominal: 115 },
    Residue { code: 'C', monoisotopic: 103.00919, average: 103.1388, nominal: 103 },
    Residue { code: 'E', monoisotopic: 129.04259, average: 129.1155, nominal: 129 },
    Residue { code: 'Q', monoisotopic: 128.05858, average: 128.1307, nominal: 128 },
    Residue { code: 'G', monoisotopic: 57.02146, average: 57.0519, nominal: 57 },
    Residue { code: 'H', monoisotopic: 137.05891, average: 137.1411, nominal: 137 },
    Residue { code: 'I', monoisotopic: 113.08406, average: 113.1594, nominal: 113 },
    Residue { code: 'L', monoisotopic: 113.08406, average: 113.1594, nominal: 113 },
    Residue { code: 'K', monoisotopic: 128.09496, average: 128.1741, nominal: 128 },
    Residue { code: 'M', monoisotopic: 131.04049, average: 131.1926, nominal: 131 },
    Residue { code: 'F', monoisotopic: 147.06841, average: 147.1766, nominal: 147 },
    Residue { code: 'P', monoisotopic: 97.05276, average: 97.1167, nominal: 97 },
    Residue { code: 'S', monoisotopic: 87.03203, average: 87.0782, nominal: 87 },
    Residue { code: 'T', monoisotopic: 101.04768, average: 101.1051, nominal: 101 },
    Residue { code: 'W', monoisotopic: 186.07931, average: 186.2132, nominal: 186 },
    Residue { code: 'Y', monoisotopic: 163.06333, average: 163.1760, nominal: 163 },
    Residue { code: 'V', monoisotopic: 99.06841, average: 99.1326, nominal: 99 },
];

impl ResidueTable {
    /// The residues in canonical order
    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    /// The number of residues in the table
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    /// Tests if the table is empty
    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Get a residue by index
    pub fn get(&self, index: usize) -> &Residue {
        &self.residues[index]
    }

    /// Find the index for a one letter code
    pub fn index_of(&self, code: char) -> Option<usize> {
        self.residues.iter().position(|r| r.code == code)
    }

    /// Load a residue table from a residues file. Each line holds
    /// `code monoisotopic average nominal`; lines with any zero field are
    /// skipped.
    ///
    /// # Errors
    /// When the file cannot be read or a line does not parse. Internally
    /// inconsistent rows (monoisotopic vs average off by more than 1 Da, or
    /// truncated monoisotopic differing from the nominal) produce a
    /// warning-level error.
    pub fn from_file(path: &Path) -> Result<Self, CustomError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            CustomError::error(
                "Cannot open residues file",
                err,
                Context::show(path.display()),
            )
        })?;
        let mut residues = Vec::with_capacity(RESIDUE_COUNT);
        for (line_index, line) in content.lines().enumerate() {
            let line_number = line_index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(CustomError::error(
                    "Invalid residue line",
                    "A residue line needs four fields: code, monoisotopic, average, and nominal mass",
                    Context::full_line(line_number, line),
                ));
            }
            let code = fields[0].chars().next().unwrap_or(' ').to_ascii_uppercase();
            let monoisotopic: f64 = fields[1].parse().map_err(|_| {
                CustomError::error(
                    "Invalid residue line",
                    "The monoisotopic mass is not a number",
                    Context::full_line(line_number, line),
                )
            })?;
            let average: f64 = fields[2].parse().map_err(|_| {
                CustomError::error(
                    "Invalid residue line",
                    "The average mass is not a number",
                    Context::full_line(line_number, line),
                )
            })?;
            let nominal: i32 = fields[3].parse().map_err(|_| {
                CustomError::error(
                    "Invalid residue line",
                    "The nominal mass is not an integer",
                    Context::full_line(line_number, line),
                )
            })?;
            if monoisotopic == 0.0 || average == 0.0 || nominal == 0 {
                continue;
            }
            residues.push(Residue {
                code,
                monoisotopic,
                average,
                nominal,
            });
        }
        let table = Self { residues };
        table.check_consistency()?;
        Ok(table)
    }

    /// Checks the table for internal inconsistencies. These are warning
    /// level: the run for this spectrum is abandoned, the program lives on.
    pub fn check_consistency(&self) -> Result<(), CustomError> {
        for residue in &self.residues {
            if (residue.monoisotopic - residue.average).abs() > 1.0 {
                return Err(CustomError::warning(
                    "Inconsistent residue table",
                    format!(
                        "Residue {} has a monoisotopic mass more than 1 Da away from its average mass",
                        residue.code
                    ),
                    Context::none(),
                ));
            }
            if residue.monoisotopic as i32 != residue.nominal {
                return Err(CustomError::warning(
                    "Inconsistent residue table",
                    format!(
                        "Residue {} has a nominal mass that does not match its monoisotopic mass",
                        residue.code
                    ),
                    Context::none(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_table_is_consistent() {
        let table = ResidueTable::default();
        assert_eq!(table.len(), RESIDUE_COUNT);
        table.check_consistency().unwrap();
    }

    #[test]
    fn canonical_indices_match_codes() {
        let table = ResidueTable::default();
        assert_eq!(table.get(index::G).code, 'G');
        assert_eq!(table.get(index::K).code, 'K');
        assert_eq!(table.get(index::R).code, 'R');
        assert_eq!(table.index_of('W'), Some(index::W));
    }

    #[test]
    fn leucine_isoleucine_are_isobaric() {
        let table = ResidueTable::default();
        assert_eq!(
            table.get(index::L).monoisotopic,
            table.get(index::I).monoisotopic
        );
    }
}
