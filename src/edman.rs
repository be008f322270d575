//! Edman sequencing data: ambiguous per-cycle residue calls layered onto the
//! sequence graph as extra cleavage evidence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Context, CustomError};
use crate::gaps::GapList;
use crate::residue::ResidueTable;

/// Parsed Edman data: for each degradation cycle, the scaled residue masses
/// that cycle may have contained
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct EdmanData {
    cycles: Vec<Vec<i32>>,
}

impl EdmanData {
    /// Read an Edman file: one line per cycle, each line a run of one letter
    /// codes (no separators). `X` stands for any residue.
    ///
    /// # Errors
    /// On unreadable files, unknown codes, or codes for absent residues.
    pub fn from_file(
        path: &Path,
        residues: &ResidueTable,
        gaps: &GapList,
    ) -> Result<Self, CustomError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            CustomError::error("Cannot open Edman file", err, Context::show(path.display()))
        })?;
        let mut cycles = Vec::new();
        for (line_index, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut masses = Vec::new();
            for code in line.chars().map(|c| c.to_ascii_uppercase()) {
                if !code.is_ascii_alphabetic() {
                    break;
                }
                if code == 'X' {
                    // Any residue: expand over every usable single
                    masses.extend(gaps.singles().iter().copied().filter(|&g| g != 0));
                    continue;
                }
                let residue = residues.index_of(code).ok_or_else(|| {
                    CustomError::warning(
                        "Invalid Edman data",
                        format!("Unknown residue code '{code}'"),
                        Context::full_line(line_index + 1, raw_line),
                    )
                })?;
                let mass = match gaps.single(residue) {
                    0 => {
                        // Ile and Gln fold onto their isobaric partners
                        let folded = match code {
                            'I' => residues.index_of('L'),
                            'Q' => residues.index_of('K'),
                            _ => None,
                        }
                        .map(|i| gaps.single(i))
                        .unwrap_or(0);
                        if folded == 0 {
                            return Err(CustomError::warning(
                                "Invalid Edman data",
                                format!("Residue '{code}' is configured as absent"),
                                Context::full_line(line_index + 1, raw_line),
                            ));
                        }
                        folded
                    }
                    mass => mass,
                };
                masses.push(mass);
            }
            if !masses.is_empty() {
                cycles.push(masses);
            }
        }
        Ok(Self { cycles })
    }

    /// Build directly from per-cycle mass lists
    pub fn from_cycles(cycles: Vec<Vec<i32>>) -> Self {
        Self { cycles }
    }

    /// The number of cycles
    pub fn cycle_count(&self) -> usize {
        self.cycles.len()
    }

    /// Call `visit` with the summed scaled mass of every residue-choice
    /// permutation of the first `prefix_len` cycles. The permutations are
    /// walked with a mixed-radix counter over the per-cycle choices.
    pub fn for_each_prefix_sum(&self, prefix_len: usize, mut visit: impl FnMut(i32)) {
        if prefix_len == 0 || prefix_len > self.cycles.len() {
            return;
        }
        let radices: Vec<usize> = self.cycles[..prefix_len].iter().map(Vec::len).collect();
        let mut digits = vec![0_usize; prefix_len];
        loop {
            let sum = digits
                .iter()
                .enumerate()
                .map(|(cycle, &digit)| self.cycles[cycle][digit])
                .sum();
            visit(sum);

            // Increment the counter, carrying into higher cycles
            let mut position = 0;
            loop {
                digits[position] += 1;
                if digits[position] < radices[position] {
                    break;
                }
                digits[position] = 0;
                position += 1;
                if position == prefix_len {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_sums_cover_all_permutations() {
        let edman = EdmanData::from_cycles(vec![vec![10, 20], vec![5, 7, 9]]);
        let mut sums = Vec::new();
        edman.for_each_prefix_sum(2, |s| sums.push(s));
        sums.sort_unstable();
        assert_eq!(sums, vec![15, 17, 19, 25, 27, 29]);

        let mut first_only = Vec::new();
        edman.for_each_prefix_sum(1, |s| first_only.push(s));
        assert_eq!(first_only, vec![10, 20]);
    }

    #[test]
    fn empty_prefix_is_a_no_op() {
        let edman = EdmanData::from_cycles(vec![vec![10]]);
        let mut count = 0;
        edman.for_each_prefix_sum(0, |_| count += 1);
        edman.for_each_prefix_sum(5, |_| count += 1);
        assert_eq!(count, 0);
    }
}
