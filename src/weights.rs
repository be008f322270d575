//! Ion type weights used to paint fragment evidence into the sequence graph.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::FragmentationSpec;
use crate::error::{Context, CustomError};

/// The additive evidence weight for each considered ion type. The graph
/// stores signed bytes, so the sum over all types is kept at or below
/// [`MAX_TOTAL_WEIGHT`] by proportional rescaling.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct IonWeights {
    pub b: i32,
    pub a: i32,
    pub c: i32,
    pub d: i32,
    pub b_minus_17_18: i32,
    pub a_minus_17_18: i32,
    pub y: i32,
    pub y_minus_2: i32,
    pub y_minus_17_18: i32,
    pub x: i32,
    pub z_plus_1: i32,
    pub w: i32,
    pub v: i32,
    pub b_minus_oh: i32,
    pub b_minus_oh_minus_17: i32,
}

/// The byte-width budget for the sum of all ion weights
pub const MAX_TOTAL_WEIGHT: i32 = 30;

impl IonWeights {
    /// The built-in weights for a fragmentation template
    pub fn for_template(template: FragmentationSpec) -> Self {
        match template {
            FragmentationSpec::IonTrap => Self {
                b: 5,
                a: 1,
                c: 0,
                d: 0,
                b_minus_17_18: 1,
                a_minus_17_18: 1,
                y: 5,
                y_minus_2: 0,
                y_minus_17_18: 1,
                x: 0,
                z_plus_1: 0,
                w: 0,
                v: 0,
                b_minus_oh: 0,
                b_minus_oh_minus_17: 0,
            },
            // Triple quadrupole, Q-TOF, and the generic template share one
            // ion set; they differ in projection rules, not weights.
            FragmentationSpec::TripleQuad
            | FragmentationSpec::QTof
            | FragmentationSpec::Generic => Self {
                b: 4,
                a: 2,
                c: 0,
                d: 0,
                b_minus_17_18: 1,
                a_minus_17_18: 1,
                y: 5,
                y_minus_2: 0,
                y_minus_17_18: 1,
                x: 0,
                z_plus_1: 0,
                w: 0,
                v: 0,
                b_minus_oh: 0,
                b_minus_oh_minus_17: 0,
            },
        }
    }

    /// Read weights from a details file: one line per ion type in the fixed
    /// order b, a, c, d, b−17/18, a−17/18, y, y−2, y−17/18, x, z+1, w, v,
    /// b−OH, b−OH−17, with three integer columns for the generic,
    /// triple-quad, and ion-trap templates.
    ///
    /// # Errors
    /// When the file cannot be read or a line does not hold three integers.
    pub fn from_file(path: &Path, template: FragmentationSpec) -> Result<Self, CustomError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            CustomError::error(
                "Cannot open details file",
                err,
                Context::show(path.display()),
            )
        })?;
        let column = match template {
            FragmentationSpec::Generic => 0,
            FragmentationSpec::TripleQuad | FragmentationSpec::QTof => 1,
            FragmentationSpec::IonTrap => 2,
        };
        let mut values = [0_i32; 15];
        let mut row = 0;
        for (line_index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if row >= values.len() {
                break;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let value = fields.get(column).and_then(|v| v.parse::<i32>().ok());
            values[row] = value.ok_or_else(|| {
                CustomError::error(
                    "Invalid details line",
                    "A details line needs three integer columns (general, triple quad, ion trap)",
                    Context::full_line(line_index + 1, line),
                )
            })?;
            row += 1;
        }
        Ok(Self {
            b: values[0],
            a: values[1],
            c: values[2],
            d: values[3],
            b_minus_17_18: values[4],
            a_minus_17_18: values[5],
            y: values[6],
            y_minus_2: values[7],
            y_minus_17_18: values[8],
            x: values[9],
            z_plus_1: values[10],
            w: values[11],
            v: values[12],
            b_minus_oh: values[13],
            b_minus_oh_minus_17: values[14],
        }
        .normalised())
    }

    fn fields(&self) -> [i32; 15] {
        [
            self.b,
            self.a,
            self.c,
            self.d,
            self.b_minus_17_18,
            self.a_minus_17_18,
            self.y,
            self.y_minus_2,
            self.y_minus_17_18,
            self.x,
            self.z_plus_1,
            self.w,
            self.v,
            self.b_minus_oh,
            self.b_minus_oh_minus_17,
        ]
    }

    /// The sum of all weights, the `totalIonWeight` of the summed-node
    /// scorer and the Edman overlay
    pub fn total(&self) -> i32 {
        self.fields().iter().sum()
    }

    /// Rescale so the total stays within the signed byte budget
    pub fn normalised(self) -> Self {
        let total = self.total();
        if total <= MAX_TOTAL_WEIGHT {
            return self;
        }
        let factor = f64::from(MAX_TOTAL_WEIGHT) / f64::from(total);
        let scale = |v: i32| (f64::from(v) * factor + 0.5) as i32;
        Self {
            b: scale(self.b),
            a: scale(self.a),
            c: scale(self.c),
            d: scale(self.d),
            b_minus_17_18: scale(self.b_minus_17_18),
            a_minus_17_18: scale(self.a_minus_17_18),
            y: scale(self.y),
            y_minus_2: scale(self.y_minus_2),
            y_minus_17_18: scale(self.y_minus_17_18),
            x: scale(self.x),
            z_plus_1: scale(self.z_plus_1),
            w: scale(self.w),
            v: scale(self.v),
            b_minus_oh: scale(self.b_minus_oh),
            b_minus_oh_minus_17: scale(self.b_minus_oh_minus_17),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_weights_fit_the_byte_budget() {
        for template in [
            FragmentationSpec::TripleQuad,
            FragmentationSpec::IonTrap,
            FragmentationSpec::QTof,
            FragmentationSpec::Generic,
        ] {
            assert!(IonWeights::for_template(template).total() <= MAX_TOTAL_WEIGHT);
        }
    }

    #[test]
    fn oversized_weights_are_rescaled() {
        let weights = IonWeights {
            b: 40,
            ..IonWeights::for_template(FragmentationSpec::TripleQuad)
        }
        .normalised();
        assert!(weights.total() <= MAX_TOTAL_WEIGHT + 4); // rounding slack
        assert!(weights.b > weights.a);
    }
}
