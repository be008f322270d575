//! Monoisotopic element masses and the average/monoisotopic conversion.

/// Monoisotopic mass of hydrogen
pub const HYDROGEN: f64 = 1.007825035;
/// Monoisotopic mass of carbon
pub const CARBON: f64 = 12.0;
/// Monoisotopic mass of nitrogen
pub const NITROGEN: f64 = 14.003074002;
/// Monoisotopic mass of oxygen
pub const OXYGEN: f64 = 15.99491463;
/// Monoisotopic mass of phosphorus
pub const PHOSPHORUS: f64 = 30.973762;
/// Monoisotopic mass of sulfur
pub const SULFUR: f64 = 31.972070698;

/// The six elements tracked by the engine, in canonical order
pub const ELEMENTS: [f64; 6] = [HYDROGEN, CARBON, NITROGEN, OXYGEN, PHOSPHORUS, SULFUR];

/// Water (2H + O)
pub const WATER: f64 = 2.0 * HYDROGEN + OXYGEN;
/// Ammonia (N + 3H)
pub const AMMONIA: f64 = NITROGEN + 3.0 * HYDROGEN;
/// Carbon monoxide (C + O)
pub const CO: f64 = CARBON + OXYGEN;
/// Hydroxyl (O + H), the C-terminal group of a free acid
pub const HYDROXYL: f64 = OXYGEN + HYDROGEN;
/// Methylene (2H + C), the unit of the mass-scramble offsets
pub const METHYLENE: f64 = 2.0 * HYDROGEN + CARBON;

/// The weighted average ratio between average and monoisotopic residue masses
pub const AV_TO_MONO: f64 = 0.999371395;
/// The inverse ratio, converting monoisotopic to average mass
pub const MONO_TO_AV: f64 = 1.000629;
/// Width of the band below the mono/average switch mass over which the
/// conversion factor transitions linearly
pub const AV_MONO_TRANSITION: f64 = 400.0;
/// The weighted average amino acid residue mass
pub const AV_RESIDUE_MASS: f64 = 119.0;

/// Convert an observed mass, average above `mono_to_av` and monoisotopic
/// below it, to a monoisotopic mass. The factor transitions linearly over
/// the 400 Da below the switch mass.
pub fn av_to_mono_correct(mass: f64, mono_to_av: f64) -> f64 {
    if mass <= mono_to_av - AV_MONO_TRANSITION {
        return mass;
    }
    let fraction = if mass >= mono_to_av {
        0.0
    } else {
        (mono_to_av - mass) / AV_MONO_TRANSITION
    };
    mass * ((1.0 - AV_TO_MONO) * fraction + AV_TO_MONO)
}

/// Convert a computed monoisotopic mass to the observed convention, average
/// above `mono_to_av`, with the same linear transition band.
pub fn mono_to_av_correct(mass: f64, mono_to_av: f64) -> f64 {
    if mass <= mono_to_av - AV_MONO_TRANSITION {
        return mass;
    }
    let fraction = if mass >= mono_to_av {
        0.0
    } else {
        (mono_to_av - mass) / AV_MONO_TRANSITION
    };
    mass * (MONO_TO_AV - (MONO_TO_AV - 1.0) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_masses_pass_unchanged() {
        assert_eq!(av_to_mono_correct(500.0, 1800.0), 500.0);
        assert_eq!(mono_to_av_correct(500.0, 1800.0), 500.0);
    }

    #[test]
    fn high_masses_get_the_full_factor() {
        let corrected = av_to_mono_correct(2000.0, 1800.0);
        assert!((corrected - 2000.0 * AV_TO_MONO).abs() < 1e-9);
        let back = mono_to_av_correct(2000.0, 1800.0);
        assert!((back - 2000.0 * MONO_TO_AV).abs() < 1e-9);
    }

    #[test]
    fn transition_band_is_continuous() {
        // Just above the band entrance the correction is tiny
        let just_inside = av_to_mono_correct(1400.1, 1800.0);
        assert!((just_inside - 1400.1).abs() < 0.001);
    }

    #[test]
    fn round_trip_is_close() {
        let mass = 1900.0;
        let there = mono_to_av_correct(mass, 1800.0);
        let back = av_to_mono_correct(there, 1800.0);
        assert!((back - mass).abs() < 0.01);
    }
}
