//! Fixed-point conversions for Ocean measurement and setpoint fields.
//!
//! The device reports physical quantities in unsigned Q formats:
//! Q14.2 for voltages (quarter-volt steps), Q9.7 for currents, and Q2.6
//! for power fractions.

/// Q14.2 raw value to volts.
///
/// # Example
///
/// ```
/// assert_eq!(oceanlink::device::convert::q14_2_to_volts(0x0190), 100.0);
/// ```
#[inline]
pub fn q14_2_to_volts(raw: u16) -> f32 {
    f32::from(raw) / 4.0
}

/// Q9.7 raw value to amperes.
///
/// # Example
///
/// ```
/// assert_eq!(oceanlink::device::convert::q9_7_to_amps(0x0080), 1.0);
/// ```
#[inline]
pub fn q9_7_to_amps(raw: u16) -> f32 {
    f32::from(raw) / 128.0
}

/// Q2.6 raw value to a power fraction.
#[inline]
pub fn q2_6_to_fraction(raw: u16) -> f32 {
    f32::from(raw) / 64.0
}

/// Power fraction to its Q2.6 byte encoding, rounded to the nearest step
/// and clamped to the representable range.
pub fn fraction_to_q2_6(value: f32) -> u8 {
    let clamped = if value < 0.0 { 0.0 } else { value };
    let scaled = clamped * 64.0 + 0.5;
    if scaled >= 256.0 {
        u8::MAX
    } else {
        scaled as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(q14_2_to_volts(0x0190), 100.0);
        assert_eq!(q14_2_to_volts(1), 0.25);
        assert_eq!(q9_7_to_amps(0x0080), 1.0);
        assert_eq!(q9_7_to_amps(64), 0.5);
        assert_eq!(q2_6_to_fraction(48), 0.75);
        assert_eq!(fraction_to_q2_6(0.75), 48);
        assert_eq!(fraction_to_q2_6(1.0), 64);
    }

    #[test]
    fn test_q2_6_round_trips_exact_steps() {
        // Every representable fraction in the device's accepted range.
        for raw in 32..=64u8 {
            let fraction = q2_6_to_fraction(u16::from(raw));
            assert_eq!(fraction_to_q2_6(fraction), raw);
        }
    }

    #[test]
    fn test_q2_6_rounds_to_nearest() {
        // 0.7578125 = 48.5 steps rounds up; just below rounds down.
        assert_eq!(fraction_to_q2_6(0.7578125), 49);
        assert_eq!(fraction_to_q2_6(0.757), 48);
    }

    #[test]
    fn test_q2_6_clamps() {
        assert_eq!(fraction_to_q2_6(-1.0), 0);
        assert_eq!(fraction_to_q2_6(10.0), u8::MAX);
    }
}
