use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Prices, probabilities and profit are stored in this type so that a run
/// replays bit-for-bit on every platform.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64, returning `None` when the value is not finite
/// or does not fit the Q32.32 range. Use only at script boundaries.
#[inline]
pub fn try_f64_to_fixed64(v: f64) -> Option<Fixed64> {
    if !v.is_finite() {
        return None;
    }
    Fixed64::checked_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and presentation.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Convert a signed unit count to Fixed64, saturating at the type bounds.
#[inline]
pub fn count_to_fixed64(count: i64) -> Fixed64 {
    Fixed64::saturating_from_num(count)
}

/// Ratio `num / den` as f64, clamped to `[0, 1]`. Returns 0 when `den == 0`.
#[inline]
pub fn unit_ratio(num: Ticks, den: Ticks) -> f64 {
    if den == 0 {
        return 0.0;
    }
    (num as f64 / den as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_price_round_trips() {
        let price = try_f64_to_fixed64(12.5).unwrap();
        assert_eq!(fixed64_to_f64(price), 12.5);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        assert!(try_f64_to_fixed64(f64::NAN).is_none());
        assert!(try_f64_to_fixed64(f64::INFINITY).is_none());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(try_f64_to_fixed64(1e20).is_none());
        assert!(try_f64_to_fixed64(-1e20).is_none());
    }

    #[test]
    fn count_conversion_saturates() {
        assert_eq!(count_to_fixed64(3), Fixed64::from_num(3));
        assert_eq!(count_to_fixed64(i64::MAX), Fixed64::MAX);
        assert_eq!(count_to_fixed64(i64::MIN), Fixed64::MIN);
    }

    #[test]
    fn unit_ratio_clamps() {
        assert_eq!(unit_ratio(2, 4), 0.5);
        assert_eq!(unit_ratio(8, 4), 1.0);
        assert_eq!(unit_ratio(1, 0), 0.0);
    }

    #[test]
    fn fixed64_multiplication_is_exact_for_integers() {
        let price = try_f64_to_fixed64(10.0).unwrap();
        assert_eq!(count_to_fixed64(-3) * price, Fixed64::from_num(-30));
    }
}
