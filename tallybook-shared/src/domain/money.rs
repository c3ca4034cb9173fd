/// Currency rounding
///
/// All monetary values leaving the API go through [`round_currency`].

/// Rounds to 2 decimal places, half away from zero
///
/// A machine epsilon is added to the magnitude first so that values like
/// `1.005`, which are stored slightly below their decimal form, still round up.
///
/// ```
/// use tallybook_shared::domain::money::round_currency;
///
/// assert_eq!(round_currency(1.005), 1.01);
/// assert_eq!(round_currency(-1.005), -1.01);
/// assert_eq!(round_currency(0.1 + 0.2), 0.3);
/// ```
pub fn round_currency(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }

    let rounded = ((value.abs() + f64::EPSILON) * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded.copysign(value)
    }
}
