//! Null-safe arithmetic shared by every report.
//!
//! A zero or absent denominator yields `None`; nothing here panics or
//! produces NaN/infinity.

/// Divide, returning `None` when the denominator is zero.
pub fn safe_div(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some(numerator / denominator)
}

/// Divide where either side may already be absent.
pub fn safe_div_opt(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    safe_div(numerator?, denominator?)
}

/// `100 * part / whole`, rounded to `places`.
pub fn percentage(part: f64, whole: f64, places: u32) -> Option<f64> {
    safe_div(100.0 * part, whole).map(|v| round_to(v, places))
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Round half away from zero to a whole number.
pub fn round_int(value: f64) -> i64 {
    value.round() as i64
}

/// Arithmetic mean; `None` for an empty input.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    safe_div(sum, count as f64)
}
