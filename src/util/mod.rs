pub mod config;

/// Rounds to cents with ties to even, as `Decimal::quantize` does by default.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
