//! Lossy rounding of field values onto a fixed binary grid.
//!
//! A field with `precision_bits = p` is stored as an integer count of
//! `2^-p` units. Rounding is half away from zero. Grid values are exactly
//! representable as `f64` for any practical precision, so dequantizing and
//! re-quantizing a grid value is the identity.

/// Quantize `value` to an integer number of `2^-precision_bits` units.
///
/// Out-of-range values saturate at the `i64` bounds; NaN maps to 0.
pub fn quantize(value: f64, precision_bits: u8) -> i64 {
    // `as` saturates on overflow and maps NaN to zero.
    (value * scale(precision_bits)).round() as i64
}

/// Convert a quantized integer back to its grid value.
pub fn dequantize(quantized: i64, precision_bits: u8) -> f64 {
    quantized as f64 / scale(precision_bits)
}

/// Snap `value` onto the grid without leaving `f64`.
pub fn snap(value: f64, precision_bits: u8) -> f64 {
    dequantize(quantize(value, precision_bits), precision_bits)
}

fn scale(precision_bits: u8) -> f64 {
    f64::from(precision_bits).exp2()
}
