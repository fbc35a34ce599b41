//! Sign/magnitude interpretation for the upstream's custom delta encoding.
//!
//! Two basis-point scalings coexist deliberately and must not be conflated:
//!
//! - `display_percent`: `(bps / 100) * sign` → signed percentage points,
//!   consumed directly by the display pipeline.
//! - `statistical_fraction`: `bps / 10_000` → percentage points, then
//!   `/ 100` → fraction, consumed by the Bayesian engine as an RTP delta.
//!
//! Which scale is correct for which consumer was never confirmed against the
//! live payload; both are preserved as found.

/// The upstream reuses an unsigned varint field to carry a signed quantity:
/// reinterpret the raw u64 as its two's-complement int64.
pub fn to_signed_i64(u: u64) -> i64 {
    u as i64
}

/// Sign of the reinterpreted value: -1, 0 or 1.
pub fn to_sign(u: u64) -> i8 {
    to_signed_i64(u).signum() as i8
}

/// Display scale: basis points → signed percentage points.
/// None if either input is absent (no signal for the window).
pub fn display_percent(magnitude_bps: Option<u64>, sign: Option<i8>) -> Option<f64> {
    let bps = magnitude_bps?;
    let sign = sign?;
    Some((bps as f64 / 100.0) * f64::from(sign))
}

/// Statistical scale: basis points → unsigned RTP-delta fraction
/// (20_335 → 2.0335 pp → 0.020335). Sign is applied by the caller against
/// the theoretical RTP.
pub fn statistical_fraction(magnitude_bps: u64) -> f64 {
    (magnitude_bps as f64 / 10_000.0) / 100.0
}
