//! Tolerance constants for sample comparisons.

/// Floating point rounding errors. Samples pass through the tape untouched,
/// so anything above this is a real difference.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Silence threshold (~-80dB).
pub const SILENCE_THRESHOLD: f32 = 0.0001;
