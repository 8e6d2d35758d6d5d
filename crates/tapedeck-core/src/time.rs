//! Presentation helper for tape positions.

use crate::TapeTime;

/// Render a tape position as `MM:SS.ss`.
///
/// Minutes are not wrapped into hours. Negative positions get a leading `-`.
pub fn format_position(pos: TapeTime, sample_rate: f64) -> String {
    let sign = if pos < 0 { "-" } else { "" };
    let seconds = pos.unsigned_abs() as f64 / sample_rate;
    let minutes = (seconds / 60.0).floor() as u64;
    format!("{}{:02}:{:05.2}", sign, minutes, seconds % 60.0)
}
