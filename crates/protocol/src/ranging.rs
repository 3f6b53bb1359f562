use std::sync::OnceLock;

use regex::Regex;

/// Label marking a two-way-ranging diagnostic line.
pub const RANGING_LABEL: &str = "TWR[0].distance";

/// Fixed offset subtracted from the raw sensor distance.
pub const RANGING_CALIBRATION: u16 = 4630;

fn distance_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":\s*(\d+)").expect("ranging pattern"))
}

/// Best-effort scan of a diagnostic text line for a calibrated distance.
///
/// Returns `None` when the label is absent or no digits parse; ranging is
/// telemetry, never fatal. Calibration uses wrapping u16 arithmetic, so raw
/// readings below the offset wrap the way the sensor's own tooling does.
pub fn parse_distance(line: &str) -> Option<u16> {
    if !line.contains(RANGING_LABEL) {
        return None;
    }
    let caps = distance_re().captures(line)?;
    let raw: u16 = caps[1].parse().ok()?;
    Some(raw.wrapping_sub(RANGING_CALIBRATION))
}
