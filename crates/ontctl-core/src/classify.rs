// ── Band classification ──
//
// Pure helpers mapping radio / WLAN metadata to a band. No store access.

use crate::model::Band;

/// Classify a legacy WLAN instance from its channel metadata.
///
/// `possible_channels` (e.g. `"1-11"`, `"36,40,44,48"`, `"1-13;36-64"`) is
/// authoritative when it yields a usable maximum channel. Otherwise the
/// current `channel` decides, which misreads low 6 GHz channel numbers as
/// 2.4 or 5 GHz.
pub fn classify_band(channel: u32, possible_channels: &str) -> Option<Band> {
    let max_channel = possible_channels
        .split([';', ','])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .rsplit('-')
                .next()
                .and_then(|upper| upper.trim().parse::<u32>().ok())
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0);

    match max_channel {
        178.. => return Some(Band::Six),
        15..=177 => return Some(Band::Five),
        1..=14 => return Some(Band::TwoPointFour),
        0 => {}
    }

    match channel {
        178.. => Some(Band::Six),
        36..=177 => Some(Band::Five),
        1..=14 => Some(Band::TwoPointFour),
        _ => None,
    }
}

/// Parse a raw channel value as reported by the device; garbage reads as 0.
pub fn parse_channel(raw: Option<&str>) -> u32 {
    raw.and_then(|r| r.trim().parse().ok()).unwrap_or(0)
}

/// Classify a unified radio from its `OperatingFrequencyBand` string.
pub fn classify_operating_band(raw: &str) -> Option<Band> {
    match raw {
        "2.4GHz" => return Some(Band::TwoPointFour),
        "5GHz" => return Some(Band::Five),
        "6GHz" => return Some(Band::Six),
        _ => {}
    }
    if raw.contains("2.4") {
        Some(Band::TwoPointFour)
    } else if raw.contains('5') && !raw.contains('2') && !raw.contains('6') {
        Some(Band::Five)
    } else if raw.contains('6') && !raw.contains("60") {
        Some(Band::Six)
    } else {
        None
    }
}

/// Make an arbitrary string usable as a tag name: every character outside
/// `[a-zA-Z0-9]` becomes `_`.
pub fn sanitize_tag(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
