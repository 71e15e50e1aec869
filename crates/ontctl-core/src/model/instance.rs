use serde::Serialize;

use super::band::Band;

/// A discovered WLAN configuration (legacy) or radio (unified) instance.
///
/// Created fresh on every discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WlanInstance {
    pub path: String,
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possible_channels: Option<String>,
    /// Unified schema only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_band: Option<String>,
    /// `None` when classification failed.
    pub band: Option<Band>,
    /// Whether the sibling SSID / AccessPoint instances share this index.
    /// Always true on the legacy schema.
    pub aligned: bool,
}

impl WlanInstance {
    pub fn new(path: impl Into<String>, index: u32) -> Self {
        Self {
            path: path.into(),
            index,
            raw_channel: None,
            possible_channels: None,
            operating_band: None,
            band: None,
            aligned: true,
        }
    }
}
