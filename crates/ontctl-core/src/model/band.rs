use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// WiFi frequency band.
///
/// String form is the bare GHz figure used in policy documents and
/// capability keys (`"2.4"`, `"5"`, `"6"`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Band {
    #[serde(rename = "2.4")]
    #[strum(to_string = "2.4")]
    TwoPointFour,
    #[serde(rename = "5")]
    #[strum(to_string = "5")]
    Five,
    #[serde(rename = "6")]
    #[strum(to_string = "6")]
    Six,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::TwoPointFour, Band::Five, Band::Six];

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Presence tag emitted when a device carries this band.
    pub fn presence_tag(self) -> &'static str {
        match self {
            Band::TwoPointFour => "wifi_2_4ghz",
            Band::Five => "wifi_5ghz",
            Band::Six => "wifi_6ghz",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn string_forms() {
        assert_eq!(Band::TwoPointFour.to_string(), "2.4");
        assert_eq!("5".parse::<Band>().unwrap(), Band::Five);
        assert!("2".parse::<Band>().is_err());
        assert_eq!(serde_json::to_string(&Band::Six).unwrap(), "\"6\"");
    }

    #[test]
    fn ordered_low_to_high() {
        assert!(Band::TwoPointFour < Band::Five);
        assert!(Band::Five < Band::Six);
    }
}
