// ── Device identity and context ──
//
// `DeviceIdentity` is what the device says about itself; `DeviceContext`
// is what detection concluded from it. Both are fixed for a session.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Identity attributes reported by the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    pub manufacturer: String,
    pub product_class: String,
    pub serial: String,
}

/// Normalized vendor, as resolved through the alias table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VendorTag {
    Huawei,
    Zte,
    Nokia,
    Fiberhome,
    Tplink,
    Dasan,
}

impl VendorTag {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Which data model generation the device speaks.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SchemaGeneration {
    /// Flat model rooted at `InternetGatewayDevice`.
    Legacy,
    /// Model rooted at `Device`.
    Unified,
}

impl SchemaGeneration {
    /// Root object of the parameter tree.
    pub fn root(self) -> &'static str {
        match self {
            Self::Legacy => "InternetGatewayDevice",
            Self::Unified => "Device",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Legacy => "schema_legacy",
            Self::Unified => "schema_unified",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Legacy => Self::Unified,
            Self::Unified => Self::Legacy,
        }
    }
}

/// Outcome of vendor/schema detection for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceContext {
    pub identity: DeviceIdentity,
    /// `None` when the manufacturer matches no alias.
    pub vendor: Option<VendorTag>,
    pub schema: SchemaGeneration,
}

impl DeviceContext {
    pub fn new(
        identity: DeviceIdentity,
        vendor: Option<VendorTag>,
        schema: SchemaGeneration,
    ) -> Self {
        Self {
            identity,
            vendor,
            schema,
        }
    }

    pub fn vendor_name(&self) -> &'static str {
        self.vendor.map_or("none", VendorTag::as_str)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn vendor_string_forms() {
        assert_eq!(VendorTag::Tplink.to_string(), "tplink");
        assert_eq!("zte".parse::<VendorTag>().unwrap(), VendorTag::Zte);
    }

    #[test]
    fn schema_roots_and_tags() {
        assert_eq!(SchemaGeneration::Unified.root(), "Device");
        assert_eq!(SchemaGeneration::Legacy.tag(), "schema_legacy");
        assert_eq!(
            SchemaGeneration::Legacy.other(),
            SchemaGeneration::Unified
        );
    }
}
