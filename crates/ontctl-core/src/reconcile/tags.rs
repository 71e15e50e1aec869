// Classification tags derived from detection and discovery. Always emitted,
// whether or not any write is needed.

use std::collections::BTreeSet;

use crate::classify::sanitize_tag;
use crate::model::{Band, DeviceContext, OpticalAlarm, Tag};
use crate::registry::CapabilityRegistry;

pub const OPTICAL_WARNING: &str = "optical_warning";
pub const OPTICAL_CRITICAL: &str = "optical_critical";

/// Schema, vendor, model, band presence and firmware tags.
pub(crate) fn identity_tags(
    ctx: &DeviceContext,
    registry: &CapabilityRegistry,
    firmware: Option<&str>,
    bands: &BTreeSet<Band>,
) -> Vec<Tag> {
    let mut tags = vec![
        Tag::new(ctx.schema.tag(), true),
        Tag::new(ctx.schema.other().tag(), false),
    ];

    if let Some(vendor) = ctx.vendor {
        tags.push(Tag::new(vendor.as_str(), true));
        tags.push(Tag::new(format!("vendor_{}", vendor.as_str()), true));
    }

    let product_class = ctx.identity.product_class.trim();
    if !product_class.is_empty() {
        tags.push(Tag::new(sanitize_tag(product_class), true));
    }

    for band in Band::ALL {
        tags.push(Tag::new(band.presence_tag(), bands.contains(&band)));
    }

    if let Some(tag) = firmware.and_then(|fw| registry.firmware_tag(ctx, fw)) {
        tags.push(Tag::new(tag, true));
    }
    tags
}

pub(crate) fn optical_tags(alarm: OpticalAlarm) -> [Tag; 2] {
    [
        Tag::new(OPTICAL_WARNING, alarm.warning),
        Tag::new(OPTICAL_CRITICAL, alarm.critical),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceIdentity, SchemaGeneration, VendorTag};

    fn value(tags: &[Tag], name: &str) -> Option<bool> {
        tags.iter().find(|t| t.name == name).map(|t| t.value)
    }

    #[test]
    fn nokia_unified_device() {
        let identity = DeviceIdentity {
            manufacturer: "ALCL".into(),
            product_class: "G-240W-F".into(),
            serial: "ALCLB0000001".into(),
        };
        let ctx = DeviceContext::new(identity, Some(VendorTag::Nokia), SchemaGeneration::Unified);
        let bands = BTreeSet::from([Band::TwoPointFour, Band::Five]);
        let tags = identity_tags(
            &ctx,
            &CapabilityRegistry::builtin(),
            Some("3FE49568IJHK11"),
            &bands,
        );

        assert_eq!(value(&tags, "schema_unified"), Some(true));
        assert_eq!(value(&tags, "schema_legacy"), Some(false));
        assert_eq!(value(&tags, "nokia"), Some(true));
        assert_eq!(value(&tags, "vendor_nokia"), Some(true));
        assert_eq!(value(&tags, "G_240W_F"), Some(true));
        assert_eq!(value(&tags, "wifi_5ghz"), Some(true));
        assert_eq!(value(&tags, "wifi_6ghz"), Some(false));
        assert_eq!(value(&tags, "nokia_firmware_3FE49568IJ"), Some(true));
    }

    #[test]
    fn unknown_vendor_keeps_schema_tags_only() {
        let ctx = DeviceContext::new(DeviceIdentity::default(), None, SchemaGeneration::Legacy);
        let tags = identity_tags(&ctx, &CapabilityRegistry::builtin(), None, &BTreeSet::new());
        assert_eq!(value(&tags, "schema_legacy"), Some(true));
        assert!(!tags.iter().any(|t| t.name.starts_with("vendor_")));
        assert_eq!(tags.len(), 5);
    }

    #[test]
    fn optical_pair() {
        let tags = optical_tags(OpticalAlarm {
            warning: true,
            critical: false,
        });
        assert_eq!(value(&tags, OPTICAL_WARNING), Some(true));
        assert_eq!(value(&tags, OPTICAL_CRITICAL), Some(false));
    }
}
