// ── Capability registry ──
//
// One immutable table maps every capability key to its ordered concrete
// path candidates. Vendor and schema differences live here as data; the
// resolver and engine carry no per-vendor branches.
//
// Template placeholders:
//   {root}  schema root (`Device` / `InternetGatewayDevice`)
//   {i}     discovered instance index (band-scoped keys only)
// Member entries hold a field name appended to a collection instance path.

use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use serde::Serialize;

use crate::classify::sanitize_tag;
use crate::model::{CapabilityKey, DeviceContext, SchemaGeneration, VendorTag, keys};

const WLAN: &str = "InternetGatewayDevice.LANDevice.1.WLANConfiguration";
const WAN_CONN: &str = "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1";
const VOICE_PROFILE: &str = "{root}.Services.VoiceService.1.VoiceProfile.1";

// ── Entries ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Concrete parameter, existence-probed during resolution.
    Parameter,
    /// Collection base path, resolved without a probe.
    Collection,
    /// Field of a collection instance, resolved without a probe.
    Member,
}

/// One concrete path template and the conditions under which it applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCandidate {
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<VendorTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaGeneration>,
}

impl PathCandidate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            vendor: None,
            schema: None,
        }
    }

    pub fn unified(mut self) -> Self {
        self.schema = Some(SchemaGeneration::Unified);
        self
    }

    pub fn legacy(mut self) -> Self {
        self.schema = Some(SchemaGeneration::Legacy);
        self
    }

    pub fn vendor(mut self, vendor: VendorTag) -> Self {
        self.vendor = Some(vendor);
        self
    }

    /// Whether this candidate's filters admit `ctx`.
    pub fn applies(&self, ctx: &DeviceContext) -> bool {
        self.vendor.is_none_or(|v| ctx.vendor == Some(v))
            && self.schema.is_none_or(|s| ctx.schema == s)
    }

    /// Substitute `{root}` and, when given, `{i}`.
    pub fn expand(&self, schema: SchemaGeneration, index: Option<u32>) -> String {
        let path = self.template.replace("{root}", schema.root());
        match index {
            Some(i) => path.replace("{i}", &i.to_string()),
            None => path,
        }
    }

    /// Path of this member field under a concrete collection instance.
    pub fn member_path(&self, instance_path: &str) -> String {
        format!("{instance_path}.{}", self.template)
    }

    pub fn needs_index(&self) -> bool {
        self.template.contains("{i}")
    }
}

fn c(template: impl Into<String>) -> PathCandidate {
    PathCandidate::new(template)
}

#[derive(Debug, Clone, Serialize)]
pub struct CapabilityEntry {
    pub key: String,
    pub kind: EntryKind,
    /// Observed-only capabilities are never written.
    pub read_only: bool,
    /// Priority order.
    pub candidates: Vec<PathCandidate>,
}

impl CapabilityEntry {
    pub fn applicable<'a>(
        &'a self,
        ctx: &'a DeviceContext,
    ) -> impl Iterator<Item = &'a PathCandidate> + 'a {
        self.candidates.iter().filter(move |c| c.applies(ctx))
    }
}

/// Tags a device by firmware prefix (staged rollout groups).
#[derive(Debug, Clone, Serialize)]
pub struct FirmwareTagRule {
    pub vendor: VendorTag,
    pub prefix: &'static str,
    /// Leading characters of the firmware version kept in the tag.
    pub keep: usize,
    pub tag_prefix: &'static str,
}

// ── Registry ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CapabilityRegistry {
    entries: IndexMap<String, CapabilityEntry>,
    firmware_tags: Vec<FirmwareTagRule>,
}

static BUILTIN: LazyLock<Arc<CapabilityRegistry>> =
    LazyLock::new(|| Arc::new(CapabilityRegistry::builtin()));

impl CapabilityRegistry {
    /// Process-wide builtin table, built on first use.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    pub fn get(&self, key: &CapabilityKey) -> Option<&CapabilityEntry> {
        self.entries.get(&key.registry_key())
    }

    pub fn entries(&self) -> impl Iterator<Item = &CapabilityEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Firmware rollout tag for this device, if any rule matches.
    pub fn firmware_tag(&self, ctx: &DeviceContext, firmware: &str) -> Option<String> {
        self.firmware_tags
            .iter()
            .filter(|rule| ctx.vendor == Some(rule.vendor))
            .find(|rule| firmware.starts_with(rule.prefix))
            .map(|rule| {
                let head: String = firmware.chars().take(rule.keep).collect();
                format!("{}{}", rule.tag_prefix, sanitize_tag(&head))
            })
    }

    /// The builtin vendor/schema table.
    #[allow(clippy::too_many_lines)]
    pub fn builtin() -> Self {
        let mut t = TableBuilder::default();

        // ── WiFi discovery ──
        t.collection(keys::WIFI_RADIOS, [c("Device.WiFi.Radio").unified()]);
        t.collection(keys::WIFI_SSIDS, [c("Device.WiFi.SSID").unified()]);
        t.collection(
            keys::WIFI_ACCESS_POINTS,
            [c("Device.WiFi.AccessPoint").unified()],
        );
        t.collection(keys::WIFI_WLAN_CONFIGS, [c(WLAN).legacy()]);
        t.member(
            keys::RADIO_OPERATING_BAND,
            [c("OperatingFrequencyBand").unified()],
        );
        t.member(keys::RADIO_CHANNEL, [c("Channel")]);
        t.member(keys::RADIO_POSSIBLE_CHANNELS, [c("PossibleChannels")]);

        // ── WiFi, band-scoped ──
        t.band(
            keys::SSID,
            [
                c("Device.WiFi.SSID.{i}.SSID").unified(),
                c(format!("{WLAN}.{{i}}.SSID")).legacy(),
            ],
        );
        t.band(
            keys::PASSWORD,
            [
                c("Device.WiFi.AccessPoint.{i}.Security.KeyPassphrase").unified(),
                c(format!("{WLAN}.{{i}}.KeyPassphrase")).legacy(),
                c(format!("{WLAN}.{{i}}.PreSharedKey.1.KeyPassphrase")).legacy(),
            ],
        );
        t.band(
            keys::ENABLE,
            [
                c("Device.WiFi.SSID.{i}.Enable").unified(),
                c(format!("{WLAN}.{{i}}.Enable")).legacy(),
            ],
        );
        t.band(
            keys::SECURITY_MODE,
            [c("Device.WiFi.AccessPoint.{i}.Security.ModeEnabled").unified()],
        );
        t.band(
            keys::MFP,
            [c("Device.WiFi.AccessPoint.{i}.Security.MFPConfig").unified()],
        );
        t.band(
            keys::BEACON_TYPE,
            [c(format!("{WLAN}.{{i}}.BeaconType")).legacy()],
        );
        t.band(
            keys::ENCRYPTION_MODES,
            [c(format!("{WLAN}.{{i}}.WPAEncryptionModes")).legacy()],
        );
        t.band(
            keys::AUTH_MODE,
            [c(format!("{WLAN}.{{i}}.WPAAuthenticationMode")).legacy()],
        );
        t.band_observed(
            keys::CHANNEL,
            [
                c("Device.WiFi.Radio.{i}.Channel").unified(),
                c(format!("{WLAN}.{{i}}.Channel")).legacy(),
            ],
        );

        // ── Device information ──
        t.observed(
            keys::FIRMWARE_VERSION,
            [c("{root}.DeviceInfo.SoftwareVersion")],
        );
        t.observed(
            keys::HARDWARE_VERSION,
            [c("{root}.DeviceInfo.HardwareVersion")],
        );

        // ── WAN status ──
        t.observed(
            keys::WAN_IP_ADDRESS,
            [
                c("Device.IP.Interface.1.IPv4Address.1.IPAddress").unified(),
                c(format!("{WAN_CONN}.WANPPPConnection.1.ExternalIPAddress")).legacy(),
                c(format!("{WAN_CONN}.WANIPConnection.1.ExternalIPAddress")).legacy(),
            ],
        );
        t.observed(
            keys::WAN_STATUS,
            [
                c("Device.PPP.Interface.1.Status").unified(),
                c("Device.IP.Interface.1.Status").unified(),
                c(format!("{WAN_CONN}.WANPPPConnection.1.ConnectionStatus")).legacy(),
                c(format!("{WAN_CONN}.WANIPConnection.1.ConnectionStatus")).legacy(),
            ],
        );

        // ── WAN, PPPoE ──
        t.param(
            keys::PPPOE_ENABLE,
            [
                c("Device.PPP.Interface.1.Enable").unified(),
                c(format!("{WAN_CONN}.WANPPPConnection.1.Enable")).legacy(),
            ],
        );
        t.param(
            keys::PPPOE_USERNAME,
            [
                c("Device.PPP.Interface.1.Username").unified(),
                c(format!("{WAN_CONN}.WANPPPConnection.1.Username")).legacy(),
            ],
        );
        t.param(
            keys::PPPOE_PASSWORD,
            [
                c("Device.PPP.Interface.1.Password").unified(),
                c(format!("{WAN_CONN}.WANPPPConnection.1.Password")).legacy(),
            ],
        );
        t.param(
            keys::PPPOE_CONNECTION_TYPE,
            [c(format!("{WAN_CONN}.WANPPPConnection.1.ConnectionType")).legacy()],
        );
        t.param(
            keys::PPPOE_VLAN_ID,
            [
                c(format!("{WAN_CONN}.X_HW_VLANMuxID"))
                    .legacy()
                    .vendor(VendorTag::Huawei),
                c(format!("{WAN_CONN}.X_ZTE-COM_VLANID"))
                    .legacy()
                    .vendor(VendorTag::Zte),
            ],
        );
        t.param(
            keys::PPPOE_VLAN_COS,
            [c(format!("{WAN_CONN}.X_HW_VLAN_CoS"))
                .legacy()
                .vendor(VendorTag::Huawei)],
        );

        // ── WAN, DHCP ──
        t.param(
            keys::DHCP_ENABLE,
            [
                c("Device.IP.Interface.1.Enable").unified(),
                c(format!("{WAN_CONN}.WANIPConnection.1.Enable")).legacy(),
            ],
        );
        t.param(
            keys::DHCP_CONNECTION_TYPE,
            [c(format!("{WAN_CONN}.WANIPConnection.1.ConnectionType")).legacy()],
        );
        t.param(
            keys::DHCP_ADDRESSING_TYPE,
            [c(format!("{WAN_CONN}.WANIPConnection.1.AddressingType")).legacy()],
        );

        // ── VoIP ──
        for (key, field) in [
            (keys::VOIP_PROXY_SERVER, "SIP.ProxyServer"),
            (keys::VOIP_PROXY_PORT, "SIP.ProxyServerPort"),
            (keys::VOIP_REGISTRAR_SERVER, "SIP.RegistrarServer"),
            (keys::VOIP_REGISTRAR_PORT, "SIP.RegistrarServerPort"),
            (keys::VOIP_LINE_ENABLE, "Line.1.Enable"),
            (keys::VOIP_AUTH_USERNAME, "Line.1.SIP.AuthUserName"),
            (keys::VOIP_AUTH_PASSWORD, "Line.1.SIP.AuthPassword"),
            (keys::VOIP_URI, "Line.1.SIP.URI"),
        ] {
            t.param(key, [c(format!("{VOICE_PROFILE}.{field}"))]);
        }

        // ── Port forwarding ──
        t.collection(
            keys::PORT_MAPPINGS_IP,
            [
                c("Device.NAT.PortMapping").unified(),
                c(format!("{WAN_CONN}.WANIPConnection.1.PortMapping")).legacy(),
            ],
        );
        t.collection(
            keys::PORT_MAPPINGS_PPP,
            [
                c("Device.NAT.PortMapping").unified(),
                c(format!("{WAN_CONN}.WANPPPConnection.1.PortMapping")).legacy(),
            ],
        );
        t.member(
            keys::PORT_MAPPING_ENABLE,
            [c("Enable").unified(), c("PortMappingEnabled").legacy()],
        );
        t.member(keys::PORT_MAPPING_EXTERNAL_PORT, [c("ExternalPort")]);
        t.member(keys::PORT_MAPPING_INTERNAL_PORT, [c("InternalPort")]);
        t.member(keys::PORT_MAPPING_INTERNAL_CLIENT, [c("InternalClient")]);
        t.member(
            keys::PORT_MAPPING_PROTOCOL,
            [c("Protocol").unified(), c("PortMappingProtocol").legacy()],
        );
        t.member(
            keys::PORT_MAPPING_DESCRIPTION,
            [
                c("Description").unified(),
                c("PortMappingDescription").legacy(),
            ],
        );

        // ── Optical diagnostics (no Huawei path exists) ──
        t.observed(
            keys::OPTICAL_RX_POWER,
            [
                c("Device.X_ALU_COM.OntOpticalParam.RxPower")
                    .unified()
                    .vendor(VendorTag::Nokia),
                c("InternetGatewayDevice.X_ALU_COM.OntOpticalParam.RxPower")
                    .legacy()
                    .vendor(VendorTag::Nokia),
                c("Device.X_ALU_COM.OntOpticalParam.RxPower")
                    .legacy()
                    .vendor(VendorTag::Nokia),
                c("InternetGatewayDevice.WANDevice.1.X_ZTE-COM_GponInterfaceConfig.RxPower")
                    .vendor(VendorTag::Zte),
            ],
        );
        t.observed(
            keys::OPTICAL_TEMPERATURE,
            [
                c("InternetGatewayDevice.WANDevice.1.X_ZTE-COM_GponInterfaceConfig.Temperature")
                    .vendor(VendorTag::Zte),
            ],
        );

        // ── Management server ──
        t.param(
            keys::PERIODIC_INFORM_ENABLE,
            [c("{root}.ManagementServer.PeriodicInformEnable")],
        );
        t.param(
            keys::PERIODIC_INFORM_INTERVAL,
            [c("{root}.ManagementServer.PeriodicInformInterval")],
        );

        Self {
            entries: t.entries,
            firmware_tags: vec![FirmwareTagRule {
                vendor: VendorTag::Nokia,
                prefix: "3FE",
                keep: 10,
                tag_prefix: "nokia_firmware_",
            }],
        }
    }
}

// ── Table construction ──────────────────────────────────────────────

#[derive(Default)]
struct TableBuilder {
    entries: IndexMap<String, CapabilityEntry>,
}

impl TableBuilder {
    fn insert(
        &mut self,
        key: String,
        kind: EntryKind,
        read_only: bool,
        candidates: impl IntoIterator<Item = PathCandidate>,
    ) {
        let entry = CapabilityEntry {
            key: key.clone(),
            kind,
            read_only,
            candidates: candidates.into_iter().collect(),
        };
        self.entries.insert(key, entry);
    }

    fn param(&mut self, key: &str, candidates: impl IntoIterator<Item = PathCandidate>) {
        self.insert(key.to_owned(), EntryKind::Parameter, false, candidates);
    }

    fn observed(&mut self, key: &str, candidates: impl IntoIterator<Item = PathCandidate>) {
        self.insert(key.to_owned(), EntryKind::Parameter, true, candidates);
    }

    fn band(&mut self, attr: &str, candidates: impl IntoIterator<Item = PathCandidate>) {
        self.insert(
            format!("wifi.band.{{band}}.{attr}"),
            EntryKind::Parameter,
            false,
            candidates,
        );
    }

    fn band_observed(&mut self, attr: &str, candidates: impl IntoIterator<Item = PathCandidate>) {
        self.insert(
            format!("wifi.band.{{band}}.{attr}"),
            EntryKind::Parameter,
            true,
            candidates,
        );
    }

    fn collection(&mut self, key: &str, candidates: impl IntoIterator<Item = PathCandidate>) {
        self.insert(key.to_owned(), EntryKind::Collection, false, candidates);
    }

    fn member(&mut self, key: &str, candidates: impl IntoIterator<Item = PathCandidate>) {
        self.insert(key.to_owned(), EntryKind::Member, false, candidates);
    }
}
