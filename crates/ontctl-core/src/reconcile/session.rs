// One planning pass over one device: resolve, observe, diff, and collect
// directives, tags and notices into a `ReconciliationPlan`.

use std::collections::BTreeSet;

use ontctl_api::{Freshness, ParameterStore};
use tracing::{debug, info, warn};

use super::desired::{Desired, rule_members};
use super::tags::{identity_tags, optical_tags};
use crate::discover::{Discovery, list_indices, next_free_index};
use crate::error::CoreError;
use crate::model::{
    Band, CapabilityKey, DeviceContext, NewInstance, Notice, NoticeKind, OpticalThresholds,
    PortForwardIntent, PortRule, ReconciliationPlan, WanConnectionKind, WriteDirective, keys,
};
use crate::registry::CapabilityRegistry;
use crate::resolve::{NotFoundReason, Resolution, Resolver};

pub(crate) struct PlanSession<'a> {
    store: &'a dyn ParameterStore,
    registry: &'a CapabilityRegistry,
    resolver: Resolver<'a>,
    as_of: Freshness,
    plan: ReconciliationPlan,
}

impl<'a> PlanSession<'a> {
    pub(crate) fn new(
        store: &'a dyn ParameterStore,
        registry: &'a CapabilityRegistry,
        ctx: &'a DeviceContext,
        discovery: &'a Discovery,
        as_of: Freshness,
    ) -> Self {
        let mut plan = ReconciliationPlan::new(ctx.clone());
        plan.instances.clone_from(&discovery.instances);
        Self {
            store,
            registry,
            resolver: Resolver::new(store, registry, ctx, discovery),
            as_of,
            plan,
        }
    }

    pub(crate) fn into_plan(self) -> ReconciliationPlan {
        self.plan
    }

    /// Record a non-fatal condition and forward it to the device log.
    pub(crate) fn notice(&mut self, kind: NoticeKind, subject: &str, message: impl Into<String>) {
        let notice = Notice::new(kind, subject, message);
        warn!(kind = %notice.kind, subject = %notice.subject, "{}", notice.message);
        self.store.log(&notice.to_string());
        self.plan.notices.push(notice);
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Cached value when its marker satisfies the run's `as_of`, otherwise
    /// a fresh read. Empty and object nodes come back as `None`.
    async fn observe(&self, path: &str) -> Result<Option<String>, ontctl_api::Error> {
        match self.store.observed(path).await {
            Ok(Some(obs)) if obs.freshness.satisfies(self.as_of) => {
                debug!(path, freshness = %obs.freshness, "using cached observation");
                return Ok(obs.value);
            }
            Ok(Some(obs)) => {
                debug!(path, cached = %obs.freshness, required = %self.as_of, "cache stale, re-reading");
            }
            Ok(None) => {}
            Err(e) => debug!(path, error = %e, "cache lookup failed, reading"),
        }
        let read = self.store.read(path).await?;
        Ok(read.non_empty().map(str::to_owned))
    }

    fn path_not_found(&mut self, key: &CapabilityKey, reason: &NotFoundReason) {
        let kind = match reason {
            NotFoundReason::Misaligned(_) => NoticeKind::Misaligned,
            _ => NoticeKind::PathNotFound,
        };
        let err = CoreError::PathNotFound {
            capability: key.to_string(),
            context: reason.to_string(),
        };
        self.notice(kind, key.as_str(), err.to_string());
    }

    async fn resolve(&mut self, key: &CapabilityKey) -> Option<String> {
        match self.resolver.resolve(key).await {
            Resolution::Found(path) => Some(path),
            Resolution::NotApplicable => None,
            Resolution::NotFound(reason) => {
                self.path_not_found(key, &reason);
                None
            }
        }
    }

    /// Resolve and observe a read-only value. Failures become notices.
    async fn read_value(&mut self, key: &CapabilityKey) -> Option<String> {
        let path = self.resolve(key).await?;
        match self.observe(&path).await {
            Ok(value) => value,
            Err(e) => {
                let err = CoreError::from(e);
                self.notice(NoticeKind::ReadFailure, key.as_str(), err.to_string());
                None
            }
        }
    }

    // ── Tags ─────────────────────────────────────────────────────────

    /// Log the inventory line and emit identity tags.
    pub(crate) async fn identify(&mut self, bands: &BTreeSet<Band>) {
        let firmware = self.read_value(&keys::FIRMWARE_VERSION.into()).await;
        let identity = &self.plan.device.identity;
        let line = format!(
            "Inventory: {} {} SN:{} FW:{}",
            identity.manufacturer,
            identity.product_class,
            identity.serial,
            firmware.as_deref().unwrap_or("unknown"),
        );
        info!("{line}");
        self.store.log(&line);

        let tags = identity_tags(&self.plan.device, self.registry, firmware.as_deref(), bands);
        self.plan.tags.extend(tags);
    }

    /// Evaluate receive power against `thresholds` and emit both optical
    /// tags. Vendors without an optical parameter are skipped silently.
    pub(crate) async fn optical(&mut self, thresholds: OpticalThresholds) {
        let key = CapabilityKey::from(keys::OPTICAL_RX_POWER);
        let path = match self.resolver.resolve(&key).await {
            Resolution::Found(path) => path,
            Resolution::NotApplicable => {
                info!(vendor = self.plan.device.vendor_name(), "no optical power parameter, skipping");
                return;
            }
            Resolution::NotFound(reason) => {
                self.path_not_found(&key, &reason);
                return;
            }
        };
        let raw = match self.observe(&path).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                let err = CoreError::from(e);
                self.notice(NoticeKind::ReadFailure, key.as_str(), err.to_string());
                return;
            }
        };
        let Ok(rx_power) = raw.trim().parse::<f64>() else {
            let err = CoreError::NumericParse {
                capability: key.to_string(),
                value: raw,
            };
            self.notice(NoticeKind::NumericParse, key.as_str(), err.to_string());
            return;
        };

        let alarm = thresholds.evaluate(rx_power);
        info!(
            rx_power,
            warning = alarm.warning,
            critical = alarm.critical,
            "optical power evaluated"
        );
        self.plan.tags.extend(optical_tags(alarm));
    }

    // ── Diff ─────────────────────────────────────────────────────────

    /// Compare each desired attribute with the device and emit a directive
    /// for every difference.
    pub(crate) async fn diff(&mut self, desired: Vec<Desired>) {
        for Desired { key, value } in desired {
            let Some(path) = self.resolve(&key).await else {
                continue;
            };
            let current = match self.observe(&path).await {
                Ok(current) => current,
                Err(e) => {
                    let err = CoreError::from(e);
                    self.notice(NoticeKind::ReadFailure, key.as_str(), err.to_string());
                    continue;
                }
            };

            if value.matches(current.as_deref().unwrap_or_default()) {
                debug!(capability = %key, %path, "in sync");
                self.plan.in_sync.push(key);
                continue;
            }
            debug!(capability = %key, %path, desired = %value, "differs");
            let current = if value.is_secret() { None } else { current };
            self.plan.directives.push(WriteDirective {
                capability: key,
                path,
                value,
                current,
                existed_before: true,
                instance: None,
            });
        }
    }

    // ── Port forwarding ──────────────────────────────────────────────

    /// Match each rule to an existing mapping by external port and protocol
    /// (case-insensitive). A matched mapping has its remaining members
    /// diffed in place; an unmatched rule is appended as a new instance at
    /// the next free index. A rule repeated within the policy is used once.
    pub(crate) async fn port_rules(&mut self, intent: &PortForwardIntent) {
        let key = CapabilityKey::from(match intent.wan {
            WanConnectionKind::Ip => keys::PORT_MAPPINGS_IP,
            WanConnectionKind::Ppp => keys::PORT_MAPPINGS_PPP,
        });
        let base = match self.resolver.resolve_collection(&key) {
            Resolution::Found(base) => base,
            Resolution::NotApplicable => return,
            Resolution::NotFound(reason) => {
                self.path_not_found(&key, &reason);
                return;
            }
        };
        let mut indices = match list_indices(self.store, &base).await {
            Ok(indices) => indices,
            Err(e) => {
                let err = CoreError::from(e);
                self.notice(NoticeKind::ReadFailure, key.as_str(), err.to_string());
                return;
            }
        };

        let mut on_device = Vec::with_capacity(indices.len());
        for index in &indices {
            let instance = format!("{base}.{index}");
            if let Some(identity) = self.existing_rule(&instance).await {
                on_device.push((identity, instance));
            }
        }

        let mut planned = Vec::with_capacity(intent.rules.len());
        let mut in_sync = false;
        for rule in &intent.rules {
            let identity = (rule.external_port.to_string(), rule.protocol.to_uppercase());
            if planned.contains(&identity) {
                self.notice(
                    NoticeKind::DuplicateRule,
                    key.as_str(),
                    format!(
                        "{} {} listed more than once, using the first",
                        identity.1, rule.external_port
                    ),
                );
                continue;
            }
            planned.push(identity.clone());

            let existing = on_device
                .iter()
                .find(|(id, _)| *id == identity)
                .map(|(_, instance)| instance.clone());
            if let Some(instance) = existing {
                if self.update_rule(&instance, rule).await {
                    debug!(port = rule.external_port, protocol = %identity.1, "mapping already present");
                    in_sync = true;
                }
                continue;
            }

            let index = next_free_index(&indices);
            indices.push(index);
            let instance = NewInstance {
                base: base.clone(),
                index,
            };
            self.append_rule(&key, &instance, rule);
        }
        if in_sync {
            self.plan.in_sync.push(key);
        }
    }

    /// External port and protocol of an existing mapping, upper-cased.
    async fn existing_rule(&self, instance: &str) -> Option<(String, String)> {
        let mut fields = Vec::with_capacity(2);
        for member in [keys::PORT_MAPPING_EXTERNAL_PORT, keys::PORT_MAPPING_PROTOCOL] {
            let path = self
                .resolver
                .resolve_member(&member.into(), instance)
                .path()
                .map(str::to_owned)?;
            let value = self.observe(&path).await.ok().flatten()?;
            fields.push(value.trim().to_uppercase());
        }
        let protocol = fields.pop()?;
        let port = fields.pop()?;
        Some((port, protocol))
    }

    /// Diff the non-identity members of `rule` against the mapping at
    /// `instance`. Returns `true` when nothing needs writing.
    async fn update_rule(&mut self, instance: &str, rule: &PortRule) -> bool {
        const IDENTITY: [&str; 2] = [keys::PORT_MAPPING_EXTERNAL_PORT, keys::PORT_MAPPING_PROTOCOL];

        let mut converged = true;
        for Desired { key, value } in rule_members(rule) {
            if IDENTITY.contains(&key.as_str()) {
                continue;
            }
            let path = match self.resolver.resolve_member(&key, instance) {
                Resolution::Found(path) => path,
                Resolution::NotApplicable => continue,
                Resolution::NotFound(reason) => {
                    self.path_not_found(&key, &reason);
                    continue;
                }
            };
            let current = match self.observe(&path).await {
                Ok(current) => current,
                Err(e) => {
                    let err = CoreError::from(e);
                    self.notice(NoticeKind::ReadFailure, key.as_str(), err.to_string());
                    converged = false;
                    continue;
                }
            };
            if value.matches(current.as_deref().unwrap_or_default()) {
                continue;
            }
            debug!(capability = %key, %path, desired = %value, "mapping member differs");
            converged = false;
            self.plan.directives.push(WriteDirective {
                capability: key,
                path,
                value,
                current,
                existed_before: true,
                instance: None,
            });
        }
        converged
    }

    fn append_rule(&mut self, collection: &CapabilityKey, instance: &NewInstance, rule: &PortRule) {
        let instance_path = instance.path();
        debug!(collection = %collection, path = %instance_path, "appending port mapping");
        for Desired { key, value } in rule_members(rule) {
            match self.resolver.resolve_member(&key, &instance_path) {
                Resolution::Found(path) => self.plan.directives.push(WriteDirective {
                    capability: key,
                    path,
                    value,
                    current: None,
                    existed_before: false,
                    instance: Some(instance.clone()),
                }),
                Resolution::NotApplicable => {}
                Resolution::NotFound(reason) => self.path_not_found(&key, &reason),
            }
        }
    }
}
