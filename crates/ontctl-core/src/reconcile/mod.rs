// ── Reconciliation engine ──
//
// Detect → validate policy → discover → resolve/diff → emit, for one device
// at a time. A `Reconciler` is cheap to clone and holds only immutable
// state, so one instance can serve many concurrent device runs.

mod apply;
mod desired;
mod session;
mod tags;

use std::sync::Arc;

use ontctl_api::ParameterStore;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::detect;
use crate::discover::{self, Discovery};
use crate::error::CoreError;
use crate::model::{
    CapabilityKey, DeviceContext, Notice, NoticeKind, ReconciliationIntent, ReconciliationPlan,
    RunReport,
};
use crate::policy::{self, ValidatedPolicy};
use crate::registry::CapabilityRegistry;
use crate::resolve::{Resolution, Resolver};

use self::session::PlanSession;

pub use self::tags::{OPTICAL_CRITICAL, OPTICAL_WARNING};

/// The reconciliation engine.
///
/// Cheaply cloneable via `Arc<ReconcilerInner>`. Every run borrows the
/// store for its duration; nothing device-specific is kept between runs.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<ReconcilerInner>,
}

struct ReconcilerInner {
    registry: Arc<CapabilityRegistry>,
    config: EngineConfig,
}

impl Reconciler {
    /// Engine over the builtin capability table.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(config, CapabilityRegistry::shared())
    }

    pub fn with_registry(config: EngineConfig, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            inner: Arc::new(ReconcilerInner { registry, config }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.inner.registry
    }

    // ── Stages ───────────────────────────────────────────────────────

    /// Identify vendor and schema generation. The only fatal stage.
    pub async fn detect(&self, store: &dyn ParameterStore) -> Result<DeviceContext, CoreError> {
        detect::detect(store, &self.inner.config.aliases).await
    }

    pub async fn discover(&self, store: &dyn ParameterStore, ctx: &DeviceContext) -> Discovery {
        discover::discover(store, &self.inner.registry, ctx).await
    }

    pub fn validate(&self, doc: &Value) -> ValidatedPolicy {
        policy::validate(doc, &self.inner.config)
    }

    /// Build the plan for an already-validated intent.
    pub async fn plan(
        &self,
        store: &dyn ParameterStore,
        intent: &ReconciliationIntent,
    ) -> Result<ReconciliationPlan, CoreError> {
        let ctx = self.detect(store).await?;
        Ok(self.plan_for(store, &ctx, intent).await)
    }

    /// Like [`plan`](Self::plan), with every policy error carried into the
    /// plan as a notice.
    pub async fn plan_policy(
        &self,
        store: &dyn ParameterStore,
        policy: &ValidatedPolicy,
    ) -> Result<ReconciliationPlan, CoreError> {
        let ctx = self.detect(store).await?;
        let mut plan = self.plan_for(store, &ctx, &policy.intent).await;
        let mut notices: Vec<Notice> = policy
            .errors
            .iter()
            .map(|err| {
                let message = CoreError::from(err.clone()).to_string();
                store.log(&message);
                Notice::new(NoticeKind::Policy, err.field.as_str(), message)
            })
            .collect();
        notices.append(&mut plan.notices);
        plan.notices = notices;
        Ok(plan)
    }

    /// Plan against a known device context.
    pub async fn plan_for(
        &self,
        store: &dyn ParameterStore,
        ctx: &DeviceContext,
        intent: &ReconciliationIntent,
    ) -> ReconciliationPlan {
        let discovery = self.discover(store, ctx).await;
        let mut session =
            PlanSession::new(store, &self.inner.registry, ctx, &discovery, intent.as_of);

        session.identify(&discovery.bands()).await;
        session.diff(desired::desired_attributes(intent)).await;
        if let Some(port_forward) = &intent.port_forward {
            session.port_rules(port_forward).await;
        }
        if let Some(thresholds) = intent.optical {
            session.optical(thresholds).await;
        }

        let plan = session.into_plan();
        info!(
            vendor = plan.device.vendor_name(),
            schema = %plan.device.schema,
            directives = plan.directives.len(),
            in_sync = plan.in_sync.len(),
            notices = plan.notices.len(),
            "plan built"
        );
        plan
    }

    /// Issue every directive and tag in `plan`.
    pub async fn apply(&self, store: &dyn ParameterStore, plan: ReconciliationPlan) -> RunReport {
        apply::apply_plan(store, plan).await
    }

    /// Full run for one device: detect, validate, plan, apply.
    pub async fn run(&self, store: &dyn ParameterStore, doc: &Value) -> Result<RunReport, CoreError> {
        let policy = self.validate(doc);
        let plan = self.plan_policy(store, &policy).await?;
        Ok(self.apply(store, plan).await)
    }

    // ── Read-through ─────────────────────────────────────────────────

    /// Current value of any parameter capability on this device, read
    /// fresh. `Ok(None)` when the device has no such parameter or it is
    /// empty.
    pub async fn read_capability(
        &self,
        store: &dyn ParameterStore,
        key: &CapabilityKey,
    ) -> Result<Option<String>, CoreError> {
        let ctx = self.detect(store).await?;
        let discovery = self.discover(store, &ctx).await;
        let resolver = Resolver::new(store, &self.inner.registry, &ctx, &discovery);
        match resolver.resolve(key).await {
            Resolution::Found(path) => {
                let read = store.read(&path).await?;
                debug!(capability = %key, %path, "read through");
                Ok(read.non_empty().map(str::to_owned))
            }
            Resolution::NotApplicable => Ok(None),
            Resolution::NotFound(reason) => Err(CoreError::PathNotFound {
                capability: key.to_string(),
                context: reason.to_string(),
            }),
        }
    }
}
