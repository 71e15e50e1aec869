// Plan application. Each directive is issued on its own; a refused or failed
// write is recorded and the rest of the plan still runs.

use std::collections::HashMap;

use ontctl_api::{ParameterStore, WriteErrorKind};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{
    AttributeOutcome, NewInstance, OutcomeStatus, ReconciliationPlan, RunReport, WriteDirective,
};

pub(crate) async fn apply_plan(store: &dyn ParameterStore, plan: ReconciliationPlan) -> RunReport {
    // Instance path actually created for each planned instance, or why not.
    let mut created: HashMap<NewInstance, Result<String, String>> = HashMap::new();
    let mut outcomes = Vec::with_capacity(plan.directives.len());

    for directive in &plan.directives {
        let target = match &directive.instance {
            None => Ok(directive.path.clone()),
            Some(instance) => {
                let actual = if let Some(actual) = created.get(instance) {
                    actual.clone()
                } else {
                    let actual = create(store, instance).await;
                    created.insert(instance.clone(), actual.clone());
                    actual
                };
                actual.map(|actual| rebase(&directive.path, &instance.path(), &actual))
            }
        };

        let outcome = match target {
            Ok(path) => write(store, directive, path).await,
            Err(message) => AttributeOutcome {
                capability: directive.capability.clone(),
                path: directive.path.clone(),
                status: OutcomeStatus::Error { message },
            },
        };
        outcomes.push(outcome);
    }

    let mut failed_tags = Vec::new();
    for tag in &plan.tags {
        if let Err(e) = store.set_tag(&tag.name, tag.value).await {
            warn!(tag = %tag.name, error = %e, "tag update failed");
            failed_tags.push(tag.name.clone());
        }
    }

    let report = RunReport {
        plan,
        outcomes,
        failed_tags,
    };
    info!(
        written = report.written(),
        failed = report.failures().count(),
        tags = report.plan.tags.len(),
        "plan applied"
    );
    report
}

async fn create(store: &dyn ParameterStore, instance: &NewInstance) -> Result<String, String> {
    match store.create_instance(&instance.base).await {
        Ok(index) if index == instance.index => Ok(instance.path()),
        Ok(index) => {
            warn!(
                base = %instance.base,
                planned = instance.index,
                assigned = index,
                "device assigned a different instance index"
            );
            Ok(format!("{}.{index}", instance.base))
        }
        Err(e) => {
            let err = CoreError::from(e);
            warn!(base = %instance.base, error = %err, "instance creation failed");
            store.log(&format!("create {} failed: {err}", instance.base));
            Err(format!("instance creation failed: {err}"))
        }
    }
}

/// Move `path` from the planned instance onto the one actually created.
fn rebase(path: &str, planned: &str, actual: &str) -> String {
    path.strip_prefix(planned)
        .map_or_else(|| path.to_owned(), |rest| format!("{actual}{rest}"))
}

async fn write(
    store: &dyn ParameterStore,
    directive: &WriteDirective,
    path: String,
) -> AttributeOutcome {
    let status = match store.write(&path, &directive.value).await {
        Ok(result) if result.ok => {
            debug!(capability = %directive.capability, %path, "written");
            OutcomeStatus::Written
        }
        Ok(result) => {
            let kind = result
                .error_kind
                .unwrap_or_else(|| WriteErrorKind::Rejected("no reason given".into()));
            let err = CoreError::WriteFailure {
                path: path.clone(),
                kind: kind.clone(),
            };
            warn!(capability = %directive.capability, "{err}");
            store.log(&err.to_string());
            OutcomeStatus::Rejected { kind }
        }
        Err(e) => {
            let err = CoreError::from(e);
            warn!(capability = %directive.capability, %path, error = %err, "write not issued");
            store.log(&format!("write {path} failed: {err}"));
            OutcomeStatus::Error {
                message: err.to_string(),
            }
        }
    };
    AttributeOutcome {
        capability: directive.capability.clone(),
        path,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebase_moves_member_paths() {
        assert_eq!(
            rebase("Device.NAT.PortMapping.4.ExternalPort", "Device.NAT.PortMapping.4", "Device.NAT.PortMapping.7"),
            "Device.NAT.PortMapping.7.ExternalPort"
        );
        assert_eq!(rebase("Other.Path", "Device.NAT.PortMapping.4", "X"), "Other.Path");
    }
}
