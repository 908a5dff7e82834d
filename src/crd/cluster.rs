//! Cluster Custom Resource Definition
//!
//! A Cluster object exists per shoot and is named after the shoot's control
//! plane namespace. The operator only ever reads it.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{LastOperation, LastOperationState, LastOperationType};

/// Cluster resource specification
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Cluster",
    plural = "clusters",
    singular = "cluster",
    printcolumn = r#"{"name": "Shoot", "type": "string", "jsonPath": ".spec.shoot.name"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Summary of the shoot owning this control plane namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shoot: Option<ShootSummary>,
}

/// The parts of a shoot the DNSRecord controller cares about
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShootSummary {
    /// Shoot name
    pub name: String,

    /// Project namespace of the shoot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,
}

impl Cluster {
    pub fn shoot(&self) -> Option<&ShootSummary> {
        self.spec.shoot.as_ref()
    }

    /// Whether the shoot is in a terminal failed state
    pub fn is_failed(&self) -> bool {
        self.shoot()
            .and_then(|s| s.last_operation.as_ref())
            .map(|op| op.state == LastOperationState::Failed)
            .unwrap_or(false)
    }

    /// Whether the shoot is being handed over to another control plane
    pub fn is_migrating(&self) -> bool {
        self.shoot()
            .and_then(|s| s.last_operation.as_ref())
            .map(|op| op.type_ == LastOperationType::Migrate && !op.succeeded())
            .unwrap_or(false)
    }
}
