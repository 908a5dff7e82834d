//! DNSRecord Custom Resource Definition

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{
    get_condition, Condition, ConditionStatus, LastError, LastOperation, CONDITION_TYPE_CREATED,
    OPERATION_ANNOTATION,
};

/// DNSRecord resource specification
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "DNSRecord",
    plural = "dnsrecords",
    singular = "dnsrecord",
    shortname = "dns",
    namespaced,
    status = "DNSRecordStatus",
    printcolumn = r#"{"name": "Type", "type": "string", "jsonPath": ".spec.type"}"#,
    printcolumn = r#"{"name": "Domain", "type": "string", "jsonPath": ".spec.name"}"#,
    printcolumn = r#"{"name": "Status", "type": "string", "jsonPath": ".status.lastOperation.state"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordSpec {
    /// DNS provider type (e.g. aws-route53)
    #[serde(rename = "type")]
    pub type_: String,

    /// Secret holding the provider credentials
    pub secret_ref: SecretReference,

    /// Provider region, if the provider is regional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Hosted zone ID; discovered by the provider when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Fully qualified domain name of the record
    pub name: String,

    /// Record type
    pub record_type: DNSRecordType,

    /// Record values
    pub values: Vec<String>,

    /// Time to live in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

/// Reference to a secret by name and namespace
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Supported DNS record types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum DNSRecordType {
    A,
    AAAA,
    CNAME,
    TXT,
}

/// DNSRecord status
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordStatus {
    /// Last operation performed by the controller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    /// Most recent error, cleared on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<LastError>,

    /// Observed generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Hosted zone the record was written to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl DNSRecord {
    /// `namespace/name` key used in logs and watchdog keys
    pub fn key(&self) -> String {
        format!(
            "{}/{}",
            self.namespace().unwrap_or_default(),
            self.name_any()
        )
    }

    pub fn last_operation(&self) -> Option<&LastOperation> {
        self.status.as_ref().and_then(|s| s.last_operation.as_ref())
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    /// Status of the Created condition, Unknown when the condition is missing
    pub fn created_condition_status(&self) -> ConditionStatus {
        get_condition(self.conditions(), CONDITION_TYPE_CREATED)
            .map(|c| c.status)
            .unwrap_or(ConditionStatus::Unknown)
    }

    /// Value of the operation annotation, if any
    pub fn operation_annotation(&self) -> Option<&str> {
        self.annotations()
            .get(OPERATION_ANNOTATION)
            .map(String::as_str)
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers().iter().any(|f| f == finalizer)
    }
}
