//! Status types shared by the extension resources

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation carrying an operation hint for the controller
pub const OPERATION_ANNOTATION: &str = "gardener.cloud/operation";

/// Operation annotation value requesting an ordinary reconciliation
pub const OPERATION_RECONCILE: &str = "reconcile";

/// Operation annotation value requesting a restore after migration
pub const OPERATION_RESTORE: &str = "restore";

/// Operation annotation value requesting a migration to another control plane
pub const OPERATION_MIGRATE: &str = "migrate";

/// Condition type reporting whether the record was ever created in the provider
pub const CONDITION_TYPE_CREATED: &str = "Created";

/// Type of the last operation performed on a resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum LastOperationType {
    /// First reconciliation of a new resource
    Create,
    /// Any later reconciliation (the update case)
    Reconcile,
    Delete,
    Restore,
    Migrate,
}

impl LastOperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LastOperationType::Create => "Create",
            LastOperationType::Reconcile => "Reconcile",
            LastOperationType::Delete => "Delete",
            LastOperationType::Restore => "Restore",
            LastOperationType::Migrate => "Migrate",
        }
    }
}

impl fmt::Display for LastOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the last operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum LastOperationState {
    Processing,
    Succeeded,
    Error,
    /// Terminal failure, only ever observed on shoot operations
    Failed,
    /// Shoot states; never written to a DNSRecord
    Pending,
    Aborted,
}

/// Last operation performed on a resource
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastOperation {
    /// Operation type
    #[serde(rename = "type")]
    pub type_: LastOperationType,

    /// Operation state
    pub state: LastOperationState,

    /// Human-readable description
    pub description: String,

    /// Progress percentage (0-100)
    pub progress: i32,

    /// Time of the last update
    pub last_update_time: DateTime<Utc>,
}

impl LastOperation {
    /// Whether this operation finished successfully
    pub fn succeeded(&self) -> bool {
        self.state == LastOperationState::Succeeded
    }
}

/// Most recent error observed while operating on a resource
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastError {
    /// Error description
    pub description: String,

    /// Whether the controller expects the error to heal by retrying
    pub retryable: bool,

    /// Time of the last update
    pub last_update_time: DateTime<Utc>,
}

/// Status of a condition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Status condition
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type
    #[serde(rename = "type")]
    pub type_: String,

    /// Status (True, False, Unknown)
    pub status: ConditionStatus,

    /// Last time the status changed
    pub last_transition_time: DateTime<Utc>,

    /// Last time reason or message were touched
    pub last_update_time: DateTime<Utc>,

    /// Machine-readable reason
    pub reason: String,

    /// Human-readable message
    pub message: String,
}

/// Look up a condition by type
pub fn get_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}
