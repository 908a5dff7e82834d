//! Derives the lifecycle phase for a DNSRecord
//!
//! Everything here is a pure function of the record and its Cluster as read
//! in the current reconciliation; nothing is remembered between calls.

use kube::ResourceExt;

use crate::crd::{
    Cluster, DNSRecord, LastOperation, LastOperationType, OPERATION_ANNOTATION, OPERATION_MIGRATE,
    OPERATION_RESTORE,
};

/// Phase the state machine enters for one reconciliation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Create or update; carries the derived operation type
    Reconcile(LastOperationType),
    Delete,
    Restore,
    Migrate,
    Skip(SkipReason),
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Reconcile(_) => "reconcile",
            Phase::Delete => "delete",
            Phase::Restore => "restore",
            Phase::Migrate => "migrate",
            Phase::Skip(_) => "skip",
        }
    }
}

/// Why a reconciliation was skipped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Record belongs to a different provider type
    OtherProviderType,
    /// Record was handed over to another control plane
    AlreadyMigrated,
    /// Shoot is in a terminal failed state
    ShootFailed,
    /// Nothing changed and no operation was requested
    NoPendingOperation,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::OtherProviderType => "other_provider_type",
            SkipReason::AlreadyMigrated => "already_migrated",
            SkipReason::ShootFailed => "shoot_failed",
            SkipReason::NoPendingOperation => "no_pending_operation",
        }
    }
}

/// Knobs influencing classification
#[derive(Clone, Debug, Default)]
pub struct ClassifyPolicy {
    /// Reconcile on every change instead of waiting for an operation annotation
    pub ignore_operation_annotation: bool,
    /// Only handle records of this provider type
    pub provider_type: Option<String>,
}

/// Compute the operation type from metadata and the previous operation
pub fn compute_operation_type(record: &DNSRecord) -> LastOperationType {
    let last_operation = record.last_operation();

    match record.operation_annotation() {
        Some(OPERATION_MIGRATE) => return LastOperationType::Migrate,
        Some(OPERATION_RESTORE) => return LastOperationType::Restore,
        _ => {}
    }

    if record.metadata.deletion_timestamp.is_some() {
        return LastOperationType::Delete;
    }

    match last_operation {
        None => LastOperationType::Create,
        Some(op) if unfinished(op, LastOperationType::Create) => LastOperationType::Create,
        Some(op) if unfinished(op, LastOperationType::Migrate) => LastOperationType::Migrate,
        Some(op) if unfinished(op, LastOperationType::Restore) => LastOperationType::Restore,
        Some(_) => LastOperationType::Reconcile,
    }
}

fn unfinished(op: &LastOperation, type_: LastOperationType) -> bool {
    op.type_ == type_ && !op.succeeded()
}

/// Whether the record was successfully migrated away from this control plane
pub fn is_migrated(record: &DNSRecord) -> bool {
    record
        .last_operation()
        .map(|op| op.type_ == LastOperationType::Migrate && op.succeeded())
        .unwrap_or(false)
}

/// Whether an ordinary reconcile is due when operation annotations are honored
fn has_pending_operation(record: &DNSRecord) -> bool {
    if record.annotations().contains_key(OPERATION_ANNOTATION) {
        return true;
    }

    let Some(status) = &record.status else {
        return true;
    };

    let unfinished = status
        .last_operation
        .as_ref()
        .map(|op| !op.succeeded())
        .unwrap_or(true);

    unfinished || status.observed_generation != record.metadata.generation
}

/// Select the phase for `record`
pub fn classify(record: &DNSRecord, cluster: Option<&Cluster>, policy: &ClassifyPolicy) -> Phase {
    if let Some(provider_type) = &policy.provider_type {
        if &record.spec.type_ != provider_type {
            return Phase::Skip(SkipReason::OtherProviderType);
        }
    }

    let operation = compute_operation_type(record);

    if is_migrated(record)
        && operation != LastOperationType::Migrate
        && operation != LastOperationType::Restore
    {
        return Phase::Skip(SkipReason::AlreadyMigrated);
    }

    let cluster_migrating = cluster.map(Cluster::is_migrating).unwrap_or(false);
    if operation == LastOperationType::Migrate || cluster_migrating {
        return Phase::Migrate;
    }

    if record.metadata.deletion_timestamp.is_some() {
        return Phase::Delete;
    }

    if operation == LastOperationType::Restore {
        return Phase::Restore;
    }

    if cluster.map(Cluster::is_failed).unwrap_or(false) {
        return Phase::Skip(SkipReason::ShootFailed);
    }

    if !policy.ignore_operation_annotation && !has_pending_operation(record) {
        return Phase::Skip(SkipReason::NoPendingOperation);
    }

    Phase::Reconcile(operation)
}
