//! Persists last-operation progress and conditions

use chrono::{DateTime, Utc};
use tracing::debug;

use super::conditions::ConditionMutator;
use crate::crd::{
    DNSRecord, DNSRecordStatus, LastError, LastOperation, LastOperationState, LastOperationType,
};
use crate::error::{Error, Result};
use crate::store::RecordClient;

const PROGRESS_PROCESSING: i32 = 1;
const PROGRESS_ERROR: i32 = 50;
const PROGRESS_SUCCEEDED: i32 = 100;

/// Read-modify-write access to a record's status
#[derive(Clone)]
pub struct StatusUpdater {
    client: RecordClient,
}

impl StatusUpdater {
    pub fn new(client: RecordClient) -> Self {
        Self { client }
    }

    /// Mark `op` as in progress
    pub async fn processing(
        &self,
        record: &mut DNSRecord,
        op: LastOperationType,
        description: &str,
    ) -> Result<()> {
        let now = Utc::now();
        debug!(dnsrecord = %record.key(), operation = %op, "Updating status to Processing");
        self.client
            .mutate_status(record, |r| {
                let status = r.status.get_or_insert_with(DNSRecordStatus::default);
                status.last_operation = Some(last_operation(
                    op,
                    LastOperationState::Processing,
                    description,
                    PROGRESS_PROCESSING,
                    now,
                ));
                true
            })
            .await
    }

    /// Mark `op` as succeeded, clear the last error and apply `mutators`
    pub async fn success(
        &self,
        record: &mut DNSRecord,
        op: LastOperationType,
        description: &str,
        mutators: &[ConditionMutator],
    ) -> Result<()> {
        let now = Utc::now();
        debug!(dnsrecord = %record.key(), operation = %op, "Updating status to Succeeded");
        self.client
            .mutate_status(record, |r| {
                let generation = r.metadata.generation;
                let status = r.status.get_or_insert_with(DNSRecordStatus::default);
                status.last_operation = Some(last_operation(
                    op,
                    LastOperationState::Succeeded,
                    description,
                    PROGRESS_SUCCEEDED,
                    now,
                ));
                status.last_error = None;
                status.observed_generation = generation;
                apply_mutators(status, mutators, now);
                true
            })
            .await
    }

    /// Mark `op` as failed with `cause`, then apply `mutators`
    pub async fn error(
        &self,
        record: &mut DNSRecord,
        op: LastOperationType,
        cause: &Error,
        description: &str,
        mutators: &[ConditionMutator],
    ) -> Result<()> {
        let now = Utc::now();
        let description = format!("{}: {}", description, cause);
        let retryable = cause.is_retryable();
        debug!(
            dnsrecord = %record.key(),
            operation = %op,
            retryable = retryable,
            "Updating status to Error"
        );
        self.client
            .mutate_status(record, |r| {
                let generation = r.metadata.generation;
                let status = r.status.get_or_insert_with(DNSRecordStatus::default);
                status.last_operation = Some(last_operation(
                    op,
                    LastOperationState::Error,
                    &description,
                    PROGRESS_ERROR,
                    now,
                ));
                status.last_error = Some(LastError {
                    description: description.clone(),
                    retryable,
                    last_update_time: now,
                });
                status.observed_generation = generation;
                apply_mutators(status, mutators, now);
                true
            })
            .await
    }
}

fn last_operation(
    op: LastOperationType,
    state: LastOperationState,
    description: &str,
    progress: i32,
    now: DateTime<Utc>,
) -> LastOperation {
    LastOperation {
        type_: op,
        state,
        description: description.to_string(),
        progress,
        last_update_time: now,
    }
}

fn apply_mutators(status: &mut DNSRecordStatus, mutators: &[ConditionMutator], now: DateTime<Utc>) {
    for mutate in mutators {
        status.conditions = mutate(&status.conditions, now);
    }
}
