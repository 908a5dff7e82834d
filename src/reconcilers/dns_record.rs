//! DNSRecord reconciler
//!
//! Drives a DNSRecord through its lifecycle:
//! - Reconcile (create/update) and Restore, guarded by the ownership watchdog
//! - Delete, gated by the finalizer and the Created condition
//! - Migrate, which releases every claim this control plane holds
//!
//! Each call re-reads the record and derives its decision from what is
//! persisted, so it can resume after a crash from any intermediate state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use tracing::{debug, info, warn};

use super::operation::{classify, ClassifyPolicy, Phase, SkipReason};
use crate::actuator::{Actuator, ActuatorError};
use crate::crd::{
    Cluster, ConditionStatus, DNSRecord, LastOperationType, OPERATION_ANNOTATION,
    OPERATION_RECONCILE,
};
use crate::error::{Error, Result};
use crate::metrics;
use crate::ownership::{owner_record_name, OwnershipScope, Watchdog};
use crate::status::{created_condition_false, created_condition_true, StatusUpdater};
use crate::store::RecordClient;

/// Finalizer name for DNSRecord resources
pub const FINALIZER_NAME: &str = "extensions.gardener.cloud/dnsrecord";

/// Requeue delay while the shoot is failed
const FAILED_SHOOT_REQUEUE: Duration = Duration::from_secs(600);

/// The DNSRecord lifecycle state machine
pub struct Reconciler {
    actuator: Arc<dyn Actuator>,
    client: RecordClient,
    status: StatusUpdater,
    watchdog: Watchdog,
    policy: ClassifyPolicy,
    garden_namespace: String,
}

impl Reconciler {
    pub fn new(
        actuator: Arc<dyn Actuator>,
        client: RecordClient,
        watchdog: Watchdog,
        policy: ClassifyPolicy,
        garden_namespace: impl Into<String>,
    ) -> Self {
        Self {
            actuator,
            status: StatusUpdater::new(client.clone()),
            client,
            watchdog,
            policy,
            garden_namespace: garden_namespace.into(),
        }
    }

    pub fn policy(&self) -> &ClassifyPolicy {
        &self.policy
    }

    /// Reconcile the DNSRecord `namespace/name`
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<Action> {
        let mut record = match self.client.get(namespace, name).await {
            Ok(record) => record,
            Err(Error::NotFound(_)) => {
                debug!(dnsrecord = %format!("{}/{}", namespace, name), "DNSRecord is gone, nothing to do");
                return Ok(Action::await_change());
            }
            Err(e) => return Err(e),
        };

        let cluster = if namespace == self.garden_namespace {
            None
        } else {
            let cluster = self
                .client
                .get_cluster(namespace)
                .await?
                .ok_or_else(|| Error::NotFound(format!("cluster {}", namespace)))?;
            Some(cluster)
        };

        let phase = classify(&record, cluster.as_ref(), &self.policy);
        if let Phase::Skip(reason) = phase {
            return Ok(skip(&record, reason));
        }

        metrics::RECONCILIATIONS
            .with_label_values(&[phase.as_str()])
            .inc();
        let _timer = metrics::RECONCILE_DURATION
            .with_label_values(&[phase.as_str()])
            .start_timer();

        let scope = match phase {
            Phase::Migrate => None,
            _ => self.acquire_ownership(&record, cluster.as_ref()).await?,
        };

        let result = match phase {
            Phase::Migrate => self.migrate(&mut record, cluster.as_ref()).await,
            Phase::Delete => self.delete(&mut record, cluster.as_ref(), scope.as_ref()).await,
            Phase::Restore => self.restore(&mut record, cluster.as_ref(), scope.as_ref()).await,
            Phase::Reconcile(op) => {
                self.reconcile_record(&mut record, cluster.as_ref(), scope.as_ref(), op)
                    .await
            }
            Phase::Skip(_) => Ok(()),
        };
        drop(scope);

        match result {
            Ok(()) => Ok(Action::await_change()),
            Err(e) => {
                let retryable = if e.is_retryable() { "true" } else { "false" };
                metrics::RECONCILIATION_ERRORS
                    .with_label_values(&[phase.as_str(), retryable])
                    .inc();
                reconcile_err(e)
            }
        }
    }

    /// Establish the ownership scope for provider calls, if one is needed
    ///
    /// Garden records and the shoot's own owner record are never checked.
    async fn acquire_ownership(
        &self,
        record: &DNSRecord,
        cluster: Option<&Cluster>,
    ) -> Result<Option<OwnershipScope>> {
        let Some(shoot) = cluster.and_then(|c| c.shoot()) else {
            return Ok(None);
        };
        if record.metadata.name.as_deref() == Some(owner_record_name(&shoot.name).as_str()) {
            return Ok(None);
        }

        let namespace = record.metadata.namespace.as_deref().unwrap_or_default();
        let key = format!("dnsrecord:{}", record.key());
        let scope = self.watchdog.acquire(namespace, &shoot.name, &key).await?;
        Ok(Some(scope))
    }

    async fn reconcile_record(
        &self,
        record: &mut DNSRecord,
        cluster: Option<&Cluster>,
        scope: Option<&OwnershipScope>,
        op: LastOperationType,
    ) -> Result<()> {
        self.client.ensure_finalizer(record, FINALIZER_NAME).await?;
        self.status
            .processing(record, op, "Reconciling the dnsrecord")
            .await?;

        // Consumed only once Processing is persisted.
        if record.operation_annotation() == Some(OPERATION_RECONCILE) {
            self.client
                .remove_annotation(record, OPERATION_ANNOTATION)
                .await?;
        }

        info!(dnsrecord = %record.key(), operation = %op, "Starting the reconciliation of dnsrecord");
        let outcome = in_scope(scope, self.actuator.reconcile(record, cluster)).await;
        if let Err(e) = outcome {
            return self
                .fail(record, op, e, "Error reconciling dnsrecord", true)
                .await;
        }

        self.status
            .success(
                record,
                op,
                "Successfully reconciled dnsrecord",
                &[created_condition_true],
            )
            .await
    }

    async fn restore(
        &self,
        record: &mut DNSRecord,
        cluster: Option<&Cluster>,
        scope: Option<&OwnershipScope>,
    ) -> Result<()> {
        let op = LastOperationType::Restore;
        self.client.ensure_finalizer(record, FINALIZER_NAME).await?;
        self.status
            .processing(record, op, "Restoring the dnsrecord")
            .await?;

        info!(dnsrecord = %record.key(), "Starting the restoration of dnsrecord");
        let outcome = in_scope(scope, self.actuator.restore(record, cluster)).await;
        if let Err(e) = outcome {
            return self
                .fail(record, op, e, "Error restoring dnsrecord", true)
                .await;
        }

        self.status
            .success(
                record,
                op,
                "Successfully restored dnsrecord",
                &[created_condition_true],
            )
            .await?;

        self.client
            .remove_annotation(record, OPERATION_ANNOTATION)
            .await
    }

    async fn migrate(&self, record: &mut DNSRecord, cluster: Option<&Cluster>) -> Result<()> {
        let op = LastOperationType::Migrate;
        self.status
            .processing(record, op, "Migrating the dnsrecord")
            .await?;

        info!(dnsrecord = %record.key(), "Starting the migration of dnsrecord");
        if let Err(e) = self.actuator.migrate(record, cluster).await {
            return self
                .fail(record, op, e.into(), "Error migrating dnsrecord", false)
                .await;
        }

        self.status
            .success(record, op, "Successfully migrated dnsrecord", &[])
            .await?;

        info!(dnsrecord = %record.key(), "Removing all finalizers");
        self.client.remove_all_finalizers(record).await?;

        // A record already marked for deletion is gone once its finalizers are.
        match self
            .client
            .remove_annotation(record, OPERATION_ANNOTATION)
            .await
        {
            Err(Error::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn delete(
        &self,
        record: &mut DNSRecord,
        cluster: Option<&Cluster>,
        scope: Option<&OwnershipScope>,
    ) -> Result<()> {
        if !record.has_finalizer(FINALIZER_NAME) {
            info!(dnsrecord = %record.key(), "Deleting dnsrecord causes a no-op as there is no finalizer");
            return Ok(());
        }

        match record.created_condition_status() {
            ConditionStatus::True | ConditionStatus::Unknown => {
                let op = LastOperationType::Delete;
                self.status
                    .processing(record, op, "Deleting the dnsrecord")
                    .await?;

                info!(dnsrecord = %record.key(), "Starting the deletion of dnsrecord");
                let outcome = in_scope(scope, self.actuator.delete(record, cluster)).await;
                if let Err(e) = outcome {
                    return self
                        .fail(record, op, e, "Error deleting dnsrecord", false)
                        .await;
                }

                self.status
                    .success(record, op, "Successfully deleted dnsrecord", &[])
                    .await?;
            }
            ConditionStatus::False => {
                info!(dnsrecord = %record.key(), "Deleting dnsrecord is no-op as not created");
            }
        }

        info!(dnsrecord = %record.key(), "Removing finalizer");
        self.client.remove_finalizer(record, FINALIZER_NAME).await
    }

    /// Persist an Error status for `cause` and hand the cause back
    ///
    /// Ownership loss leaves the status untouched at Processing. Only
    /// create/update and restore failures may flip Created to False.
    async fn fail(
        &self,
        record: &mut DNSRecord,
        op: LastOperationType,
        cause: Error,
        description: &str,
        mark_not_created: bool,
    ) -> Result<()> {
        if matches!(cause, Error::OwnershipLost(_)) {
            warn!(dnsrecord = %record.key(), operation = %op, "Ownership lost, leaving status unchanged");
            return Err(cause);
        }

        warn!(
            dnsrecord = %record.key(),
            operation = %op,
            error = %cause,
            retryable = cause.is_retryable(),
            "{}", description
        );

        if mark_not_created {
            self.status
                .error(record, op, &cause, description, &[created_condition_false])
                .await?;
        } else {
            self.status.error(record, op, &cause, description, &[]).await?;
        }
        Err(cause)
    }
}

/// Run an actuator call inside the ownership scope, if there is one
async fn in_scope<F>(scope: Option<&OwnershipScope>, call: F) -> Result<()>
where
    F: Future<Output = std::result::Result<(), ActuatorError>>,
{
    let call = async { call.await.map_err(Error::from) };
    match scope {
        Some(scope) => scope.run(call).await,
        None => call.await,
    }
}

fn skip(record: &DNSRecord, reason: SkipReason) -> Action {
    metrics::SKIPPED.with_label_values(&[reason.as_str()]).inc();
    match reason {
        SkipReason::ShootFailed => {
            info!(dnsrecord = %record.key(), "Skipping the reconciliation of dnsrecord of failed shoot");
            Action::requeue(FAILED_SHOOT_REQUEUE)
        }
        SkipReason::AlreadyMigrated => {
            warn!(dnsrecord = %record.key(), "Skipping operation on dnsrecord that was migrated away");
            Action::await_change()
        }
        SkipReason::OtherProviderType | SkipReason::NoPendingOperation => {
            debug!(dnsrecord = %record.key(), reason = reason.as_str(), "Skipping dnsrecord");
            Action::await_change()
        }
    }
}

/// Turn an explicit requeue request into a plain requeue
fn reconcile_err(err: Error) -> Result<Action> {
    match err {
        Error::Actuator(ActuatorError::RequeueAfter { delay, reason }) => {
            info!(reason = %reason, delay = ?delay, "Requeueing dnsrecord");
            Ok(Action::requeue(delay))
        }
        other => Err(other),
    }
}
