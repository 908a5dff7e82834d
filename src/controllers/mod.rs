//! Kubernetes controllers for the DNSRecord CRD
//!
//! This module contains the controller that watches for CRD changes and
//! triggers reconciliation.

mod dns_record_controller;

pub use dns_record_controller::run as run_dns_record_controller;

use std::sync::Arc;
use std::time::Duration;

use kube::Client;

use crate::actuator::Actuator;
use crate::config::Config;
use crate::ownership::{OwnerRecordChecker, Watchdog};
use crate::reconcilers::{ClassifyPolicy, Reconciler};
use crate::store::{ConflictRetry, KubeRecordStore, RecordClient, RecordStore};

/// Shared context for the controller
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// The DNSRecord state machine
    pub reconciler: Reconciler,
}

impl Context {
    /// Wire the reconciler against the Kubernetes API
    pub fn new(client: Client, actuator: Arc<dyn Actuator>, config: &Config) -> Self {
        let store: Arc<dyn RecordStore> = Arc::new(KubeRecordStore::new(client.clone()));
        let records = RecordClient::new(
            store.clone(),
            ConflictRetry::with_max_attempts(config.max_conflict_retries),
        );
        let ownership = Arc::new(OwnerRecordChecker::new(store, config.owner_id.clone()));
        let watchdog = Watchdog::new(
            ownership,
            Duration::from_secs(config.owner_check_interval_secs),
        );
        let policy = ClassifyPolicy {
            ignore_operation_annotation: config.ignore_operation_annotation,
            provider_type: config.provider_type.clone(),
        };

        Self {
            client,
            reconciler: Reconciler::new(
                actuator,
                records,
                watchdog,
                policy,
                config.garden_namespace.clone(),
            ),
        }
    }
}
