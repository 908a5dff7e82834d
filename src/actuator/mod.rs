//! Provider drivers for DNSRecord resources
//!
//! An [`Actuator`] performs the external calls for one provider type. The
//! reconciler decides *when* each method runs; the actuator only talks to the
//! provider.

mod dry_run;

pub use dry_run::DryRunActuator;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::crd::{Cluster, DNSRecord};

/// Errors reported by an actuator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActuatorError {
    /// Transient provider or network failure
    #[error("{0}")]
    Retryable(String),

    /// Non-recoverable failure; needs operator intervention
    #[error("{0}")]
    Fatal(String),

    /// Retryable failure with an explicit backoff hint
    #[error("{reason} (retry in {delay:?})")]
    RequeueAfter { delay: Duration, reason: String },
}

impl ActuatorError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        ActuatorError::Retryable(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        ActuatorError::Fatal(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, ActuatorError::Fatal(_))
    }
}

/// Capability set every DNS provider driver implements
///
/// `cluster` is `None` for records living in the garden namespace.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Create or update the record in the provider
    async fn reconcile(
        &self,
        record: &DNSRecord,
        cluster: Option<&Cluster>,
    ) -> Result<(), ActuatorError>;

    /// Delete the record from the provider
    async fn delete(&self, record: &DNSRecord, cluster: Option<&Cluster>)
        -> Result<(), ActuatorError>;

    /// Re-establish the record after it was migrated to this control plane
    async fn restore(
        &self,
        record: &DNSRecord,
        cluster: Option<&Cluster>,
    ) -> Result<(), ActuatorError>;

    /// Prepare the record for being handed over to another control plane
    async fn migrate(
        &self,
        record: &DNSRecord,
        cluster: Option<&Cluster>,
    ) -> Result<(), ActuatorError>;
}
