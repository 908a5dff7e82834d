//! Shoot ownership checks
//!
//! During a control plane migration two operators may see the same
//! DNSRecord. Only the one owning the shoot may touch the provider, and it
//! must keep owning it for as long as a provider call is in flight.

mod watchdog;

pub use watchdog::{OwnershipScope, Watchdog};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::store::RecordStore;

/// Suffix of the DNSRecord that publishes a shoot's owner
const OWNER_RECORD_SUFFIX: &str = "-owner";

/// Name of the owner DNSRecord of `shoot`
pub fn owner_record_name(shoot: &str) -> String {
    format!("{}{}", shoot, OWNER_RECORD_SUFFIX)
}

/// Answers whether this control plane currently owns a shoot
#[async_trait]
pub trait OwnershipService: Send + Sync {
    async fn check_ownership(&self, namespace: &str, shoot: &str) -> Result<bool>;
}

/// Compares the shoot's owner DNSRecord with this operator's owner id
///
/// A missing owner record or an operator without an owner id means the
/// shoot does not take part in ownership checks and is treated as owned.
pub struct OwnerRecordChecker {
    store: Arc<dyn RecordStore>,
    owner_id: Option<String>,
}

impl OwnerRecordChecker {
    pub fn new(store: Arc<dyn RecordStore>, owner_id: Option<String>) -> Self {
        Self { store, owner_id }
    }
}

#[async_trait]
impl OwnershipService for OwnerRecordChecker {
    async fn check_ownership(&self, namespace: &str, shoot: &str) -> Result<bool> {
        let Some(owner_id) = &self.owner_id else {
            return Ok(true);
        };

        let name = owner_record_name(shoot);
        match self.store.get_record(namespace, &name).await {
            Ok(record) => {
                let owned = record.spec.values.iter().any(|v| v == owner_id);
                debug!(
                    namespace = %namespace,
                    shoot = %shoot,
                    owned = owned,
                    "Checked shoot ownership"
                );
                Ok(owned)
            }
            Err(Error::NotFound(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }
}
