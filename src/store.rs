//! Record persistence with optimistic concurrency
//!
//! All writes go through [`RecordClient`], which applies a mutation to the
//! record in hand and, when the API server reports a conflict, re-reads the
//! record and re-applies the same mutation instead of overwriting blindly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::{api::PostParams, Api, Client, ResourceExt};
use tracing::{debug, warn};

use crate::crd::{Cluster, DNSRecord};
use crate::error::{from_api, Error, Result};

/// Trait abstracting the API operations the reconciler needs
///
/// Lets the state machine run against an in-memory store in tests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read a record; `Error::NotFound` if it does not exist
    async fn get_record(&self, namespace: &str, name: &str) -> Result<DNSRecord>;

    /// Replace metadata and spec; `Error::Conflict` on a stale resourceVersion
    async fn replace_record(&self, record: &DNSRecord) -> Result<DNSRecord>;

    /// Replace the status subresource; `Error::Conflict` on a stale resourceVersion
    async fn replace_record_status(&self, record: &DNSRecord) -> Result<DNSRecord>;

    /// Read the Cluster object for a control plane namespace
    async fn get_cluster(&self, name: &str) -> Result<Option<Cluster>>;
}

/// Real Kubernetes implementation
pub struct KubeRecordStore {
    client: Client,
}

impl KubeRecordStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn records(&self, namespace: &str) -> Api<DNSRecord> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl RecordStore for KubeRecordStore {
    async fn get_record(&self, namespace: &str, name: &str) -> Result<DNSRecord> {
        self.records(namespace)
            .get(name)
            .await
            .map_err(|e| from_api(e, &format!("dnsrecord {}/{}", namespace, name)))
    }

    async fn replace_record(&self, record: &DNSRecord) -> Result<DNSRecord> {
        let namespace = record.namespace().unwrap_or_default();
        let name = record.name_any();
        self.records(&namespace)
            .replace(&name, &PostParams::default(), record)
            .await
            .map_err(|e| from_api(e, &record.key()))
    }

    async fn replace_record_status(&self, record: &DNSRecord) -> Result<DNSRecord> {
        let namespace = record.namespace().unwrap_or_default();
        let name = record.name_any();
        let body = serde_json::to_vec(record)?;
        self.records(&namespace)
            .replace_status(&name, &PostParams::default(), body)
            .await
            .map_err(|e| from_api(e, &record.key()))
    }

    async fn get_cluster(&self, name: &str) -> Result<Option<Cluster>> {
        let api: Api<Cluster> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }
}

/// Backoff for conflict retries
#[derive(Clone, Debug)]
pub struct ConflictRetry {
    /// Total write attempts, including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ConflictRetry {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl ConflictRetry {
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts.max(1),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Target {
    Metadata,
    Status,
}

/// Conflict-aware writer over a [`RecordStore`]
#[derive(Clone)]
pub struct RecordClient {
    store: Arc<dyn RecordStore>,
    retry: ConflictRetry,
}

impl RecordClient {
    pub fn new(store: Arc<dyn RecordStore>, retry: ConflictRetry) -> Self {
        Self { store, retry }
    }

    pub async fn get(&self, namespace: &str, name: &str) -> Result<DNSRecord> {
        self.store.get_record(namespace, name).await
    }

    pub async fn get_cluster(&self, name: &str) -> Result<Option<Cluster>> {
        self.store.get_cluster(name).await
    }

    /// Apply `mutate` to metadata/spec and persist it
    ///
    /// `mutate` returns whether it changed anything; unchanged records are
    /// not written. `record` is refreshed with the persisted object.
    pub async fn mutate_metadata<F>(&self, record: &mut DNSRecord, mutate: F) -> Result<()>
    where
        F: FnMut(&mut DNSRecord) -> bool + Send,
    {
        self.mutate(record, Target::Metadata, mutate).await
    }

    /// Apply `mutate` to the status and persist it
    pub async fn mutate_status<F>(&self, record: &mut DNSRecord, mutate: F) -> Result<()>
    where
        F: FnMut(&mut DNSRecord) -> bool + Send,
    {
        self.mutate(record, Target::Status, mutate).await
    }

    async fn mutate<F>(&self, record: &mut DNSRecord, target: Target, mut mutate: F) -> Result<()>
    where
        F: FnMut(&mut DNSRecord) -> bool + Send,
    {
        let mut attempt = 0u32;
        let mut delay = self.retry.initial_delay;
        let mut candidate = record.clone();

        loop {
            attempt += 1;

            if !mutate(&mut candidate) {
                *record = candidate;
                return Ok(());
            }

            let written = match target {
                Target::Metadata => self.store.replace_record(&candidate).await,
                Target::Status => self.store.replace_record_status(&candidate).await,
            };

            match written {
                Ok(persisted) => {
                    *record = persisted;
                    return Ok(());
                }
                Err(Error::Conflict(what)) if attempt < self.retry.max_attempts => {
                    debug!(
                        dnsrecord = %what,
                        attempt = attempt,
                        target = ?target,
                        "Conflict while writing, re-reading record"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.retry.max_delay);
                    let namespace = record.namespace().unwrap_or_default();
                    candidate = self.store.get_record(&namespace, &record.name_any()).await?;
                }
                Err(e) => {
                    if matches!(e, Error::Conflict(_)) {
                        warn!(
                            dnsrecord = %record.key(),
                            attempts = attempt,
                            "Giving up after repeated write conflicts"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Add `finalizer` if it is not present yet
    pub async fn ensure_finalizer(&self, record: &mut DNSRecord, finalizer: &str) -> Result<()> {
        self.mutate_metadata(record, |r| {
            if r.has_finalizer(finalizer) {
                return false;
            }
            r.finalizers_mut().push(finalizer.to_string());
            true
        })
        .await
    }

    /// Remove `finalizer` if present
    pub async fn remove_finalizer(&self, record: &mut DNSRecord, finalizer: &str) -> Result<()> {
        self.mutate_metadata(record, |r| {
            if !r.has_finalizer(finalizer) {
                return false;
            }
            r.finalizers_mut().retain(|f| f != finalizer);
            true
        })
        .await
    }

    /// Remove every finalizer on the record
    pub async fn remove_all_finalizers(&self, record: &mut DNSRecord) -> Result<()> {
        self.mutate_metadata(record, |r| {
            if r.finalizers().is_empty() {
                return false;
            }
            r.finalizers_mut().clear();
            true
        })
        .await
    }

    /// Remove annotation `key` if present
    pub async fn remove_annotation(&self, record: &mut DNSRecord, key: &str) -> Result<()> {
        self.mutate_metadata(record, |r| r.annotations_mut().remove(key).is_some())
            .await
    }
}
