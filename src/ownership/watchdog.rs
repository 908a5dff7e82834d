//! Cancellable execution scope backed by periodic ownership re-checks

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::OwnershipService;
use crate::error::{Error, Result};
use crate::metrics;

/// Establishes ownership scopes for provider calls
#[derive(Clone)]
pub struct Watchdog {
    service: Arc<dyn OwnershipService>,
    interval: Duration,
}

impl Watchdog {
    pub fn new(service: Arc<dyn OwnershipService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Check ownership of `shoot` once and start re-checking it in the background
    ///
    /// Fails with [`Error::OwnershipDenied`] when this control plane is not
    /// the owner. The returned scope stops its background check when dropped.
    pub async fn acquire(&self, namespace: &str, shoot: &str, key: &str) -> Result<OwnershipScope> {
        let shoot_key = format!("{}/{}", namespace, shoot);

        if !self.service.check_ownership(namespace, shoot).await? {
            metrics::OWNERSHIP_DENIALS.inc();
            return Err(Error::OwnershipDenied(shoot_key));
        }

        let token = CancellationToken::new();
        let task = tokio::spawn(watch(
            self.service.clone(),
            namespace.to_string(),
            shoot.to_string(),
            key.to_string(),
            self.interval,
            token.clone(),
        ));
        debug!(key = %key, shoot = %shoot_key, "Started ownership watchdog");

        Ok(OwnershipScope {
            shoot: shoot_key,
            key: key.to_string(),
            token,
            task: Some(task),
        })
    }
}

async fn watch(
    service: Arc<dyn OwnershipService>,
    namespace: String,
    shoot: String,
    key: String,
    interval: Duration,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let cause = match service.check_ownership(&namespace, &shoot).await {
            Ok(true) => continue,
            Ok(false) => {
                info!(key = %key, namespace = %namespace, shoot = %shoot, "Ownership lost, cancelling operation");
                "not_owned"
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Ownership check failed, cancelling operation");
                "check_failed"
            }
        };
        metrics::OWNERSHIP_LOSSES.with_label_values(&[cause]).inc();
        token.cancel();
        return;
    }
}

/// Execution scope that is cancelled once ownership is lost
///
/// Dropping the scope releases it: the token is cancelled and the
/// background check stops.
pub struct OwnershipScope {
    shoot: String,
    key: String,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl OwnershipScope {
    /// Token cancelled when ownership is lost or the scope is released
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `fut` inside the scope
    ///
    /// The future is dropped as soon as the scope is cancelled and
    /// [`Error::OwnershipLost`] is returned instead.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::OwnershipLost(self.shoot.clone())),
            result = fut => result,
        }
    }

    /// Stop the background check
    pub fn release(self) {}
}

impl Drop for OwnershipScope {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!(key = %self.key, "Released ownership watchdog");
    }
}
