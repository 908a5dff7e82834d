//! Error types for the DNSRecord Operator

use std::time::Duration;

use thiserror::Error;

use crate::actuator::ActuatorError;

/// Result type alias using the operator's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Operator error types
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Object vanished between dispatch and read
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency failure on write
    #[error("Conflict writing {0}")]
    Conflict(String),

    /// This control plane does not own the shoot
    #[error("this control plane is not the owner of shoot {0}")]
    OwnershipDenied(String),

    /// Ownership was lost while an operation was in flight
    #[error("ownership of shoot {0} was lost during the operation")]
    OwnershipLost(String),

    /// Provider driver error
    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether a later reconciliation may succeed without operator intervention
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Actuator(e) => e.is_retryable(),
            Error::Config(_) => false,
            _ => true,
        }
    }

    /// Delay before the dispatcher should try again
    pub fn requeue_after(&self) -> Duration {
        match self {
            Error::Actuator(ActuatorError::RequeueAfter { delay, .. }) => *delay,
            Error::Actuator(ActuatorError::Fatal(_)) | Error::Config(_) => {
                Duration::from_secs(300)
            }
            Error::OwnershipDenied(_) | Error::OwnershipLost(_) => Duration::from_secs(60),
            Error::Conflict(_) => Duration::from_secs(5),
            _ => Duration::from_secs(30),
        }
    }
}

/// Translate a kube API error for `what` into the operator's taxonomy
pub fn from_api(err: kube::Error, what: &str) -> Error {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => Error::NotFound(what.to_string()),
        kube::Error::Api(resp) if resp.code == 409 => Error::Conflict(what.to_string()),
        other => Error::Kube(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_actuator_errors_are_not_retryable() {
        let err = Error::from(ActuatorError::Fatal("bad credentials".into()));
        assert!(!err.is_retryable());
        assert_eq!(err.requeue_after(), Duration::from_secs(300));
    }

    #[test]
    fn requeue_hint_is_honored() {
        let err = Error::from(ActuatorError::RequeueAfter {
            delay: Duration::from_secs(7),
            reason: "zone propagating".into(),
        });
        assert!(err.is_retryable());
        assert_eq!(err.requeue_after(), Duration::from_secs(7));
    }

    #[test]
    fn ownership_errors_are_retryable() {
        assert!(Error::OwnershipDenied("garden-dev/foo".into()).is_retryable());
        assert!(Error::OwnershipLost("garden-dev/foo".into()).is_retryable());
    }
}
