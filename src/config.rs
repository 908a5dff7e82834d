//! Operator configuration
//!
//! Every option can be given as a flag or through its environment variable.

use clap::Parser;

use crate::error::{Error, Result};

/// DNSRecord operator - drives DNSRecord resources through their provider lifecycle
#[derive(Parser, Debug, Clone)]
#[command(name = "dnsrecord-operator", version, about, long_about = None)]
pub struct Config {
    /// Port for the metrics and health endpoints
    #[arg(long, env = "METRICS_PORT", default_value_t = 8080)]
    pub metrics_port: u16,

    /// Only reconcile DNSRecords of this provider type
    #[arg(long, env = "PROVIDER_TYPE")]
    pub provider_type: Option<String>,

    /// Reconcile on every change instead of waiting for the operation annotation
    #[arg(long, env = "IGNORE_OPERATION_ANNOTATION", default_value_t = false)]
    pub ignore_operation_annotation: bool,

    /// Identity of this control plane as published in shoot owner records
    #[arg(long, env = "OWNER_ID")]
    pub owner_id: Option<String>,

    /// Seconds between ownership re-checks during provider calls
    #[arg(long, env = "OWNER_CHECK_INTERVAL_SECS", default_value_t = 10)]
    pub owner_check_interval_secs: u64,

    /// Namespace holding records that do not belong to a shoot
    #[arg(long, env = "GARDEN_NAMESPACE", default_value = "garden")]
    pub garden_namespace: String,

    /// Write attempts before giving up on conflicting updates
    #[arg(long, env = "MAX_CONFLICT_RETRIES", default_value_t = 5)]
    pub max_conflict_retries: u32,
}

impl Config {
    /// Reject settings the operator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.owner_check_interval_secs == 0 {
            return Err(Error::config("owner check interval must be at least one second"));
        }
        if self.max_conflict_retries == 0 {
            return Err(Error::config("max conflict retries must be at least 1"));
        }
        if self.garden_namespace.is_empty() {
            return Err(Error::config("garden namespace must not be empty"));
        }
        if matches!(self.owner_id.as_deref(), Some("")) {
            return Err(Error::config("owner id must not be empty when set"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::parse_from(["dnsrecord-operator"]);
        assert_eq!(config.metrics_port, 8080);
        assert_eq!(config.garden_namespace, "garden");
        assert!(!config.ignore_operation_annotation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::parse_from([
            "dnsrecord-operator",
            "--provider-type",
            "aws-route53",
            "--ignore-operation-annotation",
            "--owner-id",
            "seed-eu1",
        ]);
        assert_eq!(config.provider_type.as_deref(), Some("aws-route53"));
        assert!(config.ignore_operation_annotation);
        assert_eq!(config.owner_id.as_deref(), Some("seed-eu1"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = Config::parse_from(["dnsrecord-operator"]);
        config.owner_check_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
