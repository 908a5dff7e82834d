//! Provider-agnostic actuator that validates records and logs intended changes

use std::net::{Ipv4Addr, Ipv6Addr};

use async_trait::async_trait;
use tracing::info;

use super::{Actuator, ActuatorError};
use crate::crd::{Cluster, DNSRecord, DNSRecordType};

/// Actuator used when no provider driver is linked into the binary
#[derive(Debug, Default, Clone)]
pub struct DryRunActuator;

impl DryRunActuator {
    pub fn new() -> Self {
        Self
    }
}

/// Validate the DNSRecord spec
pub fn validate(record: &DNSRecord) -> Result<(), ActuatorError> {
    let spec = &record.spec;

    if spec.name.is_empty() {
        return Err(ActuatorError::fatal("Record name must not be empty"));
    }

    if spec.values.is_empty() {
        return Err(ActuatorError::fatal("At least one record value must be specified"));
    }

    if let Some(ttl) = spec.ttl {
        if ttl <= 0 {
            return Err(ActuatorError::fatal(format!(
                "Invalid TTL {}: must be positive",
                ttl
            )));
        }
    }

    match spec.record_type {
        DNSRecordType::A => {
            for value in &spec.values {
                value.parse::<Ipv4Addr>().map_err(|_| {
                    ActuatorError::fatal(format!("Invalid A record value '{}'", value))
                })?;
            }
        }
        DNSRecordType::AAAA => {
            for value in &spec.values {
                value.parse::<Ipv6Addr>().map_err(|_| {
                    ActuatorError::fatal(format!("Invalid AAAA record value '{}'", value))
                })?;
            }
        }
        DNSRecordType::CNAME => {
            if spec.values.len() != 1 {
                return Err(ActuatorError::fatal(
                    "CNAME records must have exactly one value",
                ));
            }
        }
        DNSRecordType::TXT => {}
    }

    Ok(())
}

fn shoot_name(cluster: Option<&Cluster>) -> &str {
    cluster
        .and_then(|c| c.shoot())
        .map(|s| s.name.as_str())
        .unwrap_or("-")
}

#[async_trait]
impl Actuator for DryRunActuator {
    async fn reconcile(
        &self,
        record: &DNSRecord,
        cluster: Option<&Cluster>,
    ) -> Result<(), ActuatorError> {
        validate(record)?;
        info!(
            dnsrecord = %record.key(),
            shoot = shoot_name(cluster),
            domain = %record.spec.name,
            record_type = ?record.spec.record_type,
            values = ?record.spec.values,
            "Would upsert DNS record"
        );
        Ok(())
    }

    async fn delete(
        &self,
        record: &DNSRecord,
        cluster: Option<&Cluster>,
    ) -> Result<(), ActuatorError> {
        info!(
            dnsrecord = %record.key(),
            shoot = shoot_name(cluster),
            domain = %record.spec.name,
            "Would delete DNS record"
        );
        Ok(())
    }

    async fn restore(
        &self,
        record: &DNSRecord,
        cluster: Option<&Cluster>,
    ) -> Result<(), ActuatorError> {
        self.reconcile(record, cluster).await
    }

    async fn migrate(
        &self,
        record: &DNSRecord,
        _cluster: Option<&Cluster>,
    ) -> Result<(), ActuatorError> {
        // Provider state stays in place for the new owner.
        info!(dnsrecord = %record.key(), "Nothing to migrate for DNS record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{DNSRecordSpec, SecretReference};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn record(record_type: DNSRecordType, values: &[&str]) -> DNSRecord {
        DNSRecord {
            metadata: ObjectMeta {
                name: Some("shoot-api".to_string()),
                namespace: Some("shoot--dev--foo".to_string()),
                ..Default::default()
            },
            spec: DNSRecordSpec {
                type_: "aws-route53".to_string(),
                secret_ref: SecretReference {
                    name: "dns-credentials".to_string(),
                    namespace: None,
                },
                region: None,
                zone: None,
                name: "api.foo.example.com".to_string(),
                record_type,
                values: values.iter().map(|v| v.to_string()).collect(),
                ttl: Some(120),
            },
            status: None,
        }
    }

    #[test]
    fn valid_a_record_passes_validation() {
        assert!(validate(&record(DNSRecordType::A, &["10.0.0.1", "10.0.0.2"])).is_ok());
    }

    #[test]
    fn empty_values_fail_validation() {
        let err = validate(&record(DNSRecordType::TXT, &[])).unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("value"));
    }

    #[test]
    fn malformed_a_value_fails_validation() {
        let err = validate(&record(DNSRecordType::A, &["not-an-ip"])).unwrap_err();
        assert!(err.to_string().contains("not-an-ip"));
    }

    #[test]
    fn ipv4_value_is_not_a_valid_aaaa_value() {
        assert!(validate(&record(DNSRecordType::AAAA, &["10.0.0.1"])).is_err());
        assert!(validate(&record(DNSRecordType::AAAA, &["2001:db8::1"])).is_ok());
    }

    #[test]
    fn cname_requires_exactly_one_value() {
        assert!(validate(&record(DNSRecordType::CNAME, &["a.example.com", "b.example.com"])).is_err());
        assert!(validate(&record(DNSRecordType::CNAME, &["a.example.com"])).is_ok());
    }

    #[test]
    fn non_positive_ttl_fails_validation() {
        let mut r = record(DNSRecordType::TXT, &["owner-id"]);
        r.spec.ttl = Some(0);
        assert!(validate(&r).is_err());
    }

    #[test]
    fn dry_run_validates_on_reconcile_and_restore() {
        let actuator = DryRunActuator::new();
        let bad = record(DNSRecordType::A, &["not-an-ip"]);

        assert!(tokio_test::block_on(actuator.reconcile(&bad, None)).is_err());
        assert!(tokio_test::block_on(actuator.restore(&bad, None)).is_err());
        assert!(tokio_test::block_on(actuator.delete(&record(DNSRecordType::A, &["10.0.0.1"]), None)).is_ok());
    }
}
