//! Custom Resource Definitions for the DNSRecord operator

mod cluster;
mod dns_record;
mod types;

pub use cluster::*;
pub use dns_record::*;
pub use types::*;

use kube::CustomResourceExt;

/// Generate all CRD YAML manifests
pub fn generate_crds() -> Result<Vec<String>, serde_yaml::Error> {
    Ok(vec![
        serde_yaml::to_string(&DNSRecord::crd())?,
        serde_yaml::to_string(&Cluster::crd())?,
    ])
}
