//! CRD YAML Generator
//!
//! This binary generates Kubernetes CRD manifests for all custom resources
//! handled by the dnsrecord-operator.
//!
//! Usage: cargo run --bin crdgen > deploy/crds/all.yaml

use dnsrecord_operator::crd::generate_crds;

fn main() -> anyhow::Result<()> {
    for crd in generate_crds()? {
        println!("---");
        print!("{}", crd);
    }
    Ok(())
}
