//! Reconcilers for DNSRecord resources
//!
//! This module contains the business logic behind the controller:
//! - Deriving the lifecycle phase of a record
//! - Running the phase against the provider actuator
//! - Updating resource status and finalizers

pub mod dns_record;
pub mod operation;

pub use dns_record::{Reconciler, FINALIZER_NAME};
pub use operation::{classify, compute_operation_type, is_migrated, ClassifyPolicy, Phase, SkipReason};
