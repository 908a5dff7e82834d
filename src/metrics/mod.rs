//! Prometheus metrics for the DNSRecord Operator
//!
//! This module exposes metrics for monitoring reconciliation and ownership
//! checks.

mod prometheus;

pub use self::prometheus::*;
