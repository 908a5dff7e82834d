//! DNSRecord Kubernetes Operator
//!
//! This operator drives DNSRecord resources through their lifecycle
//! (create, update, delete, migrate, restore) against a DNS provider, tracks
//! progress in the resource status, and keeps two control planes from
//! touching the same record during a migration.

pub mod actuator;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod ownership;
pub mod reconcilers;
pub mod status;
pub mod store;

pub use error::{Error, Result};
