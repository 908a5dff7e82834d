//! Status and condition tracking for DNSRecord resources

mod conditions;
mod updater;

pub use conditions::*;
pub use updater::StatusUpdater;
