//! Salesforce session tracking.

mod monitor;
mod session;

pub use monitor::{AuthEvent, AuthSessionMonitor};
pub use session::{AuthSession, EXPIRED, format_remaining};
