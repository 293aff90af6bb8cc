//! List synchronization: the controller, its poll loop and retry policy.

mod controller;
mod retry;
mod scheduler;

pub use controller::{EmailSyncController, FetchOutcome};
pub use retry::RetryPolicy;
pub use scheduler::PollHandle;
