//! # triagedesk-core
//!
//! Client-side synchronization and reconciliation for the email triage
//! dashboard.
//!
//! This crate provides:
//! - Domain models for emails, AI analysis and draft state
//! - A shared [`Inbox`] store with atomic replace and merge operations
//! - [`EmailSyncController`]: overlap-safe polling with bounded retry and
//!   request cancellation
//! - [`EnrichmentMerger`]: lazy per-email analysis fetch and merge
//! - [`DraftReconciler`]: effective draft content, save and send gating
//! - [`AuthSessionMonitor`]: Salesforce session status, expiry and 401
//!   handling
//! - [`HealthMonitor`] and [`FeedbackService`]
//!
//! Everything talks to the backend through the [`Backend`] trait;
//! [`HttpBackend`] is the REST implementation.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use triagedesk_core::{Config, EmailSyncController, HttpBackend, Inbox};
//!
//! let config = Config::from_env()?;
//! let backend = Arc::new(HttpBackend::from_config(&config)?);
//! let controller = Arc::new(EmailSyncController::new(backend, Inbox::new(), &config));
//!
//! let polling = controller.start_polling();
//! // ...
//! controller.dispose();
//! polling.shutdown().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod config;
pub mod draft;
mod enrichment;
mod error;
pub mod feedback;
pub mod health;
mod inbox;
pub mod model;
pub mod service;
pub mod sync;

#[cfg(test)]
mod testing;

pub use auth::{AuthEvent, AuthSession, AuthSessionMonitor};
pub use config::Config;
pub use draft::{DraftReconciler, effective_content};
pub use enrichment::EnrichmentMerger;
pub use error::{Error, Result};
pub use feedback::{FeedbackInput, FeedbackService};
pub use health::{HealthMonitor, HealthState, HealthStatus};
pub use inbox::{Inbox, InboxEvent};
pub use model::{DraftStatus, Email, Enrichment, EnrichmentStatus};
pub use service::{Backend, HttpBackend};
pub use sync::{EmailSyncController, FetchOutcome, PollHandle, RetryPolicy};
