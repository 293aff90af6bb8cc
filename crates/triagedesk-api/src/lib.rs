//! # triagedesk-api
//!
//! REST client for the triage dashboard backend.
//!
//! ## Features
//!
//! - **Cancellable requests**: every call takes a `CancellationToken`;
//!   cancelling aborts the transport request
//! - **Uniform errors**: transport, status, timeout, cancellation and decode
//!   failures in one [`Error`] type
//! - **401 broadcast**: rejected requests are published on a channel so a
//!   session monitor can react without wrapping every call
//! - **Wire types**: serde models for emails, AI analysis, drafts, feedback
//!   and the Salesforce session
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use triagedesk_api::ApiClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new("http://localhost:8000")?
//!         .with_timeout(Duration::from_secs(30));
//!
//!     let cancel = CancellationToken::new();
//!     let list = client.list_emails(&cancel).await?;
//!     println!("{} emails", list.emails.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod endpoints;
mod error;
pub mod types;

pub use client::{ApiClient, DEFAULT_TIMEOUT, Unauthorized};
pub use error::{Error, Result};
pub use types::*;
