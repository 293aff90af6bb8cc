//! Service layer between the sync components and the backend.
//!
//! Components talk to the backend through the [`Backend`] trait so they can
//! be driven by [`HttpBackend`] in production and by an in-memory fake in
//! tests.

mod backend;
mod http;

pub use backend::Backend;
pub use http::HttpBackend;
