//! Domain models.

mod analysis;
mod email;
mod status;

pub use analysis::{
    Analysis, CustomerResponse, EmailAnalysis, Enrichment, InternalRouting, LegacyAnalysis,
    SalesforceAction, display_or,
};
pub use email::{Attachment, Email, parse_timestamp, sort_by_timestamp};
pub use status::{DraftStatus, EnrichmentStatus};
pub use triagedesk_api::DraftData;
