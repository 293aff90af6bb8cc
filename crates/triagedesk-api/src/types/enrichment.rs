use serde::{Deserialize, Serialize};

/// AI analysis stored for one email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyzrData {
    /// Response id.
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// Email the analysis belongs to.
    #[serde(default)]
    pub email_id: Option<String>,
    /// Agent session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Unparsed agent output.
    #[serde(default)]
    pub raw_response: Option<String>,
    /// Extracted analysis, in either schema generation.
    #[serde(default)]
    pub extracted_json: serde_json::Value,
    /// When the analysis ran.
    #[serde(default)]
    pub processed_at: Option<String>,
    /// Whether the analysis succeeded.
    #[serde(default)]
    pub success: bool,
    /// Failure description.
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of the enrichment endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyzrDataResponse {
    /// Email id the backend resolved.
    #[serde(default)]
    pub email_id: String,
    /// The analysis.
    pub lyzr_data: LyzrData,
    /// Processing status.
    #[serde(default)]
    pub status: Option<String>,
}
