//! AI analysis attached to an email.
//!
//! The backend has produced two generations of analysis payloads: a flat
//! legacy shape and a nested structured shape. The shape is detected once,
//! when the payload enters the client, and consumers use the accessors on
//! [`Analysis`] without caring which one they hold.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use triagedesk_api::LyzrData;

use super::parse_timestamp;

/// Keys that only appear in the structured shape.
const STRUCTURED_KEYS: [&str; 4] = [
    "email_analysis",
    "salesforce_action",
    "customer_response",
    "internal_routing",
];

/// Deserializes a field, treating a value of the wrong type as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Flat, first-generation analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyAnalysis {
    /// Classification.
    #[serde(default, deserialize_with = "lenient")]
    pub classification: Option<String>,
    /// Confidence score.
    #[serde(default, deserialize_with = "lenient")]
    pub confidence_score: Option<f64>,
    /// Routing action.
    #[serde(default, deserialize_with = "lenient")]
    pub routing_action: Option<String>,
    /// Key indicators.
    #[serde(default, deserialize_with = "lenient")]
    pub key_indicators: Option<Vec<String>>,
    /// Existing case number.
    #[serde(default, deserialize_with = "lenient")]
    pub existing_case_number: Option<String>,
    /// Priority level.
    #[serde(default, deserialize_with = "lenient")]
    pub priority_level: Option<String>,
    /// Auto acknowledgment.
    #[serde(default, deserialize_with = "lenient")]
    pub auto_acknowledgment: Option<String>,
    /// Requires human review.
    #[serde(default, deserialize_with = "lenient")]
    pub requires_human_review: Option<bool>,
    /// Extracted entities.
    #[serde(default, deserialize_with = "lenient")]
    pub extracted_entities: Option<Map<String, Value>>,
}

/// Classification block of the structured shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailAnalysis {
    /// Classification.
    #[serde(default, deserialize_with = "lenient")]
    pub classification: Option<String>,
    /// Confidence score.
    #[serde(default, deserialize_with = "lenient")]
    pub confidence_score: Option<f64>,
    /// Key indicators.
    #[serde(default, deserialize_with = "lenient")]
    pub key_indicators: Option<Vec<String>>,
    /// Extracted entities.
    #[serde(default, deserialize_with = "lenient")]
    pub extracted_entities: Option<Map<String, Value>>,
    /// Priority level.
    #[serde(default, deserialize_with = "lenient")]
    pub priority_level: Option<String>,
    /// Urgency factors.
    #[serde(default, deserialize_with = "lenient")]
    pub urgency_factors: Option<Vec<String>>,
}

/// CRM action block of the structured shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesforceAction {
    /// Action type.
    #[serde(default, deserialize_with = "lenient")]
    pub action_type: Option<String>,
    /// Case id.
    #[serde(default, deserialize_with = "lenient")]
    pub case_id: Option<String>,
    /// Case number.
    #[serde(default, deserialize_with = "lenient")]
    pub case_number: Option<String>,
    /// Case status.
    #[serde(default, deserialize_with = "lenient")]
    pub case_status: Option<String>,
    /// Routing team.
    #[serde(default, deserialize_with = "lenient")]
    pub routing_team: Option<String>,
    /// Comment added.
    #[serde(default, deserialize_with = "lenient")]
    pub comment_added: Option<bool>,
    /// Comment id.
    #[serde(default, deserialize_with = "lenient")]
    pub comment_id: Option<String>,
}

/// Suggested customer reply of the structured shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerResponse {
    /// Auto acknowledgment.
    #[serde(default, deserialize_with = "lenient")]
    pub auto_acknowledgment: Option<String>,
    /// Estimated response time.
    #[serde(default, deserialize_with = "lenient")]
    pub estimated_response_time: Option<String>,
    /// Case reference.
    #[serde(default, deserialize_with = "lenient")]
    pub case_reference: Option<String>,
    /// Next steps.
    #[serde(default, deserialize_with = "lenient")]
    pub next_steps: Option<String>,
}

/// Internal routing block of the structured shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalRouting {
    /// Specialist team.
    #[serde(default, deserialize_with = "lenient")]
    pub specialist_team: Option<String>,
    /// Requires human review.
    #[serde(default, deserialize_with = "lenient")]
    pub requires_human_review: Option<bool>,
    /// Escalation needed.
    #[serde(default, deserialize_with = "lenient")]
    pub escalation_needed: Option<bool>,
    /// Follow up date.
    #[serde(default, deserialize_with = "lenient")]
    pub follow_up_date: Option<String>,
}

/// Analysis payload in one of its two schema generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Analysis {
    /// Flat first-generation payload.
    Legacy(LegacyAnalysis),
    /// Nested payload.
    Structured {
        /// Classification.
        email_analysis: Option<EmailAnalysis>,
        /// CRM action taken.
        salesforce_action: Option<SalesforceAction>,
        /// Suggested reply.
        customer_response: Option<CustomerResponse>,
        /// Routing.
        internal_routing: Option<InternalRouting>,
    },
}

impl Default for Analysis {
    fn default() -> Self {
        Self::Legacy(LegacyAnalysis::default())
    }
}

fn block<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<T> {
    object
        .get(key)
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

impl Analysis {
    /// Detects the shape of an `extracted_json` payload.
    ///
    /// Any structured-only key selects the structured reader. Non-object
    /// payloads yield an empty legacy analysis.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        if STRUCTURED_KEYS.iter().any(|k| object.contains_key(*k)) {
            return Self::Structured {
                email_analysis: block(object, "email_analysis"),
                salesforce_action: block(object, "salesforce_action"),
                customer_response: block(object, "customer_response"),
                internal_routing: block(object, "internal_routing"),
            };
        }

        Self::Legacy(serde_json::from_value(value.clone()).unwrap_or_default())
    }

    /// Returns true for the nested shape.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Structured { .. })
    }

    /// Classification label.
    #[must_use]
    pub fn classification(&self) -> Option<&str> {
        match self {
            Self::Legacy(l) => l.classification.as_deref(),
            Self::Structured { email_analysis, .. } => {
                email_analysis.as_ref()?.classification.as_deref()
            }
        }
    }

    /// Classifier confidence in `0.0..=1.0`.
    #[must_use]
    pub fn confidence_score(&self) -> Option<f64> {
        match self {
            Self::Legacy(l) => l.confidence_score,
            Self::Structured { email_analysis, .. } => email_analysis.as_ref()?.confidence_score,
        }
    }

    /// Priority label.
    #[must_use]
    pub fn priority_level(&self) -> Option<&str> {
        match self {
            Self::Legacy(l) => l.priority_level.as_deref(),
            Self::Structured { email_analysis, .. } => {
                email_analysis.as_ref()?.priority_level.as_deref()
            }
        }
    }

    /// Phrases that drove the classification.
    #[must_use]
    pub fn key_indicators(&self) -> &[String] {
        let indicators = match self {
            Self::Legacy(l) => l.key_indicators.as_deref(),
            Self::Structured { email_analysis, .. } => email_analysis
                .as_ref()
                .and_then(|a| a.key_indicators.as_deref()),
        };
        indicators.unwrap_or_default()
    }

    /// Extracted entities (names, policy numbers, ...).
    #[must_use]
    pub fn extracted_entities(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Legacy(l) => l.extracted_entities.as_ref(),
            Self::Structured { email_analysis, .. } => {
                email_analysis.as_ref()?.extracted_entities.as_ref()
            }
        }
    }

    /// Whether a human must review before anything is sent.
    #[must_use]
    pub fn requires_human_review(&self) -> Option<bool> {
        match self {
            Self::Legacy(l) => l.requires_human_review,
            Self::Structured {
                internal_routing, ..
            } => internal_routing.as_ref()?.requires_human_review,
        }
    }

    /// Suggested customer reply; only the structured shape has one.
    #[must_use]
    pub fn customer_response(&self) -> Option<&CustomerResponse> {
        match self {
            Self::Legacy(_) => None,
            Self::Structured {
                customer_response, ..
            } => customer_response.as_ref(),
        }
    }

    /// Linked CRM case number.
    #[must_use]
    pub fn case_number(&self) -> Option<&str> {
        match self {
            Self::Legacy(l) => l.existing_case_number.as_deref(),
            Self::Structured {
                salesforce_action, ..
            } => salesforce_action.as_ref()?.case_number.as_deref(),
        }
    }

    /// Team the email is routed to.
    #[must_use]
    pub fn routing_team(&self) -> Option<&str> {
        match self {
            Self::Legacy(l) => l.routing_action.as_deref(),
            Self::Structured {
                salesforce_action,
                internal_routing,
                ..
            } => salesforce_action
                .as_ref()
                .and_then(|a| a.routing_team.as_deref())
                .or_else(|| {
                    internal_routing
                        .as_ref()
                        .and_then(|r| r.specialist_team.as_deref())
                }),
        }
    }
}

/// Renders an optional value, or `fallback` when it is absent or blank.
#[must_use]
pub fn display_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(fallback)
}

/// AI analysis merged onto an email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    /// Analysis response id.
    pub response_id: Option<String>,
    /// Whether the analysis succeeded.
    pub success: bool,
    /// Failure description.
    pub error: Option<String>,
    /// When the analysis ran.
    pub processed_at: Option<DateTime<Utc>>,
    /// Typed payload.
    pub analysis: Analysis,
}

impl From<LyzrData> for Enrichment {
    fn from(data: LyzrData) -> Self {
        Self {
            response_id: data.id,
            success: data.success,
            error: data.error.filter(|e| !e.is_empty()),
            processed_at: data.processed_at.as_deref().and_then(parse_timestamp),
            analysis: Analysis::from_json(&data.extracted_json),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_shape() {
        let analysis = Analysis::from_json(&json!({
            "classification": "Policy Inquiry",
            "confidence_score": 0.91,
            "key_indicators": ["policy", "address change"],
            "priority_level": "medium",
            "existing_case_number": "00012345",
            "requires_human_review": false
        }));

        assert!(!analysis.is_structured());
        assert_eq!(analysis.classification(), Some("Policy Inquiry"));
        assert_eq!(analysis.confidence_score(), Some(0.91));
        assert_eq!(analysis.key_indicators().len(), 2);
        assert_eq!(analysis.case_number(), Some("00012345"));
        assert_eq!(analysis.requires_human_review(), Some(false));
        assert!(analysis.customer_response().is_none());
    }

    #[test]
    fn test_structured_shape() {
        let analysis = Analysis::from_json(&json!({
            "email_analysis": {
                "classification": "Claim",
                "confidence_score": 0.8,
                "key_indicators": ["claim"],
                "priority_level": "high",
                "urgency_factors": []
            },
            "salesforce_action": { "case_number": "00099", "routing_team": "Claims" },
            "customer_response": { "estimated_response_time": "2 business days" },
            "internal_routing": { "requires_human_review": true }
        }));

        assert!(analysis.is_structured());
        assert_eq!(analysis.classification(), Some("Claim"));
        assert_eq!(analysis.priority_level(), Some("high"));
        assert_eq!(analysis.case_number(), Some("00099"));
        assert_eq!(analysis.routing_team(), Some("Claims"));
        assert_eq!(analysis.requires_human_review(), Some(true));
        assert_eq!(
            analysis
                .customer_response()
                .unwrap()
                .estimated_response_time
                .as_deref(),
            Some("2 business days")
        );
    }

    #[test]
    fn test_single_structured_key_selects_structured_reader() {
        let analysis = Analysis::from_json(&json!({
            "classification": "ignored in structured mode",
            "internal_routing": { "specialist_team": "Underwriting" }
        }));
        assert!(analysis.is_structured());
        assert_eq!(analysis.classification(), None);
        assert_eq!(analysis.routing_team(), Some("Underwriting"));
    }

    #[test]
    fn test_wrong_types_degrade_to_absent() {
        let analysis = Analysis::from_json(&json!({
            "classification": 7,
            "confidence_score": "high",
            "key_indicators": "not a list",
            "priority_level": "low"
        }));
        assert_eq!(analysis.classification(), None);
        assert_eq!(analysis.confidence_score(), None);
        assert!(analysis.key_indicators().is_empty());
        assert_eq!(analysis.priority_level(), Some("low"));

        let structured = Analysis::from_json(&json!({ "email_analysis": "oops" }));
        assert!(structured.is_structured());
        assert_eq!(structured.classification(), None);
    }

    #[test]
    fn test_non_object_payload() {
        assert_eq!(Analysis::from_json(&Value::Null), Analysis::default());
        assert_eq!(Analysis::from_json(&json!([1, 2])), Analysis::default());
    }

    #[test]
    fn test_display_or() {
        assert_eq!(display_or(Some("Claim"), "Unknown"), "Claim");
        assert_eq!(display_or(Some("  "), "Unknown"), "Unknown");
        assert_eq!(display_or(None, "N/A"), "N/A");
    }

    #[test]
    fn test_enrichment_from_lyzr_data() {
        let data: LyzrData = serde_json::from_value(json!({
            "_id": "r1",
            "success": true,
            "error": "",
            "processed_at": "2024-12-15T10:30:00Z",
            "extracted_json": { "customer_response": {} }
        }))
        .unwrap();

        let enrichment = Enrichment::from(data);
        assert_eq!(enrichment.response_id.as_deref(), Some("r1"));
        assert!(enrichment.error.is_none());
        assert!(enrichment.processed_at.is_some());
        assert!(enrichment.analysis.customer_response().is_some());
    }
}
