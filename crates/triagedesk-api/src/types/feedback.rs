use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of reviewer feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    /// Positive.
    Positive,
    /// Negative.
    Negative,
    /// Neutral.
    Neutral,
    /// Helpful.
    Helpful,
    /// Not helpful.
    NotHelpful,
}

impl FeedbackType {
    /// All feedback types, in display order.
    pub const ALL: [Self; 5] = [
        Self::Positive,
        Self::Negative,
        Self::Neutral,
        Self::Helpful,
        Self::NotHelpful,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Helpful => "helpful",
            Self::NotHelpful => "not_helpful",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown feedback type: {s}"))
    }
}

/// A stored feedback record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Record id.
    #[serde(alias = "_id")]
    pub id: String,
    /// Email the feedback is about.
    pub email_id: String,
    /// Reviewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Feedback kind.
    pub feedback_type: FeedbackType,
    /// Rating from 1 to 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// Free-text comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Per-type counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackByType {
    /// Positive count.
    pub positive: u32,
    /// Negative count.
    pub negative: u32,
    /// Neutral count.
    pub neutral: u32,
    /// Helpful count.
    pub helpful: u32,
    /// Not helpful count.
    pub not_helpful: u32,
}

impl FeedbackByType {
    /// Returns the count for one type.
    #[must_use]
    pub const fn get(&self, kind: FeedbackType) -> u32 {
        match kind {
            FeedbackType::Positive => self.positive,
            FeedbackType::Negative => self.negative,
            FeedbackType::Neutral => self.neutral,
            FeedbackType::Helpful => self.helpful,
            FeedbackType::NotHelpful => self.not_helpful,
        }
    }
}

/// Aggregated feedback for one email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackStats {
    /// Total records.
    pub total_feedback: u32,
    /// Positive records.
    pub positive_count: u32,
    /// Negative records.
    pub negative_count: u32,
    /// Neutral records.
    pub neutral_count: u32,
    /// Helpful records.
    pub helpful_count: u32,
    /// Not helpful records.
    pub not_helpful_count: u32,
    /// Mean rating; 0 when nobody rated.
    pub average_rating: f64,
    /// Counters keyed by type.
    pub feedback_by_type: FeedbackByType,
}

/// Body of `POST /api/v1/feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFeedbackRequest {
    /// Email the feedback is about.
    pub email_id: String,
    /// Reviewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Feedback kind.
    pub feedback_type: FeedbackType,
    /// Rating from 1 to 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// Free-text comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Body of `PUT /api/v1/feedback/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFeedbackRequest {
    /// New kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_type: Option<FeedbackType>,
    /// New rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// New comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
