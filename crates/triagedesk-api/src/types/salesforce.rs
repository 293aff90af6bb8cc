use serde::{Deserialize, Serialize};

/// Response of `GET /api/v1/salesforce/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginUrlResponse {
    /// Authorization page to open in a browser.
    pub login_url: String,
    /// Anti-forgery state echoed back on callback.
    pub state: String,
}

/// Body of `POST /api/v1/salesforce/callback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackRequest {
    /// Authorization code.
    pub code: String,
    /// State from the login response.
    pub state: String,
}

/// Response of `GET /api/v1/salesforce/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    /// Whether the backend holds a valid session.
    #[serde(rename = "isAuthenticated", default)]
    pub is_authenticated: bool,
    /// Session expiry (ISO 8601).
    #[serde(rename = "expiresAt", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Signed-in user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SalesforceUser>,
}

/// User details reported with the session status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesforceUser {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Login name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
