//! HTTP transport for the dashboard backend.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const UNAUTHORIZED_CHANNEL_CAPACITY: usize = 16;

/// Broadcast when the backend rejects a request with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unauthorized {
    /// Path of the rejected request.
    pub path: String,
}

/// JSON client for the dashboard backend.
///
/// Every request takes a [`CancellationToken`]. Cancelling it drops the
/// in-flight `reqwest` future, which aborts the underlying connection rather
/// than discarding a late response.
///
/// Cloning is cheap; clones share the connection pool and the unauthorized
/// channel.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    timeout: Duration,
    http_client: Client,
    unauthorized: broadcast::Sender<Unauthorized>,
}

impl ApiClient {
    /// Creates a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::InvalidConfig(format!(
                "API base URL must be http(s): {base_url}"
            )));
        }

        let http_client = Client::builder()
            .user_agent(concat!("triagedesk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (unauthorized, _) = broadcast::channel(UNAUTHORIZED_CHANNEL_CAPACITY);

        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            http_client,
            unauthorized,
        })
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Subscribes to 401 notifications.
    #[must_use]
    pub fn subscribe_unauthorized(&self) -> broadcast::Receiver<Unauthorized> {
        self.unauthorized.subscribe()
    }

    /// Builds the URL for `segments` under the base URL.
    ///
    /// Each segment is percent-encoded, so identifiers containing `/`, `<`,
    /// `>` or `%` stay a single path segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot take a path.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::InvalidConfig(format!("cannot append a path to {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issues a GET and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_json`].
    pub async fn get_json<T>(&self, segments: &[&str], cancel: &CancellationToken) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send_json(Method::GET, segments, None::<&()>, cancel)
            .await
    }

    /// Issues a request with an optional JSON body and decodes the JSON
    /// response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires first, [`Error::Timeout`]
    /// if the timeout elapses, [`Error::Status`] for non-2xx responses and
    /// [`Error::Json`] if the body does not decode as `T`.
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.execute(method, segments, body, cancel).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Issues a request and ignores the response body.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::send_json`], minus decoding.
    pub async fn send_unit<B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, segments, body, cancel).await.map(drop)
    }

    async fn execute<B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();

        let mut request = self
            .http_client
            .request(method.clone(), url)
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, %path, "Sending request");

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, Error>((status, bytes.to_vec()))
        };

        let (status, bytes) = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(%method, %path, "Request cancelled");
                return Err(Error::Cancelled);
            }
            result = exchange => result?,
        };

        if status == StatusCode::UNAUTHORIZED {
            // No receivers is fine.
            let _ = self.unauthorized.send(Unauthorized { path: path.clone() });
        }

        if !status.is_success() {
            warn!(%method, %path, status = status.as_u16(), "Request failed");
            return Err(Error::status(
                status.as_u16(),
                &String::from_utf8_lossy(&bytes),
            ));
        }

        Ok(bytes)
    }
}
