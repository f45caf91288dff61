use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::credentials::CredentialProvider;
use super::types::UtilizationSnapshot;
use crate::error::RemoteError;
use crate::usage::merge::SourceResult;

/// Default endpoint for OAuth usage limits
pub const USAGE_API_URL: &str = "https://api.anthropic.com/api/oauth/usage";

/// Beta header required for the OAuth API
const ANTHROPIC_BETA_HEADER: &str = "anthropic-beta";
const ANTHROPIC_BETA_VALUE: &str = "oauth-2025-04-20";

const TOKENMETER_USER_AGENT: &str = concat!("tokenmeter/", env!("CARGO_PKG_VERSION"));

/// Client for the authoritative utilization endpoint.
///
/// The bearer token is cached after the first successful read. It is only
/// dropped when the endpoint answers 401, and then re-read exactly once before
/// retrying.
pub struct UsageApiClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Arc<dyn CredentialProvider>,
    token: Mutex<Option<String>>,
}

impl UsageApiClient {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(TOKENMETER_USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Fetch the current snapshot. Every failure degrades to `Unavailable`.
    pub async fn fetch(&self) -> SourceResult<UtilizationSnapshot> {
        let result = self.fetch_with_reauth().await;
        match &result {
            Err(err @ RemoteError::NoCredentials) => debug!("remote usage skipped: {err}"),
            Err(err) => warn!("remote usage unavailable: {err}"),
            Ok(_) => {}
        }
        result.into()
    }

    /// Drop the cached token so the next request re-reads credentials.
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn fetch_with_reauth(&self) -> Result<UtilizationSnapshot, RemoteError> {
        let token = self.token().await?;
        match self.request(&token).await {
            Err(RemoteError::Unauthorized) => {
                debug!("cached token rejected, re-reading credentials");
                self.invalidate_token().await;
                let token = self.token().await?;
                let result = self.request(&token).await;
                if matches!(result, Err(RemoteError::Unauthorized)) {
                    self.invalidate_token().await;
                }
                result
            }
            other => other,
        }
    }

    async fn token(&self) -> Result<String, RemoteError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let provider = Arc::clone(&self.credentials);
        let token = tokio::task::spawn_blocking(move || provider.bearer_token())
            .await
            .ok()
            .flatten()
            .ok_or(RemoteError::NoCredentials)?;

        *cached = Some(token.clone());
        Ok(token)
    }

    async fn request(&self, token: &str) -> Result<UtilizationSnapshot, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| RemoteError::NoCredentials)?,
        );
        headers.insert(
            ANTHROPIC_BETA_HEADER,
            HeaderValue::from_static(ANTHROPIC_BETA_VALUE),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(TOKENMETER_USER_AGENT));

        let response = self.http.get(&self.endpoint).headers(headers).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED => Err(RemoteError::Unauthorized),
            status => Err(RemoteError::Status(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Hands out tokens in order, repeating the last one
    struct SequenceCredentials {
        tokens: Vec<Option<&'static str>>,
        calls: AtomicUsize,
    }

    impl SequenceCredentials {
        fn new(tokens: Vec<Option<&'static str>>) -> Arc<Self> {
            Arc::new(Self {
                tokens,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CredentialProvider for SequenceCredentials {
        fn bearer_token(&self) -> Option<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let idx = n.min(self.tokens.len() - 1);
            self.tokens[idx].map(str::to_string)
        }
    }

    fn snapshot_body() -> serde_json::Value {
        serde_json::json!({
            "five_hour": { "utilization": 82.3, "resets_at": "2026-02-05T15:00:00+00:00" },
            "seven_day": { "utilization": 40.0, "resets_at": null },
            "seven_day_opus": null
        })
    }

    async fn server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/oauth/usage"))
            .and(header("authorization", "Bearer fresh"))
            .and(header("anthropic-beta", "oauth-2025-04-20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(snapshot_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/oauth/usage"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer, creds: Arc<SequenceCredentials>) -> UsageApiClient {
        UsageApiClient::new(
            format!("{}/api/oauth/usage", server.uri()),
            Duration::from_secs(5),
            creds,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_decodes_snapshot() {
        let server = server().await;
        let creds = SequenceCredentials::new(vec![Some("fresh")]);
        let client = client(&server, creds.clone());

        let result = client.fetch().await;
        let snapshot = result.available().unwrap();
        assert_eq!(snapshot.five_hour.as_ref().unwrap().utilization, 82.3);
        assert_eq!(snapshot.seven_day.as_ref().unwrap().utilization, 40.0);
        assert!(snapshot.seven_day_opus.is_none());
    }

    #[tokio::test]
    async fn test_token_is_cached_between_fetches() {
        let server = server().await;
        let creds = SequenceCredentials::new(vec![Some("fresh")]);
        let client = client(&server, creds.clone());

        assert!(client.fetch().await.is_available());
        assert!(client.fetch().await.is_available());
        assert_eq!(creds.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_token_is_refetched_once() {
        let server = server().await;
        let creds = SequenceCredentials::new(vec![Some("stale"), Some("fresh")]);
        let client = client(&server, creds.clone());

        assert!(client.fetch().await.is_available());
        assert_eq!(creds.calls(), 2);
    }

    #[tokio::test]
    async fn test_repeated_unauthorized_degrades() {
        let server = server().await;
        let creds = SequenceCredentials::new(vec![Some("stale")]);
        let client = client(&server, creds.clone());

        assert!(!client.fetch().await.is_available());
        assert_eq!(creds.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_credentials_degrades() {
        let server = server().await;
        let creds = SequenceCredentials::new(vec![None]);
        let client = client(&server, creds.clone());

        let result = client.fetch().await;
        assert_eq!(
            result,
            SourceResult::Unavailable("no OAuth credentials available".to_string())
        );
    }

    #[tokio::test]
    async fn test_server_error_and_bad_body_degrade() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/error"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        for route in ["/error", "/garbage"] {
            let creds = SequenceCredentials::new(vec![Some("fresh")]);
            let client = UsageApiClient::new(
                format!("{}{route}", server.uri()),
                Duration::from_secs(5),
                creds.clone(),
            )
            .unwrap();
            assert!(!client.fetch().await.is_available());
            assert_eq!(creds.calls(), 1);
        }
    }
}
