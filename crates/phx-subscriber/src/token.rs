//! Access token acquisition from the token service.

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::Error;
use crate::config::TimingConfig;

const TOKEN_PATH: &str = "api/token/";
const STATUS_OK: &str = "ok";

/// Short-lived credential for one session. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Exchanges an API key for an [`AccessToken`].
#[derive(Clone)]
pub struct TokenProvider {
    client: reqwest::Client,
    base_url: String,
}

impl TokenProvider {
    pub fn new(token_server_url: impl Into<String>, timing: &TimingConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timing.http_timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: token_server_url.into(),
        })
    }

    /// `GET <base>/api/token/?api_key=<key>`. A single attempt; no retries.
    pub async fn fetch(&self, api_key: &str) -> Result<AccessToken, Error> {
        let url = token_url(&self.base_url, api_key)?;
        debug!(host = url.host_str().unwrap_or_default(), "requesting access token");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| auth_failure("token request failed", e))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::authentication(format!(
                "HTTP status {}",
                status.as_u16()
            )));
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| auth_failure("malformed token response", e))?;

        if body.status.as_deref() != Some(STATUS_OK) {
            return Err(Error::authentication("invalid response status"));
        }
        match body.access_token {
            Some(token) if !token.is_empty() => {
                info!("access token fetched");
                Ok(AccessToken(token))
            }
            _ => Err(Error::authentication("missing access_token")),
        }
    }
}

fn auth_failure(message: &str, e: reqwest::Error) -> Error {
    Error::Authentication {
        message: format!("{message}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Build the token request URL, percent-encoding the key.
pub(crate) fn token_url(base: &str, api_key: &str) -> Result<Url, Error> {
    let base = format!("{}/", base.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .and_then(|u| u.join(TOKEN_PATH))
        .map_err(|e| Error::Configuration(format!("token server url {base:?}: {e}")))?;
    url.query_pairs_mut().append_pair("api_key", api_key);
    Ok(url)
}
