//! HTTP client for the space API

use crate::{SpaceDetail, SpaceLookup};
use async_trait::async_trait;
use relsync_errors::{Error, NetworkError, SpaceError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Space API client configuration
#[derive(Debug, Clone)]
pub struct SpaceApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub token: Option<String>,
    pub user_agent: String,
}

impl SpaceApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            token: None,
            user_agent: format!("relsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// Response envelope of the space API
#[derive(Debug, Deserialize)]
struct Envelope {
    result: bool,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<SpaceData>,
}

#[derive(Debug, Deserialize)]
struct SpaceData {
    bk_biz_id: i64,
    #[serde(default)]
    space_uid: Option<String>,
}

/// Space lookup over the space API
///
/// No retries: a failed lookup is skipped by the caller and retried on its
/// next scheduled run.
#[derive(Clone)]
pub struct HttpSpaceLookup {
    client: Client,
    config: SpaceApiConfig,
}

impl HttpSpaceLookup {
    /// Create a new space API client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s) or the underlying
    /// reqwest client fails to initialize.
    pub fn new(config: SpaceApiConfig) -> Result<Self, Error> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(NetworkError::InvalidUrl(config.base_url).into());
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn detail_url(&self) -> String {
        format!(
            "{}/get_space_detail/",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

fn map_send_error(url: &str, err: &reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
        }
    } else {
        NetworkError::ConnectionRefused(err.to_string())
    }
}

#[async_trait]
impl SpaceLookup for HttpSpaceLookup {
    async fn get_space_detail(&self, space_uid: &str) -> Result<SpaceDetail, Error> {
        if space_uid.is_empty() {
            return Err(SpaceError::InvalidUid {
                space_uid: space_uid.to_string(),
            }
            .into());
        }

        let url = self.detail_url();
        let mut request = self.client.get(&url).query(&[("space_uid", space_uid)]);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_send_error(&url, &e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SpaceError::NotFound {
                space_uid: space_uid.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(NetworkError::HttpError {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            }
            .into());
        }

        let envelope: Envelope =
            response
                .json()
                .await
                .map_err(|e| NetworkError::InvalidResponse {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

        if !envelope.result {
            if envelope.code == 404 {
                return Err(SpaceError::NotFound {
                    space_uid: space_uid.to_string(),
                }
                .into());
            }
            return Err(SpaceError::Rejected {
                space_uid: space_uid.to_string(),
                message: envelope.message,
            }
            .into());
        }

        let data = envelope.data.ok_or_else(|| NetworkError::InvalidResponse {
            url,
            message: "missing data".to_string(),
        })?;

        Ok(SpaceDetail {
            space_uid: data.space_uid.unwrap_or_else(|| space_uid.to_string()),
            bk_biz_id: data.bk_biz_id,
        })
    }
}
