//! Reqwest-backed identity adapter.
//!
//! This adapter owns transport details only: endpoint resolution, bearer
//! headers, timeout and HTTP error mapping, and JSON decoding into domain
//! sessions and users.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use url::Url;

use super::dto::{LoginRequestDto, LoginResponseDto, WhoAmIResponseDto};
use crate::domain::ports::{IdentityApi, IdentityApiError};
use crate::domain::{AccessToken, LoginCredentials, StoredSession, User};

const USER_AGENT: &str = concat!("portal-session/", env!("CARGO_PKG_VERSION"));

/// Failure to build the identity client.
#[derive(Debug, thiserror::Error)]
pub enum IdentityClientBuildError {
    /// The HTTP client could not be constructed.
    #[error("failed to build identity HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// An endpoint could not be resolved against the base URL.
    #[error("invalid identity endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Identity adapter speaking the portal REST API.
pub struct HttpIdentityApi {
    client: Client,
    login_url: Url,
    me_url: Url,
    logout_url: Url,
}

impl HttpIdentityApi {
    /// Build an adapter rooted at `api_base`, e.g. `https://host/api/v1/`.
    ///
    /// A missing trailing slash on the base path is added so relative
    /// endpoints resolve beneath it.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed or an
    /// endpoint URL cannot be derived from `api_base`.
    pub fn new(api_base: &Url, timeout: Duration) -> Result<Self, IdentityClientBuildError> {
        let mut base = api_base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            login_url: base.join("auth/login")?,
            me_url: base.join("auth/me")?,
            logout_url: base.join("auth/logout")?,
        })
    }

    fn authorized(&self, method: Method, url: &Url, token: &AccessToken) -> RequestBuilder {
        self.client
            .request(method, url.clone())
            .bearer_auth(token.expose())
            .header(reqwest::header::ACCEPT, "application/json")
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityApi {
    async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<StoredSession, IdentityApiError> {
        let response = self
            .client
            .post(self.login_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&LoginRequestDto {
                email: credentials.email(),
                password: credentials.password(),
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        serde_json::from_slice::<LoginResponseDto>(body.as_ref())
            .map_err(|error| IdentityApiError::decode(format!("invalid login payload: {error}")))?
            .into_domain()
            .map_err(IdentityApiError::decode)
    }

    async fn who_am_i(&self, token: &AccessToken) -> Result<User, IdentityApiError> {
        let response = self
            .authorized(Method::GET, &self.me_url, token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        serde_json::from_slice::<WhoAmIResponseDto>(body.as_ref())
            .map_err(|error| {
                IdentityApiError::decode(format!("invalid identity payload: {error}"))
            })?
            .into_domain()
            .map_err(IdentityApiError::decode)
    }

    async fn logout(&self, token: &AccessToken) -> Result<(), IdentityApiError> {
        let response = self
            .authorized(Method::POST, &self.logout_url, token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }
}

fn map_transport_error(error: reqwest::Error) -> IdentityApiError {
    if error.is_timeout() {
        IdentityApiError::timeout(error.to_string())
    } else if error.is_decode() {
        IdentityApiError::decode(error.to_string())
    } else {
        IdentityApiError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> IdentityApiError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => IdentityApiError::unauthorized(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            IdentityApiError::timeout(message)
        }
        _ => IdentityApiError::rejected(status.as_u16(), message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
