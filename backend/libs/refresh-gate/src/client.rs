/// HTTP client whose calls share one refresh gate
///
/// A 401 from the API is the authorization-expired signal. The first request
/// to see it refreshes the token pair; concurrent requests wait and replay.
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::call::call_with_refresh;
use crate::error::{CallError, RefreshError, Result};
use crate::gate::{Reauthenticator, RefreshGate, RefreshGateConfig, TokenRefresher};
use crate::token::{TokenPair, TokenStore};

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Exchanges the stored refresh token for a new pair
pub struct HttpTokenRefresher {
    http: reqwest::Client,
    refresh_url: String,
    tokens: Arc<TokenStore>,
}

impl HttpTokenRefresher {
    pub fn new(http: reqwest::Client, refresh_url: impl Into<String>, tokens: Arc<TokenStore>) -> Self {
        Self {
            http,
            refresh_url: refresh_url.into(),
            tokens,
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self) -> std::result::Result<(), RefreshError> {
        let refresh_token = self
            .tokens
            .refresh_token()
            .ok_or_else(|| RefreshError::Rejected("No refresh token in session".to_string()))?;

        let response = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(format!(
                "Refresh endpoint returned {}",
                status
            )));
        }

        let pair: TokenPair = response
            .json()
            .await
            .map_err(|e| RefreshError::Transport(format!("Invalid refresh response: {}", e)))?;

        self.tokens.set(pair);
        debug!("Stored refreshed token pair");
        Ok(())
    }
}

/// Clears the local session before handing off to the wrapped hook
pub struct SessionReset {
    tokens: Arc<TokenStore>,
    inner: Arc<dyn Reauthenticator>,
}

impl Reauthenticator for SessionReset {
    fn reauthenticate(&self, reason: &RefreshError) {
        self.tokens.clear();
        self.inner.reauthenticate(reason);
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    gate: Arc<RefreshGate>,
}

impl ApiClient {
    /// Build a client with its own token store and refresh gate.
    ///
    /// `refresh_path` is resolved against `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        refresh_path: &str,
        tokens: Arc<TokenStore>,
        config: RefreshGateConfig,
        reauthenticator: Arc<dyn Reauthenticator>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::new();

        let refresher = Arc::new(HttpTokenRefresher::new(
            http.clone(),
            format!("{}{}", base_url, refresh_path),
            Arc::clone(&tokens),
        ));
        let reset = Arc::new(SessionReset {
            tokens: Arc::clone(&tokens),
            inner: reauthenticator,
        });
        let gate = Arc::new(RefreshGate::new(config, refresher, reset));

        Self {
            http,
            base_url,
            tokens,
            gate,
        }
    }

    pub fn gate(&self) -> &Arc<RefreshGate> {
        &self.gate
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        call_with_refresh(&self.gate, move || {
            self.send_json::<T, ()>(Method::GET, path, None)
        })
        .await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        call_with_refresh(&self.gate, move || {
            self.send_json::<T, B>(Method::POST, path, Some(body))
        })
        .await
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);

        if let Some(token) = self.tokens.access_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CallError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            debug!(url = %url, "Access token rejected");
            return Err(CallError::AuthExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "API call failed");
            return Err(CallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CallError::Decode(e.to_string()))
    }
}
