use super::errors::TokenError;
use super::provider::{ClientCredentialsRequest, IdentityProvider, TokenGrant};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

#[derive(Clone, Debug)]
pub struct AzureAdProvider {
    authority_host: String,
    http_client: reqwest::Client,
}

/// Token endpoint response. Every field is optional: Azure AD answers
/// errors with a 4xx and an `error`/`error_description` body instead.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_on: Option<EpochSeconds>,
    expires_in: Option<EpochSeconds>,
    error: Option<String>,
    error_description: Option<String>,
}

/// The v1 endpoint reports numbers as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum EpochSeconds {
    Number(i64),
    Text(String),
}

impl EpochSeconds {
    fn as_secs(&self) -> Option<i64> {
        match self {
            EpochSeconds::Number(n) => Some(*n),
            EpochSeconds::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl TokenResponse {
    /// Absolute expiry, from `expires_on` or else `now + expires_in`.
    /// `None` when neither is usable or the sum overflows.
    fn expiry(&self, now: i64) -> Option<i64> {
        match self.expires_on.as_ref().and_then(EpochSeconds::as_secs) {
            Some(expires_on) => Some(expires_on),
            None => self
                .expires_in
                .as_ref()
                .and_then(EpochSeconds::as_secs)
                .and_then(|expires_in| now.checked_add(expires_in)),
        }
    }
}

impl AzureAdProvider {
    pub fn new(authority_host: impl Into<String>, timeout: Duration) -> Result<Self, TokenError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TokenError::NetworkError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(authority_host, http_client))
    }

    pub fn with_client(authority_host: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            authority_host: authority_host.into(),
            http_client,
        }
    }

    pub fn token_endpoint(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/token",
            self.authority_host.trim_end_matches('/'),
            tenant_id
        )
    }
}

#[async_trait]
impl IdentityProvider for AzureAdProvider {
    async fn client_credentials_grant(
        &self,
        request: &ClientCredentialsRequest,
    ) -> Result<TokenGrant, TokenError> {
        let token_url = self.token_endpoint(&request.tenant_id);

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.expose()),
            ("resource", request.resource.as_str()),
        ];

        log::debug!("Requesting client-credentials token from {token_url}");

        let response = self
            .http_client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| TokenError::NetworkError(format!("{token_url}: {e}")))?;

        let status = response.status();
        let body: TokenResponse = response.json().await.map_err(|e| {
            TokenError::AuthFailure(format!("Unreadable token response (HTTP {status}): {e}"))
        })?;

        let expires_on = body.expiry(chrono::Utc::now().timestamp());

        let Some(access_token) = body.access_token.filter(|token| !token.is_empty()) else {
            let reason = match (body.error, body.error_description) {
                (Some(error), Some(description)) => format!("{error} - {description}"),
                (Some(error), None) => error,
                (None, Some(description)) => description,
                (None, None) => format!("HTTP {status}, no access_token in response"),
            };
            return Err(TokenError::AuthFailure(reason));
        };

        let expires_on = expires_on.ok_or_else(|| {
            TokenError::AuthFailure("Token response carries no usable expiry".to_string())
        })?;

        Ok(TokenGrant {
            access_token,
            expires_on,
        })
    }
}
