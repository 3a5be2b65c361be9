use super::errors::TokenError;
use crate::credentials::Secret;
use async_trait::async_trait;

/// Parameters of an OAuth2 client-credentials grant.
#[derive(Clone, Debug)]
pub struct ClientCredentialsRequest {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: Secret,
    /// Resource the token is requested for (the ARM base URL).
    pub resource: String,
}

/// A freshly issued access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Expiry as epoch seconds, as reported by the identity provider.
    pub expires_on: i64,
}

/// Identity provider able to perform a client-credentials grant.
///
/// [`AzureAdProvider`](super::AzureAdProvider) talks to Azure AD; tests
/// substitute an in-memory implementation.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchanges the service principal's credentials for an access token.
    ///
    /// # Errors
    ///
    /// [`TokenError::NetworkError`] when the endpoint cannot be reached and
    /// [`TokenError::AuthFailure`] when it answers without an access token.
    async fn client_credentials_grant(
        &self,
        request: &ClientCredentialsRequest,
    ) -> Result<TokenGrant, TokenError>;
}
