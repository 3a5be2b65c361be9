use super::errors::TokenError;
use super::provider::{ClientCredentialsRequest, IdentityProvider};
use super::token::{BearerToken, format_lifetime};
use crate::arm::ResourceScope;
use crate::credentials::{
    CLIENT_SECRET, CredentialsRecord, CredentialsSecretStore, CredentialsStore, FieldCodec,
    SecretEncoding, SecretStore,
};
use std::sync::Arc;

/// An acquired token together with the scope read from the same record.
#[derive(Clone, Debug)]
pub struct Session {
    pub scope: ResourceScope,
    pub token: BearerToken,
}

/// Owns bearer-token acquisition, reuse and persistence.
///
/// A cached token with more than a minute of validity left is reused
/// without contacting the identity provider. Otherwise a client-credentials
/// grant is performed and the result is written back to the credentials
/// file, replacing the previous cached value.
pub struct TokenManager {
    store: CredentialsStore,
    encoding: SecretEncoding,
    provider: Arc<dyn IdentityProvider>,
    secret_store: Option<Arc<dyn SecretStore>>,
    resource: String,
}

impl TokenManager {
    pub fn new(
        store: CredentialsStore,
        provider: Arc<dyn IdentityProvider>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            store,
            encoding: SecretEncoding::default(),
            provider,
            secret_store: None,
            resource: resource.into(),
        }
    }

    pub fn with_encoding(mut self, encoding: SecretEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Takes the client secret from `secret_store` instead of the
    /// credentials file.
    pub fn with_secret_store(mut self, secret_store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(secret_store);
        self
    }

    pub fn store(&self) -> &CredentialsStore {
        &self.store
    }

    /// Returns a currently valid bearer token.
    pub async fn acquire_token(&self) -> Result<BearerToken, TokenError> {
        self.acquire().await.map(|session| session.token)
    }

    /// Returns a currently valid bearer token and the resource scope.
    pub async fn acquire(&self) -> Result<Session, TokenError> {
        self.acquire_at(chrono::Utc::now().timestamp()).await
    }

    pub async fn acquire_at(&self, now: i64) -> Result<Session, TokenError> {
        let mut record = self.store.load()?;
        let scope = ResourceScope::new(record.subscription_id()?, record.resource_group()?);
        let codec = FieldCodec::for_record(&self.encoding, &record)?;

        if let Some(token) = self.reusable_token(&record, &codec, now)? {
            log::debug!(
                "Reusing existing bearer, it expires in {}",
                format_lifetime(token.remaining_secs(now))
            );
            return Ok(Session { scope, token });
        }

        let request = self.grant_request(&record, &codec)?;
        let grant = self.provider.client_credentials_grant(&request).await?;
        let token = BearerToken::new(grant.access_token, grant.expires_on);

        log::info!(
            "Obtained new bearer, it expires in {}",
            format_lifetime(token.remaining_secs(now))
        );

        match codec.encode(token.value()) {
            Ok(encoded) => {
                record.set_bearer(encoded, token.expires_on());
                if let Err(e) = self.store.save(&record) {
                    log::error!("Failed to persist the new bearer: {e}");
                }
            }
            Err(e) => log::error!("Failed to encode the new bearer for storage: {e}"),
        }

        Ok(Session { scope, token })
    }

    /// Drops the cached bearer from the credentials file so the next
    /// acquisition performs a fresh grant.
    pub fn invalidate(&self) -> Result<(), TokenError> {
        let mut record = self.store.load()?;
        if record.clear_bearer() {
            self.store.save(&record)?;
            log::warn!("Cached bearer discarded");
        }
        Ok(())
    }

    fn reusable_token(
        &self,
        record: &CredentialsRecord,
        codec: &FieldCodec,
        now: i64,
    ) -> Result<Option<BearerToken>, TokenError> {
        let Some((encoded, expires_on)) = record.cached_bearer()? else {
            return Ok(None);
        };

        let cached = BearerToken::new(String::new(), expires_on);
        if !cached.is_reusable_at(now) {
            log::debug!("Cached bearer expired or about to expire, requesting a new one");
            return Ok(None);
        }

        let value = codec.decode(encoded)?;
        Ok(Some(BearerToken::new(value.expose(), expires_on)))
    }

    fn grant_request(
        &self,
        record: &CredentialsRecord,
        codec: &FieldCodec,
    ) -> Result<ClientCredentialsRequest, TokenError> {
        let client_secret = match &self.secret_store {
            Some(secret_store) => secret_store.get(CLIENT_SECRET)?,
            None => CredentialsSecretStore::new(record, codec).get(CLIENT_SECRET)?,
        };

        Ok(ClientCredentialsRequest {
            tenant_id: record.tenant_id()?.to_string(),
            client_id: record.app_id()?.to_string(),
            client_secret,
            resource: self.resource.clone(),
        })
    }
}
