use super::codec::FieldCodec;
use super::store::{CredentialsRecord, SECRET_KEY};
use crate::utils::{EnvUtils, EnvVarError};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Name under which the service principal's client secret is looked up.
pub const CLIENT_SECRET: &str = SECRET_KEY;

/// Prefix for secrets supplied through the environment.
pub const DEFAULT_ENV_PREFIX: &str = "AZURE_HA_";

/// A sensitive string that is wiped from memory on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret '{name}' is not available: {reason}")]
    NotFound { name: String, reason: String },

    #[error("Secret '{name}' could not be decoded: {reason}")]
    Decode { name: String, reason: String },

    #[error(transparent)]
    Env(#[from] EnvVarError),
}

/// Source of named secrets.
///
/// The credentials file is the compatible default; deployments that do not
/// want the client secret on disk can supply it from the environment
/// instead.
pub trait SecretStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Secret, SecretError>;
}

/// Reads secrets out of the loaded credentials record, decoding them with
/// the record's field codec.
pub struct CredentialsSecretStore<'a> {
    record: &'a CredentialsRecord,
    codec: &'a FieldCodec,
}

impl<'a> CredentialsSecretStore<'a> {
    pub fn new(record: &'a CredentialsRecord, codec: &'a FieldCodec) -> Self {
        Self { record, codec }
    }
}

impl SecretStore for CredentialsSecretStore<'_> {
    fn get(&self, name: &str) -> Result<Secret, SecretError> {
        let encoded = self
            .record
            .fields()
            .get(name)
            .and_then(|value| value.as_str())
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| SecretError::NotFound {
                name: name.to_string(),
                reason: "not present in the credentials file".to_string(),
            })?;

        self.codec
            .decode(encoded)
            .map_err(|e| SecretError::Decode {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Reads secrets from `<prefix><NAME>` environment variables.
#[derive(Clone, Debug)]
pub struct EnvSecretStore {
    prefix: String,
}

impl EnvSecretStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn variable_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name.to_ascii_uppercase())
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

impl SecretStore for EnvSecretStore {
    fn get(&self, name: &str) -> Result<Secret, SecretError> {
        let value = EnvUtils::get_validated_var(&self.variable_name(name))?;
        Ok(Secret::new(value))
    }
}
