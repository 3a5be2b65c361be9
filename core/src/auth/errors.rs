use crate::credentials::{CodecError, SecretError, StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while acquiring an ARM bearer token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Credentials file {} is missing", .path.display())]
    CredentialsMissing { path: PathBuf },

    #[error("Invalid credentials: {0}")]
    CredentialsInvalid(String),

    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Network error during token request: {0}")]
    NetworkError(String),
}

impl From<StoreError> for TokenError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing { path } => TokenError::CredentialsMissing { path },
            other => TokenError::CredentialsInvalid(other.to_string()),
        }
    }
}

impl From<CodecError> for TokenError {
    fn from(err: CodecError) -> Self {
        TokenError::CredentialsInvalid(err.to_string())
    }
}

impl From<SecretError> for TokenError {
    fn from(err: SecretError) -> Self {
        TokenError::CredentialsInvalid(err.to_string())
    }
}
