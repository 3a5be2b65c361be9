use super::secrets::Secret;
use super::store::CredentialsRecord;
use crate::encryption::{EncryptionError, FieldCipher};
use crate::utils::EnvUtils;
use base64::{Engine as _, engine::general_purpose};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_PASSPHRASE_ENV: &str = "AZURE_HA_PASSPHRASE";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Decoded value is not UTF-8")]
    NotUtf8,

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error("Encrypted credentials need a '{0}' field")]
    MissingSalt(&'static str),

    #[error("Passphrase unavailable: {0}")]
    Passphrase(String),
}

/// How `pass` and `bearer` are encoded in the credentials file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SecretEncoding {
    /// Plain base64: obfuscation only, kept for existing files.
    #[default]
    Base64,
    /// AES-256-GCM with a key derived from the passphrase in the named
    /// environment variable.
    AesGcm { passphrase_env: String },
}

/// Encoder/decoder for sensitive credentials-file fields, bound to one
/// record (the AES variant keys off the record's salt).
pub enum FieldCodec {
    Base64,
    AesGcm(FieldCipher),
}

impl fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldCodec::Base64 => f.write_str("FieldCodec::Base64"),
            FieldCodec::AesGcm(_) => f.write_str("FieldCodec::AesGcm"),
        }
    }
}

impl FieldCodec {
    pub fn for_record(
        encoding: &SecretEncoding,
        record: &CredentialsRecord,
    ) -> Result<Self, CodecError> {
        match encoding {
            SecretEncoding::Base64 => Ok(FieldCodec::Base64),
            SecretEncoding::AesGcm { passphrase_env } => {
                let salt = record
                    .salt()
                    .ok_or(CodecError::MissingSalt(super::store::SALT_KEY))?;
                let passphrase = EnvUtils::get_validated_var(passphrase_env)
                    .map(Secret::new)
                    .map_err(|e| CodecError::Passphrase(e.to_string()))?;
                Ok(FieldCodec::AesGcm(FieldCipher::derive(passphrase.expose(), salt)?))
            }
        }
    }

    pub fn encode(&self, plaintext: &str) -> Result<String, CodecError> {
        match self {
            FieldCodec::Base64 => Ok(general_purpose::STANDARD.encode(plaintext)),
            FieldCodec::AesGcm(cipher) => Ok(cipher.encrypt(plaintext)?),
        }
    }

    pub fn decode(&self, encoded: &str) -> Result<Secret, CodecError> {
        match self {
            FieldCodec::Base64 => {
                // Files written by older tooling wrap base64 at 76 columns.
                let compact: String = encoded.split_whitespace().collect();
                let bytes = general_purpose::STANDARD.decode(compact)?;
                String::from_utf8(bytes)
                    .map(Secret::new)
                    .map_err(|_| CodecError::NotUtf8)
            }
            FieldCodec::AesGcm(cipher) => Ok(Secret::new(cipher.decrypt(encoded)?)),
        }
    }
}
