use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit},
};
use base64::{Engine as _, engine::general_purpose};
use pbkdf2::pbkdf2_hmac;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

const PBKDF2_ROUNDS: u32 = 100_000;
pub const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Invalid salt: {0}")]
    InvalidSalt(String),

    #[error("Field could not be encrypted")]
    Encrypt,

    #[error("Field could not be decrypted: {0}")]
    Decrypt(&'static str),
}

/// AES-256-GCM cipher for the `pass` and `bearer` fields of one credentials
/// file.
///
/// The key comes from PBKDF2-SHA256 over the passphrase and the file's
/// `salt` field, and is derived once when the cipher is built. Each field
/// is stored as `base64(nonce || ciphertext)`.
pub struct FieldCipher {
    aead: Aes256Gcm,
}

impl FieldCipher {
    pub fn derive(passphrase: &str, salt_b64: &str) -> Result<Self, EncryptionError> {
        let salt = general_purpose::STANDARD
            .decode(salt_b64.trim())
            .map_err(|e| EncryptionError::InvalidSalt(e.to_string()))?;
        if salt.len() != SALT_LEN {
            return Err(EncryptionError::InvalidSalt(format!(
                "expected {SALT_LEN} bytes, got {}",
                salt.len()
            )));
        }

        let mut key = Zeroizing::new([0u8; 32]);
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), &salt, PBKDF2_ROUNDS, key.as_mut_slice());

        Ok(Self {
            aead: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice())),
        })
    }

    /// Fresh random salt, base64 encoded for the credentials file.
    pub fn generate_salt() -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        general_purpose::STANDARD.encode(salt)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .aead
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::Encrypt)?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&sealed);
        Ok(general_purpose::STANDARD.encode(combined))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, EncryptionError> {
        let combined = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| EncryptionError::Decrypt("not base64"))?;
        if combined.len() <= NONCE_LEN {
            return Err(EncryptionError::Decrypt("too short"));
        }

        let (nonce, sealed) = combined.split_at(NONCE_LEN);
        let plain = self
            .aead
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| EncryptionError::Decrypt("authentication failed"))?;
        String::from_utf8(plain).map_err(|_| EncryptionError::Decrypt("not UTF-8"))
    }
}
