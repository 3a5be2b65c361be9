//! The on-disk credentials record, its field encodings and the secret
//! stores the token manager draws the client secret from.

pub mod codec;
pub mod secrets;
pub mod store;

pub use codec::{CodecError, DEFAULT_PASSPHRASE_ENV, FieldCodec, SecretEncoding};
pub use secrets::{
    CLIENT_SECRET, CredentialsSecretStore, EnvSecretStore, Secret, SecretError, SecretStore,
};
pub use store::{CredentialsRecord, CredentialsStore, StoreError};
