pub mod azure_ad;
pub mod errors;
pub mod provider;
pub mod token;
pub mod token_manager;

pub use azure_ad::{AzureAdProvider, DEFAULT_AUTHORITY_HOST};
pub use errors::TokenError;
pub use provider::{ClientCredentialsRequest, IdentityProvider, TokenGrant};
pub use token::{BearerToken, REUSE_THRESHOLD_SECS, format_lifetime};
pub use token_manager::{Session, TokenManager};
