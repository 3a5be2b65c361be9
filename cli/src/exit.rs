//! Process exit codes understood by the load balancer's health monitor.

use azure_ha_core::auth::TokenError;

/// Peer is up, or `-a` authenticated successfully.
pub const OK: i32 = 0;
/// Peer is down. Any failover has been attempted.
pub const PEER_DOWN: i32 = 1;
pub const ARM_AUTH: i32 = 4;
pub const ARGS: i32 = 8;

/// Exit code for an authentication test (`-a`).
pub fn auth_code(error: Option<&TokenError>) -> i32 {
    match error {
        None => OK,
        Some(TokenError::AuthFailure(_) | TokenError::NetworkError(_)) => 1,
        Some(TokenError::CredentialsInvalid(_)) => 2,
        Some(TokenError::CredentialsMissing { .. }) => 3,
    }
}
