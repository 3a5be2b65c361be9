use std::fmt;

/// Minimum remaining lifetime, in seconds, for a cached token to be reused.
/// Absorbs clock skew between this node and the identity provider.
pub const REUSE_THRESHOLD_SECS: i64 = 60;

/// An ARM bearer token and the epoch second it expires at.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    value: String,
    expires_on: i64,
}

impl BearerToken {
    pub fn new(value: impl Into<String>, expires_on: i64) -> Self {
        Self {
            value: value.into(),
            expires_on,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_on(&self) -> i64 {
        self.expires_on
    }

    /// Seconds left at `now`, negative once expired. Saturates instead of
    /// overflowing on nonsensical expiry values.
    pub fn remaining_secs(&self, now: i64) -> i64 {
        self.expires_on.saturating_sub(now)
    }

    /// Whether the token still has strictly more than
    /// [`REUSE_THRESHOLD_SECS`] of validity at `now`.
    pub fn is_reusable_at(&self, now: i64) -> bool {
        self.remaining_secs(now) > REUSE_THRESHOLD_SECS
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &"***")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Formats a lifetime in seconds as `H:MM:SS`.
pub fn format_lifetime(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
