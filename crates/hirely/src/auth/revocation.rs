//! Revoked credentials.
//!
//! Tokens are self-contained, so logging out only deletes the browser's copy.
//! Logout also records the token ID here until the token would have expired
//! anyway, which stops a copied cookie from being replayed.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

/// Process-local set of revoked token IDs.
#[derive(Debug, Clone, Default)]
pub struct RevocationList {
    // jti -> exp
    entries: Arc<DashMap<String, i64>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke a token until its expiry.
    pub fn revoke(&self, jti: &str, expires_at: i64) {
        debug!(jti, expires_at, "revoking credential");
        self.entries.insert(jti.to_string(), expires_at);
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.entries.contains_key(jti)
    }

    /// Drop entries for tokens that have expired by `now`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired_at(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, exp| *exp > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now().timestamp())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
