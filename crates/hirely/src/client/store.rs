//! Client identity store.
//!
//! Holds who the client believes is signed in. Components read snapshots or
//! subscribe to changes; only the transition methods below write.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::auth::{Identity, Role};

/// Point-in-time view of the client's session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentitySnapshot {
    /// Confirmed identity, if any.
    pub identity: Option<Identity>,
    /// A login or signup is in flight.
    pub loading: bool,
}

impl IdentitySnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|identity| identity.role)
    }
}

/// Shared, injectable identity container.
///
/// Clones share state. Concurrent resolutions are last-write-wins.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    tx: Arc<watch::Sender<IdentitySnapshot>>,
    // Bumped by every terminating transition.
    generation: Arc<AtomicU64>,
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(IdentitySnapshot::default());
        Self {
            tx: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> IdentitySnapshot {
        self.tx.borrow().clone()
    }

    /// Receive a notification on every transition.
    pub fn subscribe(&self) -> watch::Receiver<IdentitySnapshot> {
        self.tx.subscribe()
    }

    /// Mark an auth attempt as started. Identity is unchanged.
    ///
    /// The returned guard must be resolved; dropping it unresolved clears
    /// the identity.
    pub fn begin_auth(&self) -> PendingAuth {
        self.tx.send_modify(|snapshot| snapshot.loading = true);
        self.pending()
    }

    /// Like [`begin_auth`](Self::begin_auth), but refuses while another
    /// attempt is loading.
    pub fn try_begin_auth(&self) -> Option<PendingAuth> {
        let started = self.tx.send_if_modified(|snapshot| {
            if snapshot.loading {
                false
            } else {
                snapshot.loading = true;
                true
            }
        });

        if started {
            Some(self.pending())
        } else {
            debug!("auth attempt refused: another is in flight");
            None
        }
    }

    /// Record a server-confirmed identity.
    pub fn set_identity(&self, identity: Identity) {
        debug!(user_id = %identity.id, role = %identity.role, "identity set");
        self.tx.send_modify(|snapshot| {
            snapshot.identity = Some(identity);
            snapshot.loading = false;
        });
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Forget the identity (logout, failed auth, or any 401).
    pub fn clear_identity(&self) {
        debug!("identity cleared");
        self.tx.send_modify(|snapshot| {
            snapshot.identity = None;
            snapshot.loading = false;
        });
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn pending(&self) -> PendingAuth {
        PendingAuth {
            store: self.clone(),
            generation: self.generation.load(Ordering::SeqCst),
            resolved: false,
        }
    }
}

/// An in-flight auth attempt.
#[derive(Debug)]
#[must_use = "an auth attempt must end with succeed() or fail()"]
pub struct PendingAuth {
    store: IdentityStore,
    generation: u64,
    resolved: bool,
}

impl PendingAuth {
    /// End the attempt with a confirmed identity.
    pub fn succeed(mut self, identity: Identity) {
        self.resolved = true;
        self.store.set_identity(identity);
    }

    /// End the attempt without an identity.
    pub fn fail(mut self) {
        self.resolved = true;
        self.store.clear_identity();
    }
}

impl Drop for PendingAuth {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        // Someone else already ended the loading state.
        if self.store.generation.load(Ordering::SeqCst) != self.generation {
            return;
        }
        warn!("auth attempt dropped without resolution; clearing identity");
        self.store.clear_identity();
    }
}
