//! Identity session tracking.
//!
//! The identity provider itself is external; this module holds the settled
//! view of it — is someone signed in, and who — and publishes every change
//! over a watch channel so the access resolution can be recomputed whenever
//! the session settles, signs in, or signs out.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SessionError;

/// Opaque handle for an authenticated identity.
///
/// Created on sign-in, destroyed on sign-out; the session component is the
/// only owner. Everything else treats it as an opaque key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
    /// Mint a fresh identity handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for IdentityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settled state of the identity session.
///
/// `Loading` is distinct from `SignedOut`: the first means the provider has
/// not answered yet, the second that it answered "nobody".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "session", rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    SignedOut,
    SignedIn { identity: IdentityId },
}

impl SessionState {
    /// Whether the provider has not yet settled.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The authenticated identity, if any.
    pub fn identity(&self) -> Option<IdentityId> {
        match self {
            Self::SignedIn { identity } => Some(*identity),
            _ => None,
        }
    }
}

/// In-process session tracker publishing changes over a watch channel.
pub struct SessionTracker {
    tx: watch::Sender<SessionState>,
}

impl SessionTracker {
    /// Create a tracker in the `Loading` state (provider not yet settled).
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Loading);
        Self { tx }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.tx.borrow()
    }

    /// The authenticated identity, if any.
    pub fn current_identity(&self) -> Option<IdentityId> {
        self.state().identity()
    }

    /// Whether the session is still loading.
    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// Provider settled with no active session.
    pub fn settle_signed_out(&self) {
        self.tx.send_replace(SessionState::SignedOut);
    }

    /// Provider could not be reached. Settles as signed-out so the caller
    /// lands on the sign-in surface with a retry, never a crash.
    pub fn settle_failed(&self, err: &SessionError) {
        warn!(error = %err, "Identity provider failed, settling signed-out");
        self.tx.send_replace(SessionState::SignedOut);
    }

    /// Record a successful sign-in.
    pub fn sign_in(&self, identity: IdentityId) {
        info!(%identity, "Signed in");
        self.tx.send_replace(SessionState::SignedIn { identity });
    }

    /// Record a sign-out, from any state.
    pub fn sign_out(&self) {
        if let Some(identity) = self.current_identity() {
            info!(%identity, "Signed out");
        }
        self.tx.send_replace(SessionState::SignedOut);
    }

    /// Subscribe to session changes. Each subscriber sees the current state
    /// immediately and every change after.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// The session changes as a `Stream`.
    pub fn stream(&self) -> WatchStream<SessionState> {
        WatchStream::new(self.tx.subscribe())
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}
