//! Access hub — owns the live inputs of the resolver and fans out changes.
//!
//! The session settles and the profile fetch answers independently, in
//! either order; the hub re-resolves whenever any input moves (sign-in/out,
//! preview changes, onboarding writes) and broadcasts the new resolution to
//! every subscriber. The preview overlay lives here, in process memory, and
//! is cleared on sign-out — it never reaches the store.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

use crate::access::gate::{self, RouteFamily};
use crate::access::resolver::{self, Surface};
use crate::error::SessionError;
use crate::preview::{PreviewRole, RolePreview};
use crate::profile::{ProfileState, ProfileStore, Role};
use crate::session::{IdentityId, SessionTracker};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// A resolved access state: the surface plus the reachable route families.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    #[serde(flatten)]
    pub surface: Surface,
    pub routes: Vec<RouteFamily>,
}

impl Resolution {
    fn for_surface(surface: Surface) -> Self {
        let routes = match surface {
            Surface::MainApp { role } => gate::allowed_routes(role),
            _ => Vec::new(),
        };
        Self { surface, routes }
    }
}

/// Events fanned out to WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessEvent {
    /// Sent to each client on connect.
    Sync { resolution: Resolution },
    /// Sent whenever any resolver input changes.
    AccessUpdate { resolution: Resolution },
}

/// Live access state for one running session.
pub struct AccessHub {
    store: Arc<dyn ProfileStore>,
    session: SessionTracker,
    preview: RwLock<RolePreview>,
    tx: broadcast::Sender<AccessEvent>,
}

impl AccessHub {
    /// Create a hub over the given profile store. The session starts in the
    /// `Loading` state until the identity provider settles.
    pub fn new(store: Arc<dyn ProfileStore>) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            store,
            session: SessionTracker::new(),
            preview: RwLock::new(RolePreview::new()),
            tx,
        })
    }

    /// The session tracker (read-only view for callers).
    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    /// Subscribe to access-state events. Each WS client calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<AccessEvent> {
        self.tx.subscribe()
    }

    /// Resolve the current surface and route set.
    pub async fn resolve(&self) -> Resolution {
        let session = self.session.state();
        let profile = self.profile_state().await;
        let preview = self.preview.read().await.clone();
        Resolution::for_surface(resolver::resolve(&session, &profile, &preview))
    }

    /// The signed-in identity's real (stored) role, if loaded.
    pub async fn real_role(&self) -> Option<Role> {
        self.profile_state().await.role()
    }

    // ── Session transitions ─────────────────────────────────────────

    /// Record a successful sign-in and rebroadcast.
    pub async fn sign_in(&self, identity: IdentityId) {
        self.session.sign_in(identity);
        self.broadcast_update().await;
    }

    /// Record a sign-out. Clears the preview overlay before resolving so a
    /// later session never inherits it.
    pub async fn sign_out(&self) {
        self.preview.write().await.exit();
        self.session.sign_out();
        self.broadcast_update().await;
    }

    /// Identity provider settled with no session.
    pub async fn settle_signed_out(&self) {
        self.session.settle_signed_out();
        self.broadcast_update().await;
    }

    /// Identity provider unreachable: lands on the sign-in surface with a
    /// retry, never a crash.
    pub async fn settle_failed(&self, err: &SessionError) {
        self.session.settle_failed(err);
        self.broadcast_update().await;
    }

    // ── Preview transitions ─────────────────────────────────────────

    /// Activate an admin preview. A no-op (returning false) unless the
    /// signed-in identity's real role is admin.
    pub async fn set_preview(&self, target: PreviewRole) -> bool {
        let Some(real_role) = self.real_role().await else {
            debug!("Ignoring preview request before a role is known");
            return false;
        };
        let applied = self.preview.write().await.set(real_role, target);
        if applied {
            self.broadcast_update().await;
        }
        applied
    }

    /// Clear the preview overlay.
    pub async fn exit_preview(&self) {
        self.preview.write().await.exit();
        self.broadcast_update().await;
    }

    /// Whether a preview is active.
    pub async fn preview_active(&self) -> bool {
        self.preview.read().await.is_active()
    }

    // ── Profile changes ─────────────────────────────────────────────

    /// Re-resolve and rebroadcast after a profile mutation (onboarding
    /// transition, admin role/group change).
    pub async fn notify_profile_changed(&self) {
        self.broadcast_update().await;
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Fetch the profile state for the signed-in identity.
    ///
    /// A read failure is "not yet loaded", to be retried on the next touch —
    /// never fatal, and never confused with a confirmed-missing record.
    async fn profile_state(&self) -> ProfileState {
        let Some(identity) = self.session.current_identity() else {
            return ProfileState::Pending;
        };
        match self.store.get_profile(identity).await {
            Ok(Some(profile)) => ProfileState::Loaded(profile),
            Ok(None) => ProfileState::Missing,
            Err(e) => {
                warn!(%identity, error = %e, "Profile read failed, treating as not yet loaded");
                ProfileState::Pending
            }
        }
    }

    /// Broadcast the current resolution. Fine if nobody is listening.
    async fn broadcast_update(&self) {
        let resolution = self.resolve().await;
        debug!(surface = %resolution.surface, "Access state updated");
        let _ = self.tx.send(AccessEvent::AccessUpdate { resolution });
    }
}
