//! Role preview overlay — admin-only, session-local substitution of the
//! acting role.
//!
//! Lets an admin render the application as a mentor or mentee for
//! verification without touching their stored profile. The overlay lives in
//! process memory only: it is never written to the profile store, and it is
//! cleared on sign-out.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::profile::Role;

/// The roles an admin can preview as.
///
/// Previewing as admin is unrepresentable: the real admin view needs no
/// preview, so the variant simply doesn't exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewRole {
    Mentor,
    Mentee,
}

impl PreviewRole {
    /// The role this preview renders as.
    pub fn as_role(self) -> Role {
        match self {
            Self::Mentor => Role::Mentor,
            Self::Mentee => Role::Mentee,
        }
    }
}

impl std::fmt::Display for PreviewRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_role().fmt(f)
    }
}

/// The preview overlay state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePreview {
    preview: Option<PreviewRole>,
}

impl RolePreview {
    /// A cleared overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a preview. Only an admin's real role may set one; for any
    /// other real role this is a no-op regardless of what the UI exposed.
    /// Returns whether the preview was applied.
    pub fn set(&mut self, real_role: Role, target: PreviewRole) -> bool {
        if real_role != Role::Admin {
            debug!(%real_role, "Ignoring preview request from non-admin");
            return false;
        }
        info!(preview = %target.as_role(), "Admin preview activated");
        self.preview = Some(target);
        true
    }

    /// Clear the preview. Always allowed.
    pub fn exit(&mut self) {
        if self.preview.take().is_some() {
            info!("Admin preview cleared");
        }
    }

    /// The active preview, if any.
    pub fn preview_role(&self) -> Option<PreviewRole> {
        self.preview
    }

    /// Whether a preview is active.
    pub fn is_active(&self) -> bool {
        self.preview.is_some()
    }

    /// The role that drives route gating.
    ///
    /// The preview only when the real role is admin; otherwise the real
    /// role; mentee while no role is known yet (the safe default for the
    /// window before the profile store responds).
    pub fn effective_role(&self, real_role: Option<Role>) -> Role {
        match real_role {
            Some(Role::Admin) => self
                .preview
                .map(PreviewRole::as_role)
                .unwrap_or(Role::Admin),
            Some(role) => role,
            None => Role::Mentee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_set_preview() {
        let mut overlay = RolePreview::new();
        assert!(overlay.set(Role::Admin, PreviewRole::Mentor));
        assert!(overlay.is_active());
        assert_eq!(overlay.effective_role(Some(Role::Admin)), Role::Mentor);
    }

    #[test]
    fn non_admin_set_is_a_noop() {
        let mut overlay = RolePreview::new();
        assert!(!overlay.set(Role::Mentor, PreviewRole::Mentee));
        assert!(!overlay.set(Role::Mentee, PreviewRole::Mentor));
        assert!(!overlay.is_active());
        // No observable effect on the effective role
        assert_eq!(overlay.effective_role(Some(Role::Mentor)), Role::Mentor);
        assert_eq!(overlay.effective_role(Some(Role::Mentee)), Role::Mentee);
    }

    #[test]
    fn exit_clears_preview() {
        let mut overlay = RolePreview::new();
        overlay.set(Role::Admin, PreviewRole::Mentee);
        overlay.exit();
        assert!(!overlay.is_active());
        assert_eq!(overlay.effective_role(Some(Role::Admin)), Role::Admin);
        // Exiting an inactive overlay is fine
        overlay.exit();
        assert!(!overlay.is_active());
    }

    #[test]
    fn effective_role_defaults_to_mentee_while_unknown() {
        let overlay = RolePreview::new();
        assert_eq!(overlay.effective_role(None), Role::Mentee);

        // A stale preview never leaks into the unknown-role window
        let mut overlay = RolePreview::new();
        overlay.set(Role::Admin, PreviewRole::Mentor);
        assert_eq!(overlay.effective_role(None), Role::Mentee);
    }

    #[test]
    fn preview_role_serde() {
        let mentor: PreviewRole = serde_json::from_str("\"mentor\"").unwrap();
        assert_eq!(mentor, PreviewRole::Mentor);
        let mentee: PreviewRole = serde_json::from_str("\"mentee\"").unwrap();
        assert_eq!(mentee, PreviewRole::Mentee);
        assert!(serde_json::from_str::<PreviewRole>("\"admin\"").is_err());
    }
}
