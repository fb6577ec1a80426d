//! Profile data model — the persisted per-identity record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::onboarding::OnboardingStep;
use crate::session::IdentityId;

/// Stored classification of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Mentor,
    Mentee,
}

impl Role {
    /// Parse a role string, if recognized.
    pub fn try_parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "mentor" => Some(Role::Mentor),
            "mentee" => Some(Role::Mentee),
            _ => None,
        }
    }

    /// Total parse that fails closed: an unrecognized role string resolves to
    /// the lowest-privilege role rather than granting access.
    pub fn parse(s: &str) -> Role {
        Self::try_parse(s).unwrap_or(Role::Mentee)
    }

    /// Whether this role skips onboarding entirely.
    pub fn skips_onboarding(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Mentee
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Mentor => "mentor",
            Self::Mentee => "mentee",
        };
        write!(f, "{s}")
    }
}

/// The persisted per-identity record.
///
/// Created when an identity first registers, mutated by the owning user
/// (self-service fields) or an admin (role, group assignment), never deleted
/// in normal operation.
///
/// Invariant: `is_onboarding_complete == true` implies
/// `onboarding_step == Completed`. The converse may lag briefly while a
/// completion write is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub identity: IdentityId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub onboarding_step: OnboardingStep,
    pub is_onboarding_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Create a fresh profile for an identity.
    ///
    /// Mentor/mentee profiles start at the `AccountSetup` pre-step; admin
    /// profiles are created already completed and never enter onboarding.
    pub fn new(identity: IdentityId, role: Role) -> Self {
        let now = Utc::now();
        let (step, complete) = if role.skips_onboarding() {
            (OnboardingStep::Completed, true)
        } else {
            (OnboardingStep::AccountSetup, false)
        };
        Self {
            identity,
            role,
            display_name: None,
            onboarding_step: step,
            is_onboarding_complete: complete,
            group_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this profile still has onboarding ahead of it.
    pub fn needs_onboarding(&self) -> bool {
        !self.role.skips_onboarding() && !self.is_onboarding_complete
    }
}

/// Observed state of the profile fetch for the current identity.
///
/// `Pending` (not yet loaded, or the read failed and will be retried) is
/// distinct from `Missing` (the store answered and no record exists): the
/// first resolves to the loading surface, the second to account setup.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileState {
    Pending,
    Missing,
    Loaded(Profile),
}

impl ProfileState {
    /// The stored role, when a profile is loaded.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Loaded(profile) => Some(profile.role),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_fails_closed() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("mentor"), Role::Mentor);
        assert_eq!(Role::parse("mentee"), Role::Mentee);
        // Corrupt values resolve to the lowest-privilege role
        assert_eq!(Role::parse("superuser"), Role::Mentee);
        assert_eq!(Role::parse(""), Role::Mentee);
        assert_eq!(Role::parse("Admin"), Role::Mentee);
    }

    #[test]
    fn role_display_matches_serde() {
        for role in [Role::Admin, Role::Mentor, Role::Mentee] {
            let display = format!("{role}");
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(format!("\"{display}\""), json);
            assert_eq!(Role::try_parse(&display), Some(role));
        }
    }

    #[test]
    fn new_mentee_starts_at_account_setup() {
        let profile = Profile::new(IdentityId::new(), Role::Mentee);
        assert_eq!(profile.onboarding_step, OnboardingStep::AccountSetup);
        assert!(!profile.is_onboarding_complete);
        assert!(profile.group_id.is_none());
        assert!(profile.needs_onboarding());
    }

    #[test]
    fn new_admin_is_created_completed() {
        let profile = Profile::new(IdentityId::new(), Role::Admin);
        assert_eq!(profile.onboarding_step, OnboardingStep::Completed);
        assert!(profile.is_onboarding_complete);
        assert!(!profile.needs_onboarding());
    }

    #[test]
    fn profile_serde_roundtrip() {
        let profile = Profile {
            group_id: Some(Uuid::new_v4()),
            display_name: Some("Jordan".to_string()),
            ..Profile::new(IdentityId::new(), Role::Mentor)
        };

        let json = serde_json::to_string(&profile).unwrap();
        let parsed: Profile = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, profile);
    }

    #[test]
    fn profile_state_role() {
        assert!(ProfileState::Pending.role().is_none());
        assert!(ProfileState::Missing.role().is_none());
        let profile = Profile::new(IdentityId::new(), Role::Mentor);
        assert_eq!(ProfileState::Loaded(profile).role(), Some(Role::Mentor));
    }
}
