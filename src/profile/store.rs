//! `ProfileStore` trait — backend-agnostic async interface to the profile
//! records.
//!
//! This is the consumed contract of the external store: the access core only
//! reads role/step/completion and writes step/completion (via onboarding
//! transitions) plus the admin-mutated fields.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::onboarding::OnboardingStep;
use crate::profile::model::{Profile, Role};
use crate::session::IdentityId;

/// Backend-agnostic profile store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), StoreError>;

    /// Fetch the profile for an identity, or None if it has not registered.
    async fn get_profile(&self, identity: IdentityId) -> Result<Option<Profile>, StoreError>;

    /// Insert a freshly created profile. Fails on a duplicate identity.
    async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    /// Persist an onboarding transition: the new step and completion flag
    /// are written together so the invariant between them holds in the store.
    async fn set_onboarding(
        &self,
        identity: IdentityId,
        step: OnboardingStep,
        complete: bool,
    ) -> Result<(), StoreError>;

    /// Change a profile's role (admin operation).
    async fn set_role(&self, identity: IdentityId, role: Role) -> Result<(), StoreError>;

    /// Assign or clear a profile's group (admin operation).
    async fn set_group(
        &self,
        identity: IdentityId,
        group_id: Option<Uuid>,
    ) -> Result<(), StoreError>;

    /// Set the display name chosen during account setup.
    async fn set_display_name(
        &self,
        identity: IdentityId,
        display_name: &str,
    ) -> Result<(), StoreError>;
}
