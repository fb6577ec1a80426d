//! OnboardingManager — coordinates step transitions and their persistence.
//!
//! Every transition is written to the profile store before the caller-facing
//! state moves: a failed write leaves the profile on the prior step and
//! surfaces the error for retry, so the persisted step never runs ahead of
//! what the store confirmed. Writes carry the target step and are idempotent;
//! when transitions race, the last dispatched write wins and earlier
//! in-flight ones are discarded rather than merged.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::OnboardingError;
use crate::onboarding::state::OnboardingStep;
use crate::profile::model::{Profile, Role};
use crate::profile::store::ProfileStore;
use crate::session::IdentityId;

/// Outcome of a dispatched step write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The transition was persisted; this is the confirmed step.
    Applied(OnboardingStep),
    /// The profile was already at the target (terminal no-op or a retried
    /// write re-sending the same step). Nothing was written.
    Unchanged(OnboardingStep),
    /// A newer write was dispatched for the same identity while this one was
    /// in flight; it was discarded and must not move the caller's state.
    Superseded,
}

impl WriteOutcome {
    /// The confirmed step, when the write settled on one.
    pub fn step(&self) -> Option<OnboardingStep> {
        match self {
            Self::Applied(step) | Self::Unchanged(step) => Some(*step),
            Self::Superseded => None,
        }
    }
}

/// Onboarding status projection (for the REST endpoint).
#[derive(Debug, Clone, serde::Serialize)]
pub struct OnboardingStatus {
    pub step: OnboardingStep,
    pub is_onboarding_complete: bool,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Coordinates onboarding transitions against the profile store.
pub struct OnboardingManager {
    store: Arc<dyn ProfileStore>,
    /// Latest dispatched write sequence per identity. A write whose sequence
    /// is no longer the latest when it reaches the store is discarded.
    dispatch_seq: Mutex<HashMap<IdentityId, u64>>,
    /// Serializes store writes so the sequence check and the write are one
    /// step from the store's point of view.
    write_lock: Mutex<()>,
}

impl OnboardingManager {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            dispatch_seq: Mutex::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Current onboarding status for an identity.
    pub async fn status(&self, identity: IdentityId) -> Result<OnboardingStatus, OnboardingError> {
        let profile = self.load(identity).await?;
        Ok(OnboardingStatus {
            step: profile.onboarding_step,
            is_onboarding_complete: profile.is_onboarding_complete,
            role: profile.role,
            display_name: profile.display_name,
        })
    }

    /// Move to the step immediately following the current one.
    ///
    /// A no-op at `Completed` (and for admins, whose profiles are created
    /// there).
    pub async fn advance(&self, identity: IdentityId) -> Result<WriteOutcome, OnboardingError> {
        let profile = self.load(identity).await?;
        let target = profile.onboarding_step.advance();
        if target == profile.onboarding_step {
            return Ok(WriteOutcome::Unchanged(target));
        }
        self.apply(identity, target, target.is_terminal() && profile.is_onboarding_complete)
            .await
    }

    /// Move back to the step immediately preceding the current one.
    ///
    /// A no-op at `Welcome`; `AccountSetup` is not reachable by retreat.
    pub async fn retreat(&self, identity: IdentityId) -> Result<WriteOutcome, OnboardingError> {
        let profile = self.load(identity).await?;
        let target = profile.onboarding_step.retreat();
        if target == profile.onboarding_step {
            return Ok(WriteOutcome::Unchanged(target));
        }
        self.apply(identity, target, false).await
    }

    /// Terminal transition: step becomes `Completed` and the completion flag
    /// is set, in one write.
    ///
    /// The intended origin is `ReadinessCheck`; completing from elsewhere is
    /// permitted (the machine leaves that policy to its callers) but logged.
    pub async fn complete(&self, identity: IdentityId) -> Result<WriteOutcome, OnboardingError> {
        let profile = self.load(identity).await?;
        if profile.is_onboarding_complete {
            return Ok(WriteOutcome::Unchanged(OnboardingStep::Completed));
        }
        if profile.onboarding_step != OnboardingStep::ReadinessCheck {
            warn!(
                %identity,
                step = %profile.onboarding_step,
                "Completing onboarding from an unexpected step"
            );
        }
        self.apply(identity, OnboardingStep::Completed, true).await
    }

    /// Finish account setup: record the chosen display name and move from
    /// the `AccountSetup` pre-step into `Welcome`.
    ///
    /// An authenticated identity with no profile record is the first-run
    /// case: the profile is created here, as a mentee, at `AccountSetup`.
    /// Re-submitting after the step already moved past is a no-op.
    pub async fn complete_account_setup(
        &self,
        identity: IdentityId,
        display_name: Option<&str>,
    ) -> Result<WriteOutcome, OnboardingError> {
        let profile = match self.store.get_profile(identity).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                let profile = Profile::new(identity, Role::Mentee);
                self.store.insert_profile(&profile).await.map_err(|source| {
                    OnboardingError::WriteFailed {
                        step: OnboardingStep::AccountSetup,
                        source,
                    }
                })?;
                info!(%identity, "Created profile on first sign-in");
                profile
            }
            Err(source) => {
                return Err(OnboardingError::WriteFailed {
                    step: OnboardingStep::AccountSetup,
                    source,
                });
            }
        };

        if let Some(name) = display_name {
            self.store
                .set_display_name(identity, name)
                .await
                .map_err(|source| OnboardingError::WriteFailed {
                    step: OnboardingStep::AccountSetup,
                    source,
                })?;
        }

        if profile.onboarding_step != OnboardingStep::AccountSetup {
            return Ok(WriteOutcome::Unchanged(profile.onboarding_step));
        }
        self.apply(identity, OnboardingStep::Welcome, false).await
    }

    /// Load the profile backing a transition.
    async fn load(&self, identity: IdentityId) -> Result<Profile, OnboardingError> {
        match self.store.get_profile(identity).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Err(OnboardingError::ProfileMissing { identity }),
            Err(source) => Err(OnboardingError::WriteFailed {
                step: OnboardingStep::AccountSetup,
                source,
            }),
        }
    }

    /// Dispatch a step write.
    ///
    /// Allocates a per-identity sequence number at dispatch; once the write
    /// lock is held, a write whose sequence is no longer the latest is
    /// discarded without touching the store. The store write itself carries
    /// the target step, so retrying an already-applied write is harmless.
    async fn apply(
        &self,
        identity: IdentityId,
        step: OnboardingStep,
        complete: bool,
    ) -> Result<WriteOutcome, OnboardingError> {
        let seq = {
            let mut seqs = self.dispatch_seq.lock().await;
            let entry = seqs.entry(identity).or_insert(0);
            *entry += 1;
            *entry
        };

        let _guard = self.write_lock.lock().await;

        {
            let seqs = self.dispatch_seq.lock().await;
            if seqs.get(&identity).copied() != Some(seq) {
                debug!(%identity, %step, "Discarding superseded onboarding write");
                return Ok(WriteOutcome::Superseded);
            }
        }

        match self.store.set_onboarding(identity, step, complete).await {
            Ok(()) => {
                info!(%identity, %step, complete, "Onboarding step persisted");
                Ok(WriteOutcome::Applied(step))
            }
            Err(source) => {
                warn!(%identity, %step, error = %source, "Onboarding write failed, staying on prior step");
                Err(OnboardingError::WriteFailed { step, source })
            }
        }
    }
}
