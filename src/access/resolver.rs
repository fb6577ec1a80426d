//! Access resolver — the single decision point mapping session, profile,
//! and preview state to exactly one top-level surface.

use serde::Serialize;

use crate::onboarding::OnboardingStep;
use crate::preview::RolePreview;
use crate::profile::{ProfileState, Role};
use crate::session::SessionState;

/// The mutually exclusive top-level surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "surface", rename_all = "snake_case")]
pub enum Surface {
    /// Session or profile still settling.
    Loading,
    /// Only the sign-in/sign-up surface is reachable.
    Unauthenticated,
    /// Account-setup pre-step (also the first-run case with no profile yet).
    AccountSetup,
    /// Onboarding, positioned at the stored step.
    Onboarding { step: OnboardingStep },
    /// The main application, gated by the effective role.
    MainApp { role: Role },
}

impl Surface {
    /// Whether this surface gates the main application behind it.
    pub fn is_gating(&self) -> bool {
        !matches!(self, Self::MainApp { .. })
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::AccountSetup => write!(f, "account_setup"),
            Self::Onboarding { step } => write!(f, "onboarding:{step}"),
            Self::MainApp { role } => write!(f, "main_app:{role}"),
        }
    }
}

/// Resolve the surface for the current inputs. Evaluated in order, first
/// match wins; every input combination lands on exactly one surface.
///
/// All three inputs are passed explicitly — the resolver owns no state and
/// reads no ambient context.
pub fn resolve(session: &SessionState, profile: &ProfileState, preview: &RolePreview) -> Surface {
    // 1. Session still settling.
    if session.is_loading() {
        return Surface::Loading;
    }

    // 2. Nobody signed in.
    if session.identity().is_none() {
        return Surface::Unauthenticated;
    }

    match profile {
        // Signed in, but the profile fetch has not answered (or failed and
        // will be retried). Distinct from a confirmed-missing profile.
        ProfileState::Pending => Surface::Loading,

        // The store answered and no record exists: first run, straight to
        // account setup.
        ProfileState::Missing => Surface::AccountSetup,

        ProfileState::Loaded(p) => {
            // 3. Incomplete onboarding gates mentors and mentees. Admins
            // short-circuit: even a profile incorrectly flagged incomplete
            // never routes an admin through onboarding.
            if p.needs_onboarding() {
                if p.onboarding_step == OnboardingStep::AccountSetup {
                    Surface::AccountSetup
                } else {
                    Surface::Onboarding {
                        step: p.onboarding_step,
                    }
                }
            } else {
                // 4. Main application, under the effective role.
                Surface::MainApp {
                    role: preview.effective_role(Some(p.role)),
                }
            }
        }
    }
}
