//! Onboarding system — the gated setup sequence for mentors and mentees.
//!
//! A non-admin profile walks a fixed sequence of steps once, after first
//! authentication, before reaching the main application. The step enum
//! defines the order; the manager persists every transition to the profile
//! store before the caller-facing state moves.

pub mod manager;
pub mod routes;
pub mod state;

pub use manager::{OnboardingManager, OnboardingStatus, WriteOutcome};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::OnboardingStep;
