//! Error types for MentorHub.

use crate::onboarding::OnboardingStep;
use crate::session::IdentityId;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Profile-store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Profile not found for identity {identity}")]
    NotFound { identity: IdentityId },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Identity-session errors.
///
/// A failing identity provider never crashes the resolver; it settles the
/// session as signed-out and the caller surfaces a retry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Identity provider unreachable: {0}")]
    ProviderUnreachable(String),

    #[error("No authenticated identity")]
    NotSignedIn,
}

/// Onboarding progression errors.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("No profile exists for identity {identity}")]
    ProfileMissing { identity: IdentityId },

    #[error("Failed to persist onboarding step {step}: {source}")]
    WriteFailed {
        step: OnboardingStep,
        #[source]
        source: StoreError,
    },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
