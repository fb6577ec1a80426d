//! Onboarding state machine — the ordered steps a mentor or mentee walks
//! through before reaching the main application.

use serde::{Deserialize, Serialize};

/// The onboarding steps, in order.
///
/// Progresses linearly: AccountSetup → Welcome → ProfileSetup → GoalSetting →
/// ToolSetup → GroupAssignment → ReadinessCheck → Completed.
///
/// `AccountSetup` is a distinguished pre-step for accounts provisioned via a
/// pre-shared access code: it precedes `Welcome` and sits outside the
/// back/forward navigation of the main sequence. Admin profiles are created
/// directly at `Completed` and never walk the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    AccountSetup,
    Welcome,
    ProfileSetup,
    GoalSetting,
    ToolSetup,
    GroupAssignment,
    ReadinessCheck,
    Completed,
}

impl OnboardingStep {
    /// All steps in order.
    pub const ALL: [OnboardingStep; 8] = [
        Self::AccountSetup,
        Self::Welcome,
        Self::ProfileSetup,
        Self::GoalSetting,
        Self::ToolSetup,
        Self::GroupAssignment,
        Self::ReadinessCheck,
        Self::Completed,
    ];

    /// Get the next step in the linear progression, if any.
    pub fn next(self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            AccountSetup => Some(Welcome),
            Welcome => Some(ProfileSetup),
            ProfileSetup => Some(GoalSetting),
            GoalSetting => Some(ToolSetup),
            ToolSetup => Some(GroupAssignment),
            GroupAssignment => Some(ReadinessCheck),
            ReadinessCheck => Some(Completed),
            Completed => None,
        }
    }

    /// Get the previous navigable step, if any.
    ///
    /// `Welcome` is the first navigable step: `AccountSetup` is not reachable
    /// by going back.
    pub fn previous(self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            AccountSetup | Welcome => None,
            ProfileSetup => Some(Welcome),
            GoalSetting => Some(ProfileSetup),
            ToolSetup => Some(GoalSetting),
            GroupAssignment => Some(ToolSetup),
            ReadinessCheck => Some(GroupAssignment),
            Completed => Some(ReadinessCheck),
        }
    }

    /// The step immediately following this one; a no-op at `Completed`.
    pub fn advance(self) -> OnboardingStep {
        self.next().unwrap_or(self)
    }

    /// The step immediately preceding this one; a no-op at `Welcome` and
    /// at the `AccountSetup` pre-step.
    pub fn retreat(self) -> OnboardingStep {
        self.previous().unwrap_or(self)
    }

    /// Whether this step is terminal (onboarding is done).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Parse a step string, if recognized.
    pub fn try_parse(s: &str) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match s {
            "account_setup" => Some(AccountSetup),
            "welcome" => Some(Welcome),
            "profile_setup" => Some(ProfileSetup),
            "goal_setting" => Some(GoalSetting),
            "tool_setup" => Some(ToolSetup),
            "group_assignment" => Some(GroupAssignment),
            "readiness_check" => Some(ReadinessCheck),
            "completed" => Some(Completed),
            _ => None,
        }
    }

    /// Total parse that fails closed: an unrecognized step string resolves to
    /// the earliest unresolved step rather than granting progress.
    pub fn parse(s: &str) -> OnboardingStep {
        Self::try_parse(s).unwrap_or(Self::AccountSetup)
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::AccountSetup
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AccountSetup => "account_setup",
            Self::Welcome => "welcome",
            Self::ProfileSetup => "profile_setup",
            Self::GoalSetting => "goal_setting",
            Self::ToolSetup => "tool_setup",
            Self::GroupAssignment => "group_assignment",
            Self::ReadinessCheck => "readiness_check",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}
