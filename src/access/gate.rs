//! Route gating — which route families each effective role may reach, and
//! where a disallowed request lands instead.

use serde::{Deserialize, Serialize};

use crate::access::resolver::Surface;
use crate::profile::Role;

/// The top-level route families of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteFamily {
    Dashboard,
    Groups,
    Users,
    Analytics,
    Surveys,
    MentorKit,
    Feedback,
    Communication,
    GroupChat,
    Resources,
    Goals,
    Tasks,
    Meetings,
    Group,
    Progress,
    Settings,
}

impl RouteFamily {
    /// All route families.
    pub const ALL: [RouteFamily; 16] = [
        Self::Dashboard,
        Self::Groups,
        Self::Users,
        Self::Analytics,
        Self::Surveys,
        Self::MentorKit,
        Self::Feedback,
        Self::Communication,
        Self::GroupChat,
        Self::Resources,
        Self::Goals,
        Self::Tasks,
        Self::Meetings,
        Self::Group,
        Self::Progress,
        Self::Settings,
    ];

    /// Whether the given effective role may reach this family.
    pub fn is_allowed(self, role: Role) -> bool {
        use RouteFamily::*;
        match self {
            // Admin-only management surfaces.
            Groups | Users | Analytics => role == Role::Admin,
            // Mentor tooling is mentor-only — admins see it via preview.
            MentorKit | Feedback => role == Role::Mentor,
            // Everything else is shared across roles.
            Dashboard | Surveys | Communication | GroupChat | Resources | Goals | Tasks
            | Meetings | Group | Progress | Settings => true,
        }
    }

    /// Parse a route-family path segment, if recognized.
    pub fn try_parse(s: &str) -> Option<RouteFamily> {
        use RouteFamily::*;
        match s {
            "dashboard" => Some(Dashboard),
            "groups" => Some(Groups),
            "users" => Some(Users),
            "analytics" => Some(Analytics),
            "surveys" => Some(Surveys),
            "mentor-kit" => Some(MentorKit),
            "feedback" => Some(Feedback),
            "communication" => Some(Communication),
            "group-chat" => Some(GroupChat),
            "resources" => Some(Resources),
            "goals" => Some(Goals),
            "tasks" => Some(Tasks),
            "meetings" => Some(Meetings),
            "group" => Some(Group),
            "progress" => Some(Progress),
            "settings" => Some(Settings),
            _ => None,
        }
    }
}

impl std::fmt::Display for RouteFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Dashboard => "dashboard",
            Self::Groups => "groups",
            Self::Users => "users",
            Self::Analytics => "analytics",
            Self::Surveys => "surveys",
            Self::MentorKit => "mentor-kit",
            Self::Feedback => "feedback",
            Self::Communication => "communication",
            Self::GroupChat => "group-chat",
            Self::Resources => "resources",
            Self::Goals => "goals",
            Self::Tasks => "tasks",
            Self::Meetings => "meetings",
            Self::Group => "group",
            Self::Progress => "progress",
            Self::Settings => "settings",
        };
        write!(f, "{s}")
    }
}

/// The route families reachable by an effective role.
pub fn allowed_routes(role: Role) -> Vec<RouteFamily> {
    RouteFamily::ALL
        .into_iter()
        .filter(|family| family.is_allowed(role))
        .collect()
}

/// Decision for a requested route under a resolved surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum Gate {
    /// The route is reachable.
    Allow,
    /// The request lands on this surface instead. Reaching for the main app
    /// while gated is a redirect back to the gating surface, not an error.
    Redirect { to: Surface },
}

/// Gate a requested route family against the resolved surface.
pub fn gate(surface: Surface, requested: RouteFamily) -> Gate {
    match surface {
        Surface::Loading | Surface::Unauthenticated | Surface::AccountSetup
        | Surface::Onboarding { .. } => Gate::Redirect { to: surface },
        Surface::MainApp { role } => {
            if requested.is_allowed(role) {
                Gate::Allow
            } else {
                // Disallowed families land back on the dashboard.
                Gate::Redirect { to: surface }
            }
        }
    }
}
