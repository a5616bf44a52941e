/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Whether a command may write. Dry runs perform every read and report the
/// writes they would have made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    DryRun,
    Live,
}

impl RunMode {
    pub fn from_flag(dry_run: bool) -> Self {
        if dry_run {
            RunMode::DryRun
        } else {
            RunMode::Live
        }
    }

    pub fn is_dry_run(self) -> bool {
        matches!(self, RunMode::DryRun)
    }
}

/// Tenant segments that campaigns are sent to. Each audience shares its name
/// with the campaign folder its contacts are written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Audience {
    /// Active, opted-in subscribers
    NewDashboard,
    /// Lapsed stores whose trial or subscription has ended
    ExpiredStore,
    /// Expired trials now running on the free tier
    FreeTierLaunch,
}

impl Audience {
    pub const ALL: [Audience; 3] = [
        Audience::NewDashboard,
        Audience::ExpiredStore,
        Audience::FreeTierLaunch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Audience::NewDashboard => "new-dashboard",
            Audience::ExpiredStore => "expired-store",
            Audience::FreeTierLaunch => "free-tier-launch",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
