use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Permission string that satisfies every permission check.
pub const WILDCARD_PERMISSION: &str = "*";

/// Coarse-grained admin tier.
///
/// Serialized in SCREAMING_SNAKE_CASE (`"SUPER_ADMIN"`, `"EDITOR"`, ...) both
/// on the wire and in the `admins.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminRole {
    SuperAdmin,
    Admin,
    Editor,
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown admin role: {0}")]
pub struct UnknownRole(pub String);

impl AdminRole {
    pub const ALL: [AdminRole; 4] = [
        AdminRole::SuperAdmin,
        AdminRole::Admin,
        AdminRole::Editor,
        AdminRole::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Admin => "ADMIN",
            Self::Editor => "EDITOR",
            Self::Viewer => "VIEWER",
        }
    }

    /// Permissions granted to a freshly created admin of this role when the
    /// creator does not supply an explicit list.
    pub fn default_permissions(&self) -> Vec<String> {
        let perms: &[&str] = match self {
            Self::SuperAdmin => &[WILDCARD_PERMISSION],
            Self::Admin => &[
                "content:read",
                "content:write",
                "content:publish",
                "admins:read",
                "settings:write",
            ],
            Self::Editor => &["content:read", "content:write"],
            Self::Viewer => &["content:read"],
        };
        perms.iter().map(|p| p.to_string()).collect()
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
