use shared::types::{AccessClaims, AdminProfile, AdminRecord, AdminRole, WILDCARD_PERMISSION};

/// Caller identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub permissions: Vec<String>,
}

/// Name given to identities rebuilt from token claims alone.
pub const DEGRADED_DISPLAY_NAME: &str = "Admin (offline)";

impl Identity {
    pub fn from_record(record: &AdminRecord) -> Self {
        Self {
            id: record.id.clone(),
            email: record.email.clone(),
            name: record.name.clone(),
            role: record.role,
            permissions: record.permissions.clone(),
        }
    }

    /// Rebuild an identity from an access token when the store is down.
    /// The display name is not part of the claims.
    pub fn from_claims(claims: &AccessClaims) -> Self {
        Self {
            id: claims.sub.clone(),
            email: claims.email.clone(),
            name: DEGRADED_DISPLAY_NAME.to_string(),
            role: claims.role,
            permissions: claims.permissions.clone(),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == WILDCARD_PERMISSION || p == permission)
    }

    /// Profile shape for identities that have no stored record behind them.
    pub fn synthetic_profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            permissions: self.permissions.clone(),
            is_active: true,
            login_count: 0,
            last_login_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Outcome of authenticating a request.
///
/// `Degraded` means the identity store was unreachable and the identity was
/// rebuilt from signed token claims without checking that the account still
/// exists or is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Verified(Identity),
    Degraded(Identity),
}

impl Authentication {
    pub fn identity(&self) -> &Identity {
        match self {
            Self::Verified(identity) | Self::Degraded(identity) => identity,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}
