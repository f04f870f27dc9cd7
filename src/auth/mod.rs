//! Authentication and authorization module
//!
//! Provides JWT-based authentication and role-based access control.

mod jwt;
mod middleware;
mod password;

pub use jwt::{create_tokens, decode_token, refresh_tokens, Claims, TokenPair};
pub use middleware::{auth_middleware, bearer_claims};
pub use password::{hash_password, verify_password};

use serde::{Deserialize, Serialize};

/// User roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Registered citizen: can vote, submit grievances, post on the forum
    Citizen,
    /// Government official: can additionally triage grievances
    Official,
    /// Administrator: full access including proposal lifecycle and user roles
    Admin,
}

impl Role {
    /// Grievance triage (status updates)
    pub fn can_triage(&self) -> bool {
        matches!(self, Role::Official | Role::Admin)
    }

    /// Proposal lifecycle, user management, transparency records
    pub fn can_administer(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Citizen
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Citizen => write!(f, "citizen"),
            Role::Official => write!(f, "official"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_capabilities() {
        assert!(!Role::Citizen.can_triage());
        assert!(Role::Official.can_triage());
        assert!(!Role::Official.can_administer());
        assert!(Role::Admin.can_triage());
        assert!(Role::Admin.can_administer());
    }
}
