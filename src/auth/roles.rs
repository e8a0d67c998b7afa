//! Account roles
//!
//! Roles are a closed set; route allow-lists are slices of `Role`, never
//! strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::NotewardenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Registered user - may write notes and comments and vote
    #[default]
    User,
    /// Administrator - manages courses and modules, sees flagged content
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = NotewardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(NotewardenError::ValidationFailed(format!(
                "Unknown role: {other}"
            ))),
        }
    }
}

/// Allow-list for admin-only routes
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Allow-list for routes open to any registered account
pub const MEMBERS: &[Role] = &[Role::User, Role::Admin];

/// Empty allow-list: any valid token passes
pub const ANY_ROLE: &[Role] = &[];
