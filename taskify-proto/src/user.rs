//! User identities, roles, and profiles.
//!
//! Profiles are owned by the identity provider; the task and notification
//! logic only ever reads them.

use serde::{Deserialize, Serialize};

/// Opaque user identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps an identity-provider uid.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the uid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no uid was supplied (e.g. an unassigned task).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role attribute attached to every profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Creates, assigns and deletes tasks.
    Admin,
    /// Works on assigned tasks.
    #[default]
    Member,
}

impl Role {
    /// Returns `true` for [`Role::Admin`].
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Member => write!(f, "member"),
        }
    }
}

/// Profile record as stored by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable identity.
    pub uid: UserId,
    /// Display name, denormalized into tasks and notification text.
    pub name: String,
    /// Address used for assignment emails.
    pub email: String,
    /// Role used for capability checks.
    #[serde(default)]
    pub role: Role,
}

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub uid: UserId,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            uid: UserId::new(uid),
            name: name.into(),
            role,
        }
    }
}

impl From<&UserProfile> for Actor {
    fn from(profile: &UserProfile) -> Self {
        Self {
            uid: profile.uid.clone(),
            name: profile.name.clone(),
            role: profile.role,
        }
    }
}
