//! Identity provider interface and an in-memory profile directory.

use std::collections::HashMap;

use parking_lot::RwLock;
use taskify_proto::user::{Actor, UserId, UserProfile};

/// Source of user profiles.
///
/// Sign-up, sessions and credential checks live with the external identity
/// provider; the task logic only needs profile lookups.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Looks up one profile.
    fn profile(&self, uid: &UserId) -> Option<UserProfile>;

    /// Every known profile, sorted by display name.
    fn profiles(&self) -> Vec<UserProfile>;

    /// Resolves an authenticated uid to an [`Actor`].
    fn actor(&self, uid: &UserId) -> Option<Actor> {
        self.profile(uid).as_ref().map(Actor::from)
    }
}

/// Profiles held in process memory, seeded from configuration.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<UserId, UserProfile>>,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory holding `profiles`. Later duplicates win.
    #[must_use]
    pub fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let directory = Self::new();
        for profile in profiles {
            directory.upsert(profile);
        }
        directory
    }

    /// Inserts or replaces a profile, returning the previous one.
    pub fn upsert(&self, profile: UserProfile) -> Option<UserProfile> {
        self.users.write().insert(profile.uid.clone(), profile)
    }

    /// Number of known users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// `true` when no users are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl IdentityProvider for MemoryDirectory {
    fn profile(&self, uid: &UserId) -> Option<UserProfile> {
        self.users.read().get(uid).cloned()
    }

    fn profiles(&self) -> Vec<UserProfile> {
        let mut all: Vec<UserProfile> = self.users.read().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.uid.cmp(&b.uid)));
        all
    }
}
