//! Capability checks at the task lifecycle boundary.
//!
//! Every controller operation asks an [`Authorizer`] before touching the
//! store. [`AccessPolicy::Open`] allows everything, which matches a
//! deployment where only the client hides admin-only controls.
//! [`AccessPolicy::AdminWrites`] enforces the role rules server-side.

use taskify_proto::user::{Actor, Role};

/// Operations subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Create,
    Update,
    UpdateStatus,
    Delete,
}

impl std::fmt::Display for TaskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::UpdateStatus => write!(f, "update the status of"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Returned when an actor lacks the capability for an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{role} users may not {action} tasks")]
pub struct AuthError {
    /// Role of the rejected actor.
    pub role: Role,
    /// Attempted action.
    pub action: TaskAction,
}

/// Decides whether an actor may perform an action.
pub trait Authorizer: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns [`AuthError`] when the action is not allowed.
    fn authorize(&self, actor: &Actor, action: TaskAction) -> Result<(), AuthError>;
}

/// Built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessPolicy {
    /// No server-side checks.
    #[default]
    Open,
    /// Only admins may create or delete tasks; anyone may update.
    AdminWrites,
}

impl Authorizer for AccessPolicy {
    fn authorize(&self, actor: &Actor, action: TaskAction) -> Result<(), AuthError> {
        match (self, action) {
            (Self::Open, _) | (Self::AdminWrites, TaskAction::Update | TaskAction::UpdateStatus) => {
                Ok(())
            }
            (Self::AdminWrites, TaskAction::Create | TaskAction::Delete) => {
                if actor.role.is_admin() {
                    Ok(())
                } else {
                    tracing::warn!(uid = %actor.uid, %action, "authorization denied");
                    Err(AuthError {
                        role: actor.role,
                        action,
                    })
                }
            }
        }
    }
}
