use atrium_core::{RoleId, UserId};

/// Actor context for a request (authenticated identity + role).
///
/// Inserted by the bearer middleware; must be present for all guarded routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    user_id: UserId,
    role_id: RoleId,
    document: String,
}

impl ActorContext {
    pub fn new(user_id: UserId, role_id: RoleId, document: String) -> Self {
        Self {
            user_id,
            role_id,
            document,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    pub fn document(&self) -> &str {
        &self.document
    }
}
