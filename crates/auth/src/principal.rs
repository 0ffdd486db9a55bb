use serde::{Deserialize, Serialize};

use meshmart_core::UserId;

use crate::Role;

/// A fully resolved authenticated identity.
///
/// Core operations that make authorization decisions take this as an
/// explicit argument; nothing reads ambient request state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this principal may read a resource owned by `owner`.
    pub fn can_read_resource_of(&self, owner: UserId) -> bool {
        self.user_id == owner || self.is_admin()
    }
}
