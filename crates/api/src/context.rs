use meshmart_auth::Principal;
use meshmart_core::UserId;

/// Authenticated principal for a request.
///
/// Inserted by the auth middleware and immutable afterwards; handlers thread
/// the inner [`Principal`] into core operations explicitly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> Principal {
        self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }
}
