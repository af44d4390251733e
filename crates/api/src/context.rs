use uuid::Uuid;

use evax_auth::Role;
use evax_core::{AdminId, CitizenId, StaffId};

/// Principal context for a request (authenticated account + role).
///
/// Inserted by the auth middleware from verified token claims; handlers never
/// take the acting identity from request bodies.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    account_id: Uuid,
    role: Role,
}

impl PrincipalContext {
    pub fn new(account_id: Uuid, role: Role) -> Self {
        Self { account_id, role }
    }

    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn admin_id(&self) -> AdminId {
        AdminId::from_uuid(self.account_id)
    }

    pub fn staff_id(&self) -> StaffId {
        StaffId::from_uuid(self.account_id)
    }

    pub fn citizen_id(&self) -> CitizenId {
        CitizenId::from_uuid(self.account_id)
    }
}
