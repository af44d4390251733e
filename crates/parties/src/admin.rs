use serde::{Deserialize, Serialize};

use evax_core::{AdminId, Entity, StaffId};

use crate::contact::ContactDetails;

/// Administrator account.
///
/// Administrators create staff accounts, top up the central stock pool and
/// assign vaccines to their staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    id: AdminId,
    #[serde(flatten)]
    contact: ContactDetails,
    password_digest: String,
    #[serde(default)]
    staff_ids: Vec<StaffId>,
    #[serde(skip)]
    version: u64,
}

impl Admin {
    pub fn register(id: AdminId, contact: ContactDetails, password_digest: String) -> Self {
        Self {
            id,
            contact,
            password_digest,
            staff_ids: Vec::new(),
            version: 0,
        }
    }

    pub fn contact(&self) -> &ContactDetails {
        &self.contact
    }

    pub fn password_digest(&self) -> &str {
        &self.password_digest
    }

    pub fn staff_ids(&self) -> &[StaffId] {
        &self.staff_ids
    }

    pub fn manages(&self, staff_id: &StaffId) -> bool {
        self.staff_ids.contains(staff_id)
    }

    /// Record a staff member created by this administrator (idempotent).
    pub fn add_staff(&mut self, staff_id: StaffId) {
        if !self.manages(&staff_id) {
            self.staff_ids.push(staff_id);
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Entity for Admin {
    type Id = AdminId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
