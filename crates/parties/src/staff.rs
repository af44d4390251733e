use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use evax_core::{Aggregate, AggregateRoot, DomainError, Event, StaffId, VaccineName};
use evax_inventory::{Assignment, BatchSnapshot, StaffStats};

use crate::contact::ContactDetails;

/// Aggregate root: Staff (a vaccinator).
///
/// Owns the current vaccine [`Assignment`] and the count of doses
/// administered from it.
///
/// # Invariants
/// - `0 <= remaining_quantity <= assigned_quantity` for the current assignment
/// - `vaccinated_users_count` restarts at zero with every new assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    id: StaffId,
    #[serde(flatten)]
    contact: ContactDetails,
    address: Option<String>,
    password_digest: String,
    assignment: Option<Assignment>,
    last_batch: Option<BatchSnapshot>,
    #[serde(default)]
    vaccinated_users_count: u64,
    #[serde(skip)]
    version: u64,
}

impl Staff {
    pub fn register(
        id: StaffId,
        contact: ContactDetails,
        address: Option<String>,
        password_digest: String,
    ) -> Self {
        Self {
            id,
            contact,
            address: address.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
            password_digest,
            assignment: None,
            last_batch: None,
            vaccinated_users_count: 0,
            version: 0,
        }
    }

    pub fn contact(&self) -> &ContactDetails {
        &self.contact
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn password_digest(&self) -> &str {
        &self.password_digest
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }

    /// The batch replaced by the most recent reassignment, if any.
    pub fn last_batch(&self) -> Option<&BatchSnapshot> {
        self.last_batch.as_ref()
    }

    pub fn vaccinated_users_count(&self) -> u64 {
        self.vaccinated_users_count
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Vaccination statistics for the current assignment.
    pub fn stats(&self) -> Result<StaffStats, DomainError> {
        self.assignment
            .as_ref()
            .map(|a| a.stats(self.vaccinated_users_count))
            .ok_or_else(|| DomainError::conflict("no vaccine assignment found for this staff"))
    }

    fn ensure_staff_id(&self, staff_id: &StaffId) -> Result<(), DomainError> {
        if &self.id != staff_id {
            return Err(DomainError::invariant("staff id mismatch"));
        }
        Ok(())
    }

    /// The current assignment, if it is for `vaccine_name`.
    fn assignment_for(&self, vaccine_name: &VaccineName) -> Result<&Assignment, DomainError> {
        match &self.assignment {
            Some(a) if &a.vaccine_name == vaccine_name => Ok(a),
            _ => Err(DomainError::conflict(
                "staff is not assigned to this vaccine type",
            )),
        }
    }
}

impl AggregateRoot for Staff {
    type Id = StaffId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AssignVaccine (replaces the current assignment wholesale).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignVaccine {
    pub staff_id: StaffId,
    pub vaccine_name: VaccineName,
    pub quantity: i64,
    pub assigned_at: DateTime<Utc>,
}

/// Command: RecordAdministration (one dose used from the assignment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAdministration {
    pub staff_id: StaffId,
    pub vaccine_name: VaccineName,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnDose (undo of `RecordAdministration` when the card write fails).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnDose {
    pub staff_id: StaffId,
    pub vaccine_name: VaccineName,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateRemaining (manual stock-count correction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRemaining {
    pub staff_id: StaffId,
    pub new_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaffCommand {
    AssignVaccine(AssignVaccine),
    RecordAdministration(RecordAdministration),
    ReturnDose(ReturnDose),
    UpdateRemaining(UpdateRemaining),
}

/// Event: VaccineAssigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccineAssigned {
    pub staff_id: StaffId,
    pub assignment: Assignment,
    pub closed_batch: Option<BatchSnapshot>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DoseConsumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseConsumed {
    pub staff_id: StaffId,
    pub vaccine_name: VaccineName,
    pub remaining_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DoseReturned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseReturned {
    pub staff_id: StaffId,
    pub vaccine_name: VaccineName,
    pub remaining_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RemainingQuantityUpdated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemainingQuantityUpdated {
    pub staff_id: StaffId,
    pub remaining_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StaffEvent {
    VaccineAssigned(VaccineAssigned),
    DoseConsumed(DoseConsumed),
    DoseReturned(DoseReturned),
    RemainingQuantityUpdated(RemainingQuantityUpdated),
}

impl Event for StaffEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StaffEvent::VaccineAssigned(_) => "parties.staff.vaccine_assigned",
            StaffEvent::DoseConsumed(_) => "parties.staff.dose_consumed",
            StaffEvent::DoseReturned(_) => "parties.staff.dose_returned",
            StaffEvent::RemainingQuantityUpdated(_) => "parties.staff.remaining_quantity_updated",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StaffEvent::VaccineAssigned(e) => e.occurred_at,
            StaffEvent::DoseConsumed(e) => e.occurred_at,
            StaffEvent::DoseReturned(e) => e.occurred_at,
            StaffEvent::RemainingQuantityUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Staff {
    type Command = StaffCommand;
    type Event = StaffEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StaffEvent::VaccineAssigned(e) => {
                if e.closed_batch.is_some() {
                    self.last_batch = e.closed_batch.clone();
                }
                self.assignment = Some(e.assignment.clone());
                self.vaccinated_users_count = 0;
            }
            StaffEvent::DoseConsumed(e) => {
                if let Some(a) = self.assignment.as_mut() {
                    a.set_remaining(e.remaining_quantity);
                }
                self.vaccinated_users_count += 1;
            }
            StaffEvent::DoseReturned(e) => {
                if let Some(a) = self.assignment.as_mut() {
                    a.set_remaining(e.remaining_quantity);
                }
                self.vaccinated_users_count = self.vaccinated_users_count.saturating_sub(1);
            }
            StaffEvent::RemainingQuantityUpdated(e) => {
                if let Some(a) = self.assignment.as_mut() {
                    a.set_remaining(e.remaining_quantity);
                }
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StaffCommand::AssignVaccine(cmd) => self.handle_assign(cmd),
            StaffCommand::RecordAdministration(cmd) => self.handle_record(cmd),
            StaffCommand::ReturnDose(cmd) => self.handle_return(cmd),
            StaffCommand::UpdateRemaining(cmd) => self.handle_update_remaining(cmd),
        }
    }
}

impl Staff {
    fn handle_assign(&self, cmd: &AssignVaccine) -> Result<Vec<StaffEvent>, DomainError> {
        self.ensure_staff_id(&cmd.staff_id)?;

        let current = self.assignment.as_ref().filter(|a| a.assigned_quantity > 0);
        let closed_batch = current.map(|a| a.close(cmd.assigned_at));
        let previous_quantity = current.map_or(cmd.quantity, |a| a.assigned_quantity);

        let assignment = Assignment::new(
            cmd.vaccine_name.clone(),
            cmd.quantity,
            previous_quantity,
            cmd.assigned_at,
        )?;

        Ok(vec![StaffEvent::VaccineAssigned(VaccineAssigned {
            staff_id: cmd.staff_id,
            assignment,
            closed_batch,
            occurred_at: cmd.assigned_at,
        })])
    }

    fn handle_record(&self, cmd: &RecordAdministration) -> Result<Vec<StaffEvent>, DomainError> {
        self.ensure_staff_id(&cmd.staff_id)?;
        let assignment = self.assignment_for(&cmd.vaccine_name)?;
        if assignment.remaining_quantity <= 0 {
            return Err(DomainError::conflict("no assigned vaccines left"));
        }

        Ok(vec![StaffEvent::DoseConsumed(DoseConsumed {
            staff_id: cmd.staff_id,
            vaccine_name: cmd.vaccine_name.clone(),
            remaining_quantity: assignment.remaining_quantity - 1,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_return(&self, cmd: &ReturnDose) -> Result<Vec<StaffEvent>, DomainError> {
        self.ensure_staff_id(&cmd.staff_id)?;
        let assignment = self.assignment_for(&cmd.vaccine_name)?;
        if assignment.remaining_quantity >= assignment.assigned_quantity {
            return Err(DomainError::conflict("no administered dose to return"));
        }

        Ok(vec![StaffEvent::DoseReturned(DoseReturned {
            staff_id: cmd.staff_id,
            vaccine_name: cmd.vaccine_name.clone(),
            remaining_quantity: assignment.remaining_quantity + 1,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_remaining(
        &self,
        cmd: &UpdateRemaining,
    ) -> Result<Vec<StaffEvent>, DomainError> {
        self.ensure_staff_id(&cmd.staff_id)?;
        let assignment = self
            .assignment
            .as_ref()
            .ok_or_else(|| DomainError::conflict("no vaccine assignment found for this staff"))?;
        assignment.validate_remaining(cmd.new_quantity)?;

        Ok(vec![StaffEvent::RemainingQuantityUpdated(
            RemainingQuantityUpdated {
                staff_id: cmd.staff_id,
                remaining_quantity: cmd.new_quantity,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
