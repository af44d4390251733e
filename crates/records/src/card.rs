use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use evax_core::{Aggregate, AggregateRoot, BirthId, DomainError, Event, StaffId, VaccineName};

/// One administered or scheduled vaccination event.
///
/// Repeats the name of the history it sits in, so a dose read on its own is
/// self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseRecord {
    pub vaccine_name: VaccineName,
    pub date_taken: Option<NaiveDate>,
    pub place: Option<String>,
    pub next_dose_date: Option<NaiveDate>,
    /// Staff member who administered the dose; absent for self-scheduled doses.
    pub administered_by: Option<StaffId>,
}

/// Dose history for one vaccine type, in recording order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineHistory {
    pub vaccine_name: VaccineName,
    pub doses: Vec<DoseRecord>,
}

/// Aggregate root: VaccineCard.
///
/// # Invariants
/// - one history per vaccine name, in first-seen order
/// - dose records are append-only (never edited or removed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineCard {
    birth_id: BirthId,
    vaccines: Vec<VaccineHistory>,
    #[serde(skip)]
    version: u64,
}

impl VaccineCard {
    /// Create an empty, never-persisted card.
    pub fn empty(birth_id: BirthId) -> Self {
        Self {
            birth_id,
            vaccines: Vec::new(),
            version: 0,
        }
    }

    pub fn birth_id(&self) -> &BirthId {
        &self.birth_id
    }

    pub fn vaccines(&self) -> &[VaccineHistory] {
        &self.vaccines
    }

    pub fn history(&self, vaccine_name: &VaccineName) -> Option<&VaccineHistory> {
        self.vaccines.iter().find(|v| &v.vaccine_name == vaccine_name)
    }

    pub fn doses_of(&self, vaccine_name: &VaccineName) -> &[DoseRecord] {
        self.history(vaccine_name).map(|h| h.doses.as_slice()).unwrap_or(&[])
    }

    pub fn dose_count(&self) -> usize {
        self.vaccines.iter().map(|v| v.doses.len()).sum()
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn append(&mut self, vaccine_name: &VaccineName, dose: &DoseRecord) {
        match self.vaccines.iter_mut().find(|v| &v.vaccine_name == vaccine_name) {
            Some(history) => history.doses.push(dose.clone()),
            None => self.vaccines.push(VaccineHistory {
                vaccine_name: vaccine_name.clone(),
                doses: vec![dose.clone()],
            }),
        }
    }

    fn ensure_birth_id(&self, birth_id: &BirthId) -> Result<(), DomainError> {
        if &self.birth_id != birth_id {
            return Err(DomainError::invariant("birth id mismatch"));
        }
        Ok(())
    }
}

impl AggregateRoot for VaccineCard {
    type Id = BirthId;

    fn id(&self) -> &Self::Id {
        &self.birth_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordDose (administered by staff, or a self-scheduled first dose).
///
/// The vaccine is `dose.vaccine_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDose {
    pub birth_id: BirthId,
    pub dose: DoseRecord,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ScheduleNextDose (follow-up for a vaccine already on the card).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleNextDose {
    pub birth_id: BirthId,
    pub vaccine_name: VaccineName,
    pub next_dose_date: NaiveDate,
    pub place: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardCommand {
    RecordDose(RecordDose),
    ScheduleNextDose(ScheduleNextDose),
}

/// Event: DoseRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseRecorded {
    pub birth_id: BirthId,
    pub vaccine_name: VaccineName,
    pub dose: DoseRecord,
    pub occurred_at: DateTime<Utc>,
}

/// Event: NextDoseScheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextDoseScheduled {
    pub birth_id: BirthId,
    pub vaccine_name: VaccineName,
    pub dose: DoseRecord,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardEvent {
    DoseRecorded(DoseRecorded),
    NextDoseScheduled(NextDoseScheduled),
}

impl Event for CardEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CardEvent::DoseRecorded(_) => "records.card.dose_recorded",
            CardEvent::NextDoseScheduled(_) => "records.card.next_dose_scheduled",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CardEvent::DoseRecorded(e) => e.occurred_at,
            CardEvent::NextDoseScheduled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for VaccineCard {
    type Command = CardCommand;
    type Event = CardEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CardEvent::DoseRecorded(e) => self.append(&e.vaccine_name, &e.dose),
            CardEvent::NextDoseScheduled(e) => self.append(&e.vaccine_name, &e.dose),
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CardCommand::RecordDose(cmd) => self.handle_record(cmd),
            CardCommand::ScheduleNextDose(cmd) => self.handle_schedule_next(cmd),
        }
    }
}

impl VaccineCard {
    fn handle_record(&self, cmd: &RecordDose) -> Result<Vec<CardEvent>, DomainError> {
        self.ensure_birth_id(&cmd.birth_id)?;
        if cmd.dose.date_taken.is_none() {
            return Err(DomainError::validation("date_taken is required"));
        }
        let place = cmd.dose.place.as_deref().map(str::trim).unwrap_or_default();
        if place.is_empty() {
            return Err(DomainError::validation("place is required"));
        }

        let mut dose = cmd.dose.clone();
        dose.place = Some(place.to_string());

        Ok(vec![CardEvent::DoseRecorded(DoseRecorded {
            birth_id: cmd.birth_id.clone(),
            vaccine_name: dose.vaccine_name.clone(),
            dose,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_schedule_next(&self, cmd: &ScheduleNextDose) -> Result<Vec<CardEvent>, DomainError> {
        self.ensure_birth_id(&cmd.birth_id)?;
        if self.history(&cmd.vaccine_name).is_none() {
            return Err(DomainError::not_found("vaccine not found in record"));
        }
        let place = cmd.place.trim();
        if place.is_empty() {
            return Err(DomainError::validation("place is required"));
        }

        Ok(vec![CardEvent::NextDoseScheduled(NextDoseScheduled {
            birth_id: cmd.birth_id.clone(),
            vaccine_name: cmd.vaccine_name.clone(),
            dose: DoseRecord {
                vaccine_name: cmd.vaccine_name.clone(),
                date_taken: None,
                place: Some(place.to_string()),
                next_dose_date: Some(cmd.next_dose_date),
                administered_by: None,
            },
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn birth_id() -> BirthId {
        BirthId::parse("2024000009").unwrap()
    }

    fn bcg() -> VaccineName {
        VaccineName::parse("BCG").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(name: VaccineName, staff: Option<StaffId>) -> CardCommand {
        CardCommand::RecordDose(RecordDose {
            birth_id: birth_id(),
            dose: DoseRecord {
                vaccine_name: name,
                date_taken: Some(date(2025, 3, 1)),
                place: Some(" Dhaka Medical ".to_string()),
                next_dose_date: Some(date(2025, 4, 1)),
                administered_by: staff,
            },
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn first_dose_creates_vaccine_history() {
        let mut card = VaccineCard::empty(birth_id());
        let staff = StaffId::new();
        card.execute(&record(bcg(), Some(staff))).unwrap();

        let doses = card.doses_of(&bcg());
        assert_eq!(doses.len(), 1);
        assert_eq!(doses[0].administered_by, Some(staff));
        assert_eq!(doses[0].place.as_deref(), Some("Dhaka Medical"));
    }

    #[test]
    fn later_doses_append_to_the_same_history() {
        let mut card = VaccineCard::empty(birth_id());
        card.execute(&record(bcg(), None)).unwrap();
        card.execute(&record(bcg(), None)).unwrap();
        card.execute(&record(VaccineName::parse("OPV-0").unwrap(), None)).unwrap();

        assert_eq!(card.vaccines().len(), 2);
        assert_eq!(card.doses_of(&bcg()).len(), 2);
        assert_eq!(card.dose_count(), 3);
        assert_eq!(card.vaccines()[0].vaccine_name, bcg());
        let opv = &card.vaccines()[1];
        assert!(opv.doses.iter().all(|d| d.vaccine_name == opv.vaccine_name));
    }

    #[test]
    fn record_requires_date_and_place() {
        let card = VaccineCard::empty(birth_id());
        let cmd = CardCommand::RecordDose(RecordDose {
            birth_id: birth_id(),
            dose: DoseRecord {
                vaccine_name: bcg(),
                date_taken: Some(date(2025, 3, 1)),
                place: Some("   ".to_string()),
                next_dose_date: None,
                administered_by: None,
            },
            occurred_at: Utc::now(),
        });
        assert!(matches!(card.handle(&cmd), Err(DomainError::Validation(_))));

        let cmd = CardCommand::RecordDose(RecordDose {
            birth_id: birth_id(),
            dose: DoseRecord {
                vaccine_name: bcg(),
                date_taken: None,
                place: Some("Clinic".to_string()),
                next_dose_date: None,
                administered_by: None,
            },
            occurred_at: Utc::now(),
        });
        assert!(matches!(card.handle(&cmd), Err(DomainError::Validation(_))));
    }

    #[test]
    fn next_dose_requires_existing_history() {
        let card = VaccineCard::empty(birth_id());
        let cmd = CardCommand::ScheduleNextDose(ScheduleNextDose {
            birth_id: birth_id(),
            vaccine_name: bcg(),
            next_dose_date: date(2025, 5, 1),
            place: "Clinic".to_string(),
            occurred_at: Utc::now(),
        });
        assert!(matches!(card.handle(&cmd), Err(DomainError::NotFound(_))));
    }

    #[test]
    fn next_dose_records_only_date_and_place() {
        let mut card = VaccineCard::empty(birth_id());
        card.execute(&record(bcg(), None)).unwrap();
        card.execute(&CardCommand::ScheduleNextDose(ScheduleNextDose {
            birth_id: birth_id(),
            vaccine_name: bcg(),
            next_dose_date: date(2025, 5, 1),
            place: "Clinic".to_string(),
            occurred_at: Utc::now(),
        }))
        .unwrap();

        let last = card.doses_of(&bcg()).last().unwrap();
        assert_eq!(last.vaccine_name, bcg());
        assert_eq!(last.date_taken, None);
        assert_eq!(last.administered_by, None);
        assert_eq!(last.next_dose_date, Some(date(2025, 5, 1)));
        assert_eq!(last.place.as_deref(), Some("Clinic"));
    }

    #[test]
    fn commands_for_another_card_are_rejected() {
        let card = VaccineCard::empty(BirthId::parse("2024000001").unwrap());
        assert!(matches!(
            card.handle(&record(bcg(), None)),
            Err(DomainError::InvariantViolation(_))
        ));
    }
}
