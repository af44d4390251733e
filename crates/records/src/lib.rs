//! Citizen vaccination records.
//!
//! A vaccine card is keyed by the citizen's birth id and holds an append-only
//! dose history per vaccine type.

pub mod card;

pub use card::{
    CardCommand, CardEvent, DoseRecord, DoseRecorded, NextDoseScheduled, RecordDose,
    ScheduleNextDose, VaccineCard, VaccineHistory,
};
