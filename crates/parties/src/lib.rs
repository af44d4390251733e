//! Parties domain module: administrators, staff (vaccinators) and citizens.
//!
//! Pure domain logic (no IO, no HTTP, no storage). Password digests are opaque
//! strings produced by `evax-auth`; this crate never sees a plaintext secret.

pub mod admin;
pub mod citizen;
pub mod contact;
pub mod staff;

pub use admin::Admin;
pub use citizen::{Address, Citizen, CitizenProfile, Gender};
pub use contact::{ContactDetails, normalize_email, require_secret, require_text};
pub use staff::{
    AssignVaccine, DoseConsumed, DoseReturned, RecordAdministration, RemainingQuantityUpdated,
    ReturnDose, Staff, StaffCommand, StaffEvent, UpdateRemaining, VaccineAssigned,
};
