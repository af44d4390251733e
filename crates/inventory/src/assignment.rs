//! Per-staff vaccine allocation and the derived statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use evax_core::{DomainError, DomainResult, VaccineName};

use crate::wastage::{format_percentage, wastage_rate};

/// Doses of one vaccine type allocated to one staff member.
///
/// # Invariants
/// - `0 <= remaining_quantity <= assigned_quantity`
/// - `wastage_rate == wastage_rate(assigned_quantity, remaining_quantity)` after
///   every administered dose or remaining-quantity correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub vaccine_name: VaccineName,
    pub assigned_quantity: i64,
    pub remaining_quantity: i64,
    pub previous_quantity: i64,
    pub wastage_rate: f64,
    pub assigned_date: DateTime<Utc>,
}

impl Assignment {
    /// A fresh batch: nothing used yet, wastage zero.
    pub fn new(
        vaccine_name: VaccineName,
        quantity: i64,
        previous_quantity: i64,
        assigned_date: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        Ok(Self {
            vaccine_name,
            assigned_quantity: quantity,
            remaining_quantity: quantity,
            previous_quantity,
            wastage_rate: 0.0,
            assigned_date,
        })
    }

    /// Doses no longer on hand.
    pub fn used(&self) -> i64 {
        self.assigned_quantity - self.remaining_quantity
    }

    pub fn current_wastage_rate(&self) -> f64 {
        wastage_rate(self.assigned_quantity, self.remaining_quantity)
    }

    /// Check a correction of the remaining quantity against the batch bounds.
    pub fn validate_remaining(&self, new_quantity: i64) -> DomainResult<()> {
        if new_quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if new_quantity > self.assigned_quantity {
            return Err(DomainError::validation(
                "remaining quantity cannot exceed assigned quantity",
            ));
        }
        Ok(())
    }

    /// Set the remaining quantity and refresh the running wastage rate.
    pub fn set_remaining(&mut self, remaining_quantity: i64) {
        self.remaining_quantity = remaining_quantity;
        self.wastage_rate = self.current_wastage_rate();
    }

    /// Freeze this batch for historical reporting at the moment it is replaced.
    pub fn close(&self, closed_at: DateTime<Utc>) -> BatchSnapshot {
        BatchSnapshot {
            vaccine_name: self.vaccine_name.clone(),
            assigned_quantity: self.assigned_quantity,
            remaining_quantity: self.remaining_quantity,
            wastage_rate: self.current_wastage_rate(),
            assigned_date: self.assigned_date,
            closed_at,
        }
    }

    /// Staff statistics for this batch.
    ///
    /// The base is `previous_quantity` when it is non-zero and
    /// `assigned_quantity` otherwise. This intentionally differs from the
    /// running `wastage_rate`, which is always based on `assigned_quantity`.
    pub fn stats(&self, vaccinated_users: u64) -> StaffStats {
        let total_assigned = if self.previous_quantity != 0 {
            self.previous_quantity
        } else {
            self.assigned_quantity
        };
        let wastage = if total_assigned != 0 {
            (total_assigned - self.remaining_quantity) as f64 / total_assigned as f64 * 100.0
        } else {
            0.0
        };

        StaffStats {
            vaccine_name: self.vaccine_name.clone(),
            total_assigned,
            remaining: self.remaining_quantity,
            vaccinated_users,
            wastage_percentage: format_percentage(wastage),
        }
    }
}

/// Point-in-time record of a batch taken when a new assignment replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub vaccine_name: VaccineName,
    pub assigned_quantity: i64,
    pub remaining_quantity: i64,
    pub wastage_rate: f64,
    pub assigned_date: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

/// Staff vaccination statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffStats {
    pub vaccine_name: VaccineName,
    pub total_assigned: i64,
    pub remaining: i64,
    pub vaccinated_users: u64,
    pub wastage_percentage: String,
}
