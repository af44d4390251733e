//! Vaccine inventory accounting.
//!
//! This crate contains the business rules for the central stock pool, per-staff
//! assignments and wastage, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod assignment;
pub mod stock;
pub mod wastage;

pub use assignment::{Assignment, BatchSnapshot, StaffStats};
pub use stock::{
    ReturnStock, StockCommand, StockEntry, StockEvent, StockPool, StockPoolId, StockReturned,
    StockToppedUp, StockWithdrawn, TopUpStock, WithdrawStock,
};
pub use wastage::{format_percentage, round2, wastage_rate};
