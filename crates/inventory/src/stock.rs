use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use evax_core::{Aggregate, AggregateRoot, DomainError, Event, VaccineName};

/// Stock pool identifier.
///
/// There is one central pool; administrators top it up and first-dose
/// scheduling draws from it. It is not tied to any administrator identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockPoolId(String);

impl StockPoolId {
    pub const CENTRAL: &'static str = "central";

    pub fn central() -> Self {
        Self(Self::CENTRAL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for StockPoolId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quantity on hand for one vaccine type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub vaccine_name: VaccineName,
    pub total_quantity: i64,
}

/// Aggregate root: StockPool.
///
/// # Invariants
/// - vaccine names are unique within the pool
/// - `total_quantity` never goes below zero
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPool {
    id: StockPoolId,
    entries: Vec<StockEntry>,
    #[serde(skip)]
    version: u64,
}

impl StockPool {
    /// Create an empty, never-persisted pool.
    pub fn empty(id: StockPoolId) -> Self {
        Self {
            id,
            entries: Vec::new(),
            version: 0,
        }
    }

    pub fn central() -> Self {
        Self::empty(StockPoolId::central())
    }

    pub fn entries(&self) -> &[StockEntry] {
        &self.entries
    }

    pub fn entry(&self, vaccine_name: &VaccineName) -> Option<&StockEntry> {
        self.entries.iter().find(|e| &e.vaccine_name == vaccine_name)
    }

    pub fn quantity_of(&self, vaccine_name: &VaccineName) -> Option<i64> {
        self.entry(vaccine_name).map(|e| e.total_quantity)
    }

    /// Set the persisted revision (called by the repository after load/save).
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn entry_mut(&mut self, vaccine_name: &VaccineName) -> Option<&mut StockEntry> {
        self.entries.iter_mut().find(|e| &e.vaccine_name == vaccine_name)
    }

    fn credit(&mut self, vaccine_name: &VaccineName, quantity: i64) {
        match self.entry_mut(vaccine_name) {
            Some(entry) => entry.total_quantity += quantity,
            None => self.entries.push(StockEntry {
                vaccine_name: vaccine_name.clone(),
                total_quantity: quantity,
            }),
        }
    }
}

impl AggregateRoot for StockPool {
    type Id = StockPoolId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: TopUpStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpStock {
    pub vaccine_name: VaccineName,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: WithdrawStock (first-dose scheduling draws one unit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawStock {
    pub vaccine_name: VaccineName,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnStock (compensates a withdrawal whose follow-up write failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnStock {
    pub vaccine_name: VaccineName,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    TopUp(TopUpStock),
    Withdraw(WithdrawStock),
    Return(ReturnStock),
}

/// Event: StockToppedUp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockToppedUp {
    pub vaccine_name: VaccineName,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockWithdrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockWithdrawn {
    pub vaccine_name: VaccineName,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReturned {
    pub vaccine_name: VaccineName,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    ToppedUp(StockToppedUp),
    Withdrawn(StockWithdrawn),
    Returned(StockReturned),
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::ToppedUp(_) => "inventory.stock.topped_up",
            StockEvent::Withdrawn(_) => "inventory.stock.withdrawn",
            StockEvent::Returned(_) => "inventory.stock.returned",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::ToppedUp(e) => e.occurred_at,
            StockEvent::Withdrawn(e) => e.occurred_at,
            StockEvent::Returned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockPool {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::ToppedUp(e) => self.credit(&e.vaccine_name, e.quantity),
            StockEvent::Returned(e) => self.credit(&e.vaccine_name, e.quantity),
            StockEvent::Withdrawn(e) => {
                if let Some(entry) = self.entry_mut(&e.vaccine_name) {
                    entry.total_quantity -= e.quantity;
                }
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::TopUp(cmd) => self.handle_top_up(cmd),
            StockCommand::Withdraw(cmd) => self.handle_withdraw(cmd),
            StockCommand::Return(cmd) => self.handle_return(cmd),
        }
    }
}

impl StockPool {
    fn handle_top_up(&self, cmd: &TopUpStock) -> Result<Vec<StockEvent>, DomainError> {
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let current = self.quantity_of(&cmd.vaccine_name).unwrap_or(0);
        if current.checked_add(cmd.quantity).is_none() {
            return Err(DomainError::validation("quantity is too large"));
        }
        Ok(vec![StockEvent::ToppedUp(StockToppedUp {
            vaccine_name: cmd.vaccine_name.clone(),
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &WithdrawStock) -> Result<Vec<StockEvent>, DomainError> {
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let entry = self
            .entry(&cmd.vaccine_name)
            .ok_or_else(|| DomainError::not_found("vaccine not available"))?;
        if entry.total_quantity <= 0 {
            return Err(DomainError::conflict("vaccine out of stock"));
        }
        if entry.total_quantity < cmd.quantity {
            return Err(DomainError::conflict(format!(
                "insufficient stock for {} (on hand: {}, requested: {})",
                cmd.vaccine_name, entry.total_quantity, cmd.quantity
            )));
        }
        Ok(vec![StockEvent::Withdrawn(StockWithdrawn {
            vaccine_name: cmd.vaccine_name.clone(),
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_return(&self, cmd: &ReturnStock) -> Result<Vec<StockEvent>, DomainError> {
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(vec![StockEvent::Returned(StockReturned {
            vaccine_name: cmd.vaccine_name.clone(),
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }
}
