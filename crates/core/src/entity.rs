//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Account records (administrators, citizens) are entities: they have identity
/// but no command/event lifecycle of their own.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
