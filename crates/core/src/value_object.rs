//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**; they are defined entirely by their attribute
//! values. [`crate::Amount`] is the canonical example here: two amounts of `100.00`
//! are interchangeable.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// produce a new one (`Amount::checked_add` returns a fresh amount rather than
/// mutating in place).
///
/// ```ignore
/// let a = Amount::from_units(100);
/// let b = "100.00".parse::<Amount>()?;
/// assert_eq!(a, b); // equal by value
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
