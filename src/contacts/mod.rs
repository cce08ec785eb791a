//! Trusted-contact directory.
//!
//! The directory exclusively owns the contact collection. Other components read
//! from it (the emergency manager snapshots the flagged subset at trigger time)
//! but never mutate it.

mod directory;
mod model;
mod validation;

pub use directory::{ContactDirectory, ContactEvent};
pub use model::{Contact, ContactId, Relationship};
pub use validation::{validate_contact, FieldError, ValidationError};
