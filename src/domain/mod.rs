//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod identifiers;
pub mod products;
pub mod region;
pub mod slug;
pub mod types;
