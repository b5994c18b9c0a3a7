//! Domain layer types and invariants.

pub mod aggregates;
pub mod entities;
pub mod normalize;
pub mod types;
