//! Persistence boundary for holder containers.
//!
//! # Responsibility
//! - Define the storage contract holders flush through.
//! - Provide SQLite and in-memory implementations.
//!
//! # Invariants
//! - Holders are the only writers; storage never reaches back into cards.
//! - Repository APIs return semantic errors (`NotFound`, `ShapeMismatch`)
//!   in addition to DB transport errors.

pub mod card_repo;
pub mod memory_repo;
