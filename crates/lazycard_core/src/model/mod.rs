//! Card domain model.
//!
//! # Responsibility
//! - Define the card handle shared by every holder shape.
//! - Define attribute tokens used to query cards.
//!
//! # Invariants
//! - Cards gain identity only when attached to a holder.
//! - Deletion is terminal; a deleted card is never re-attached.

pub mod attribute;
pub mod card;
