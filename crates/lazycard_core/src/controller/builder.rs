//! Creation tokens and the mutation handle behind altercators.
//!
//! # Responsibility
//! - Keep partially built cards out of holders until `commit()`.
//! - Route entity field mutation through one guarded handle.
//!
//! # Invariants
//! - A `ReadyForInsert` card is unattached until committed.
//! - An `Altercation` can only be opened on an attached, live card.

use crate::holder::HolderLink;
use crate::model::card::{Card, Entity};
use crate::repo::card_repo::RepoResult;
use std::rc::Rc;

/// Holder a creator commits into.
pub struct InsertTarget<E: Entity> {
    link: Rc<dyn HolderLink<E>>,
}

impl<E: Entity> InsertTarget<E> {
    pub(crate) fn new(link: Rc<dyn HolderLink<E>>) -> Self {
        Self { link }
    }

    pub fn holder_name(&self) -> &str {
        self.link.name()
    }
}

impl<E: Entity> Clone for InsertTarget<E> {
    fn clone(&self) -> Self {
        Self {
            link: Rc::clone(&self.link),
        }
    }
}

/// Fully formed, not yet attached card plus the holder it will join.
pub struct ReadyForInsert<E: Entity> {
    target: InsertTarget<E>,
    card: Card<E>,
}

impl<E: Entity> ReadyForInsert<E> {
    pub fn new(target: InsertTarget<E>, entity: E) -> Self {
        Self {
            target,
            card: Card::new(entity),
        }
    }

    /// Returns the pending card. Identity operations on it still panic.
    pub fn card(&self) -> &Card<E> {
        &self.card
    }

    pub fn holder_name(&self) -> &str {
        self.target.holder_name()
    }

    /// Stores the card in the target holder and returns the attached handle.
    ///
    /// A set holder that already contains an equal card keeps its member and
    /// leaves the returned card unattached.
    pub fn commit(self) -> RepoResult<Card<E>> {
        self.target.link.store(&self.card)?;
        Ok(self.card)
    }
}

/// Guarded mutable access to one attached card.
///
/// Entity altercators wrap this and expose typed setters.
pub struct Altercation<'a, E: Entity> {
    card: &'a Card<E>,
}

impl<'a, E: Entity> Altercation<'a, E> {
    pub(crate) fn new(card: &'a Card<E>) -> Self {
        card.catch_illegal_call("alter");
        card.catch_deleted_call("alter");
        Self { card }
    }

    /// Mutates the entity in memory. Nothing is persisted.
    pub fn apply(&mut self, change: impl FnOnce(&mut E)) {
        change(&mut *self.card.entity_mut());
    }

    pub fn card(&self) -> &'a Card<E> {
        self.card
    }

    /// Persists the altered card.
    pub fn store(&self) -> RepoResult<()> {
        self.card.store()
    }
}
