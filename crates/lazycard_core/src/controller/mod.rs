//! Capability contracts for cards and holders.
//!
//! # Responsibility
//! - Split the card/holder operation surface into small opt-in traits.
//! - Keep keyed reads (`ReadKeyValue`) apart from plain entry reads at the
//!   type level, so only map holders offer `fetch`.
//!
//! # Invariants
//! - Traits carry no state; holders and cards implement them.
//! - Writes never bypass the holder that owns the card.

mod builder;

pub use builder::{Altercation, InsertTarget, ReadyForInsert};

use crate::model::attribute::Attribute;
use crate::model::card::{Card, Entity, KeyedEntity};
use crate::repo::card_repo::RepoResult;

/// Lazy iterator returned by `filter`, evaluated over a member snapshot.
pub type Filtered<E, P> = std::iter::Filter<std::vec::IntoIter<Card<E>>, P>;

/// Two-phase builder for one entity type.
pub trait Creator<E: Entity>: Sized {
    /// Assembles the entity into an unattached card bound to the target
    /// holder.
    fn prepare(self) -> ReadyForInsert<E>;
}

/// Entity that can be built through a `Creator`.
pub trait Creatable: Entity {
    type Creator: Creator<Self>;

    fn creator(target: InsertTarget<Self>) -> Self::Creator;
}

/// Holder capability: hand out creators bound to itself.
pub trait Create<E: Creatable> {
    fn create(&self) -> E::Creator;
}

/// Holder capability: attribute search and predicate filtering.
pub trait ReadEntry<E: Entity> {
    /// Returns the first card matching every attribute. No attributes
    /// match nothing.
    fn search_for(&self, attributes: &[Attribute]) -> RepoResult<Option<Card<E>>>;

    fn filter<P>(&self, predicate: P) -> RepoResult<Filtered<E, P>>
    where
        P: FnMut(&Card<E>) -> bool;
}

/// Holder capability: direct keyed lookup.
pub trait ReadKeyValue<E: KeyedEntity>: ReadEntry<E> {
    fn fetch(&self, key: &E::Key) -> RepoResult<Option<Card<E>>>;
}

/// Entity capability: controlled field mutation.
///
/// Implementors define an altercator type whose setters reach the entity's
/// private fields through `Altercation::apply`.
pub trait Alter: Entity {
    type Altercator<'a>
    where
        Self: 'a;

    fn altercator(handle: Altercation<'_, Self>) -> Self::Altercator<'_>;
}

/// Holder capability: add a card and flush the container.
pub trait Storeable<E: Entity> {
    fn store(&self, card: &Card<E>) -> RepoResult<()>;
}

/// Holder capability: remove a card and flush the container.
pub trait Deletable<E: Entity> {
    /// Returns `Ok(false)` when the card was not a member.
    fn delete(&self, card: &Card<E>) -> RepoResult<bool>;
}

/// Card capability: self-deletion through the owning holder.
pub trait Delete {
    fn delete(&self) -> RepoResult<()>;
    fn deleted(&self) -> bool;
}
