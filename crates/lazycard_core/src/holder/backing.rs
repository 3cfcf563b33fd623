//! Backing container shapes: set, list and map.
//!
//! # Invariants
//! - Member identity is the card id (`Card::same_card`), independent of
//!   entity equality.
//! - Set membership is governed by entity `Eq`/`Hash`; map membership by
//!   `KeyedEntity::key`; lists accept any distinct card.

use crate::holder::HolderShape;
use crate::model::card::{Card, Entity, KeyedEntity};
use crate::repo::card_repo::RepoResult;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Outcome of re-seating a member whose fields were altered.
#[derive(Debug)]
pub enum Reseat<E: Entity> {
    /// Still stored where it was; a single-record write is enough.
    Unchanged,
    /// Moved to a new slot; the whole container must be flushed.
    /// `displaced` is a different member that the move overwrote; the
    /// holder marks it deleted once the flush succeeds.
    Moved { displaced: Option<Card<E>> },
    /// Not a member of this container.
    Missing,
}

/// Container shape a holder stores its cards in.
pub trait Backing<E: Entity>: Default + 'static {
    const SHAPE: HolderShape;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in this container's iteration order.
    fn cards(&self) -> Box<dyn Iterator<Item = &Card<E>> + '_>;

    fn contains_card(&self, card: &Card<E>) -> bool {
        self.cards().any(|member| member.same_card(card))
    }

    /// Returns whether `insert` would add `card` as a new member.
    fn admits(&self, card: &Card<E>) -> bool;

    /// Adds `card`; returns a member it overwrote, if any.
    fn insert(&mut self, card: Card<E>) -> Option<Card<E>>;

    /// Removes the member matching `card`; returns it.
    fn remove(&mut self, card: &Card<E>) -> Option<Card<E>>;

    /// Re-files an altered member so lookups see its current fields.
    fn reseat(&mut self, card: &Card<E>) -> Reseat<E>;

    /// JSON key stored next to the card, for keyed shapes.
    fn record_key(card: &Card<E>) -> RepoResult<Option<String>>;
}

/// Unordered unique set of cards.
pub struct CardSet<E: Entity> {
    items: HashSet<Card<E>>,
}

impl<E: Entity> CardSet<E> {
    pub fn items(&self) -> &HashSet<Card<E>> {
        &self.items
    }

    /// Raw access. Changes are persisted only by `Holder::flush`.
    pub fn items_mut(&mut self) -> &mut HashSet<Card<E>> {
        &mut self.items
    }
}

impl<E: Entity> Default for CardSet<E> {
    fn default() -> Self {
        Self {
            items: HashSet::new(),
        }
    }
}

impl<E: Entity + Hash + Eq> Backing<E> for CardSet<E> {
    const SHAPE: HolderShape = HolderShape::Set;

    fn len(&self) -> usize {
        self.items.len()
    }

    fn cards(&self) -> Box<dyn Iterator<Item = &Card<E>> + '_> {
        Box::new(self.items.iter())
    }

    fn admits(&self, card: &Card<E>) -> bool {
        !self.items.contains(card)
    }

    fn insert(&mut self, card: Card<E>) -> Option<Card<E>> {
        self.items.insert(card);
        None
    }

    fn remove(&mut self, card: &Card<E>) -> Option<Card<E>> {
        if let Some(member) = self.items.take(card) {
            return Some(member);
        }
        // Hash may be stale when the member was altered in place.
        let member = self
            .items
            .iter()
            .find(|member| member.same_card(card))
            .cloned()?;
        self.items.retain(|other| !other.same_card(card));
        Some(member)
    }

    fn reseat(&mut self, card: &Card<E>) -> Reseat<E> {
        if let Some(member) = self.items.get(card) {
            if member.same_card(card) {
                if !member.same_handle(card) {
                    self.items.replace(card.clone());
                }
                return Reseat::Unchanged;
            }
        }

        let before = self.items.len();
        self.items.retain(|member| !member.same_card(card));
        if self.items.len() == before {
            return Reseat::Missing;
        }
        let displaced = self.items.replace(card.clone());
        Reseat::Moved { displaced }
    }

    fn record_key(_card: &Card<E>) -> RepoResult<Option<String>> {
        Ok(None)
    }
}

/// Ordered list of cards, insertion order preserved.
pub struct CardList<E: Entity> {
    items: Vec<Card<E>>,
}

impl<E: Entity> CardList<E> {
    pub fn items(&self) -> &[Card<E>] {
        &self.items
    }

    /// Raw access. Changes are persisted only by `Holder::flush`.
    pub fn items_mut(&mut self) -> &mut Vec<Card<E>> {
        &mut self.items
    }

    fn position_of(&self, card: &Card<E>) -> Option<usize> {
        self.items.iter().position(|member| member.same_card(card))
    }
}

impl<E: Entity> Default for CardList<E> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<E: Entity> Backing<E> for CardList<E> {
    const SHAPE: HolderShape = HolderShape::List;

    fn len(&self) -> usize {
        self.items.len()
    }

    fn cards(&self) -> Box<dyn Iterator<Item = &Card<E>> + '_> {
        Box::new(self.items.iter())
    }

    fn admits(&self, _card: &Card<E>) -> bool {
        true
    }

    fn insert(&mut self, card: Card<E>) -> Option<Card<E>> {
        self.items.push(card);
        None
    }

    fn remove(&mut self, card: &Card<E>) -> Option<Card<E>> {
        let index = self.position_of(card)?;
        Some(self.items.remove(index))
    }

    fn reseat(&mut self, card: &Card<E>) -> Reseat<E> {
        match self.position_of(card) {
            Some(index) => {
                if !self.items[index].same_handle(card) {
                    self.items[index] = card.clone();
                }
                Reseat::Unchanged
            }
            None => Reseat::Missing,
        }
    }

    fn record_key(_card: &Card<E>) -> RepoResult<Option<String>> {
        Ok(None)
    }
}

/// Cards keyed by `KeyedEntity::key`.
pub struct CardMap<E: KeyedEntity> {
    items: HashMap<E::Key, Card<E>>,
}

impl<E: KeyedEntity> CardMap<E> {
    pub fn items(&self) -> &HashMap<E::Key, Card<E>> {
        &self.items
    }

    /// Raw access. Changes are persisted only by `Holder::flush`.
    pub fn items_mut(&mut self) -> &mut HashMap<E::Key, Card<E>> {
        &mut self.items
    }

    pub fn get(&self, key: &E::Key) -> Option<&Card<E>> {
        self.items.get(key)
    }

    fn stale_key_of(&self, card: &Card<E>) -> Option<E::Key> {
        self.items
            .iter()
            .find(|(_, member)| member.same_card(card))
            .map(|(key, _)| key.clone())
    }
}

impl<E: KeyedEntity> Default for CardMap<E> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
        }
    }
}

impl<E: KeyedEntity> Backing<E> for CardMap<E> {
    const SHAPE: HolderShape = HolderShape::Map;

    fn len(&self) -> usize {
        self.items.len()
    }

    fn cards(&self) -> Box<dyn Iterator<Item = &Card<E>> + '_> {
        Box::new(self.items.values())
    }

    fn admits(&self, _card: &Card<E>) -> bool {
        true
    }

    fn insert(&mut self, card: Card<E>) -> Option<Card<E>> {
        self.items.insert(card.key(), card)
    }

    fn remove(&mut self, card: &Card<E>) -> Option<Card<E>> {
        let key = card.key();
        if self
            .items
            .get(&key)
            .is_some_and(|member| member.same_card(card))
        {
            return self.items.remove(&key);
        }
        let stale = self.stale_key_of(card)?;
        self.items.remove(&stale)
    }

    fn reseat(&mut self, card: &Card<E>) -> Reseat<E> {
        let key = card.key();
        if let Some(member) = self.items.get(&key) {
            if member.same_card(card) {
                if !member.same_handle(card) {
                    self.items.insert(key, card.clone());
                }
                return Reseat::Unchanged;
            }
        }

        let Some(stale) = self.stale_key_of(card) else {
            return Reseat::Missing;
        };
        self.items.remove(&stale);
        let displaced = self.items.insert(key, card.clone());
        Reseat::Moved { displaced }
    }

    fn record_key(card: &Card<E>) -> RepoResult<Option<String>> {
        Ok(Some(serde_json::to_string(&card.key())?))
    }
}
