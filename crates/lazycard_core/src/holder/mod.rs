//! Holders: typed card containers over lazily materialized storage.
//!
//! # Responsibility
//! - Own one backing container (set, list or map) and its repository handle.
//! - Attach cards on store, detach them from membership on delete.
//! - Answer attribute searches, predicate filters and keyed fetches.
//!
//! # Invariants
//! - The container is loaded on first access, never at construction.
//! - Every `store`/`delete` flushes the whole container; a failed flush
//!   rolls the in-memory change back.
//! - A card is attached to at most one holder; storing a card that belongs
//!   elsewhere panics.
//! - A member that loses its slot to another card (map overwrite, or an
//!   altered card re-filed onto it) is marked deleted.
//! - `filter` iterates a snapshot taken at call time.

mod backing;
mod lazy;

pub use backing::{Backing, CardList, CardMap, CardSet, Reseat};
pub use lazy::LazyContainer;

use crate::controller::{
    Create, Creatable, Deletable, Filtered, InsertTarget, ReadEntry, ReadKeyValue, Storeable,
};
use crate::model::attribute::Attribute;
use crate::model::card::{AttachmentState, Card, Entity, KeyedEntity};
use crate::repo::card_repo::{CardRecord, CardRepository, RepoError, RepoResult};
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::{RefCell, RefMut};
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::rc::{Rc, Weak};
use std::time::Instant;
use uuid::Uuid;

static HOLDER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_.-]{0,63}$").expect("valid holder name regex"));

/// Container shape of a holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HolderShape {
    Set,
    List,
    Map,
}

impl HolderShape {
    /// Stable string id used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::List => "list",
            Self::Map => "map",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "set" => Some(Self::Set),
            "list" => Some(Self::List),
            "map" => Some(Self::Map),
            _ => None,
        }
    }
}

/// Returns whether `name` can identify a holder in storage.
pub fn is_valid_holder_name(name: &str) -> bool {
    HOLDER_NAME_RE.is_match(name)
}

/// Operations a card performs on its owning holder.
pub(crate) trait HolderLink<E: Entity> {
    fn name(&self) -> &str;
    fn shape(&self) -> HolderShape;
    fn store(&self, card: &Card<E>) -> RepoResult<()>;
    fn delete(&self, card: &Card<E>) -> RepoResult<bool>;
    fn persist_card(&self, card: &Card<E>) -> RepoResult<()>;
}

/// A card's view of the holder it is attached to.
pub struct HolderRef<E: Entity> {
    link: Rc<dyn HolderLink<E>>,
}

impl<E: Entity> HolderRef<E> {
    pub(crate) fn new(link: Rc<dyn HolderLink<E>>) -> Self {
        Self { link }
    }

    pub fn name(&self) -> &str {
        self.link.name()
    }

    pub fn shape(&self) -> HolderShape {
        self.link.shape()
    }

    pub fn store(&self, card: &Card<E>) -> RepoResult<()> {
        self.link.store(card)
    }

    pub fn delete(&self, card: &Card<E>) -> RepoResult<bool> {
        self.link.delete(card)
    }

    pub(crate) fn persist_card(&self, card: &Card<E>) -> RepoResult<()> {
        self.link.persist_card(card)
    }
}

impl<E: Entity> Storeable<E> for HolderRef<E> {
    fn store(&self, card: &Card<E>) -> RepoResult<()> {
        HolderRef::store(self, card)
    }
}

impl<E: Entity> Deletable<E> for HolderRef<E> {
    fn delete(&self, card: &Card<E>) -> RepoResult<bool> {
        HolderRef::delete(self, card)
    }
}

struct HolderCore<E: Entity, B: Backing<E>> {
    name: String,
    repo: Rc<dyn CardRepository>,
    items: RefCell<LazyContainer<B>>,
    this: Weak<HolderCore<E, B>>,
    _entity: PhantomData<E>,
}

impl<E: Entity, B: Backing<E>> HolderCore<E, B> {
    fn link(&self) -> Weak<dyn HolderLink<E>> {
        self.this.clone()
    }

    fn materialize(&self) -> RepoResult<RefMut<'_, B>> {
        if !self.items.borrow().is_loaded() {
            let backing = self.load()?;
            self.items.borrow_mut().fill(backing);
        }
        Ok(RefMut::map(self.items.borrow_mut(), LazyContainer::force))
    }

    fn load(&self) -> RepoResult<B> {
        let started_at = Instant::now();
        match self.decode_stored() {
            Ok(backing) => {
                info!(
                    "event=holder_load module=holder status=ok holder={} shape={} cards={} duration_ms={}",
                    self.name,
                    B::SHAPE.as_str(),
                    backing.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(backing)
            }
            Err(err) => {
                error!(
                    "event=holder_load module=holder status=error holder={} duration_ms={} error={}",
                    self.name,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn decode_stored(&self) -> RepoResult<B> {
        let mut backing = B::default();
        let Some(stored) = self.repo.load_container(&self.name)? else {
            return Ok(backing);
        };
        if stored.shape != B::SHAPE {
            return Err(RepoError::ShapeMismatch {
                holder: self.name.clone(),
                expected: B::SHAPE,
                found: stored.shape,
            });
        }

        let link = self.link();
        for record in stored.records {
            let entity: E = serde_json::from_str(&record.payload)?;
            let card = Card::new(entity);
            card.attach(record.card_id, link.clone());
            backing.insert(card);
        }
        Ok(backing)
    }

    fn record_for(&self, card: &Card<E>) -> RepoResult<CardRecord> {
        // Members slipped in through `expose()` are adopted on flush.
        let card_id = match card.attached_id() {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                card.attach(id, self.link());
                id
            }
        };

        Ok(CardRecord {
            card_id,
            map_key: B::record_key(card)?,
            payload: serde_json::to_string(&*card.peek())?,
        })
    }

    fn flush(&self, items: &B) -> RepoResult<()> {
        let started_at = Instant::now();
        let records = items
            .cards()
            .map(|card| self.record_for(card))
            .collect::<RepoResult<Vec<_>>>()?;

        match self.repo.persist_container(&self.name, B::SHAPE, &records) {
            Ok(()) => {
                debug!(
                    "event=holder_flush module=holder status=ok holder={} shape={} cards={} duration_ms={}",
                    self.name,
                    B::SHAPE.as_str(),
                    records.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=holder_flush module=holder status=error holder={} duration_ms={} error={}",
                    self.name,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Flushes after `card` was re-filed under new fields.
    ///
    /// A failed flush drops the materialized container, so the next access
    /// reloads what storage still holds.
    fn flush_moved(
        &self,
        items: RefMut<'_, B>,
        card: &Card<E>,
        displaced: Option<Card<E>>,
    ) -> RepoResult<()> {
        let flushed = self.flush(&items);
        drop(items);
        if let Err(err) = flushed {
            self.items.borrow_mut().evict();
            warn!(
                "event=holder_evict module=holder status=rollback holder={} card_id={}",
                self.name,
                id_label(card)
            );
            return Err(err);
        }

        if let Some(displaced) = displaced {
            self.retire_displaced(card, &displaced);
        }
        Ok(())
    }

    fn retire_displaced(&self, card: &Card<E>, displaced: &Card<E>) {
        displaced.mark_deleted();
        warn!(
            "event=card_store module=holder status=displaced holder={} card_id={} displaced_id={}",
            self.name,
            id_label(card),
            id_label(displaced)
        );
    }

    fn store_card(&self, card: &Card<E>) -> RepoResult<()> {
        card.catch_deleted_call("store");
        let link = self.link();
        let state = card.attachment_state(&link);
        if state == AttachmentState::Elsewhere {
            panic!(
                "illegal call to `store`: card {} is attached to another holder than `{}`",
                id_label(card),
                self.name
            );
        }

        let mut items = self.materialize()?;
        if state == AttachmentState::Here && items.contains_card(card) {
            // Fields may have changed since the card was filed.
            return match items.reseat(card) {
                Reseat::Unchanged => self.flush(&items),
                Reseat::Moved { displaced } => self.flush_moved(items, card, displaced),
                Reseat::Missing => Err(RepoError::NotFound(card.id())),
            };
        }
        if !items.admits(card) {
            debug!(
                "event=card_store module=holder status=duplicate holder={}",
                self.name
            );
            return Ok(());
        }

        let fresh = state == AttachmentState::Detached;
        if fresh {
            card.attach(Uuid::new_v4(), link);
        }
        let displaced = items.insert(card.clone());

        if let Err(err) = self.flush(&items) {
            items.remove(card);
            if let Some(displaced) = displaced {
                items.insert(displaced);
            }
            if fresh {
                card.detach();
            }
            return Err(err);
        }

        if let Some(displaced) = displaced {
            self.retire_displaced(card, &displaced);
        }
        debug!(
            "event=card_store module=holder status=ok holder={} card_id={}",
            self.name,
            id_label(card)
        );
        Ok(())
    }

    fn delete_card(&self, card: &Card<E>) -> RepoResult<bool> {
        let mut items = self.materialize()?;
        let Some(removed) = items.remove(card) else {
            debug!(
                "event=card_delete module=holder status=absent holder={}",
                self.name
            );
            return Ok(false);
        };

        if let Err(err) = self.flush(&items) {
            items.insert(removed);
            return Err(err);
        }

        removed.mark_deleted();
        if removed.same_card(card) {
            card.mark_deleted();
        }
        debug!(
            "event=card_delete module=holder status=ok holder={} card_id={}",
            self.name,
            id_label(&removed)
        );
        Ok(true)
    }

    fn persist_single(&self, card: &Card<E>) -> RepoResult<()> {
        let record = self.record_for(card)?;
        self.repo.persist_card(&self.name, &record)?;
        debug!(
            "event=card_persist module=holder status=ok holder={} card_id={}",
            self.name, record.card_id
        );
        Ok(())
    }

    fn search_for(&self, attributes: &[Attribute]) -> RepoResult<Option<Card<E>>> {
        let criteria = distinct_criteria(attributes);
        if criteria.is_empty() {
            return Ok(None);
        }

        let items = self.materialize()?;
        let found = items
            .cards()
            .find(|card| {
                criteria
                    .iter()
                    .all(|attribute| card.attribute_equals(attribute))
            })
            .cloned();
        Ok(found)
    }

    fn snapshot(&self) -> RepoResult<Vec<Card<E>>> {
        let items = self.materialize()?;
        Ok(items.cards().cloned().collect())
    }
}

impl<E: KeyedEntity> HolderCore<E, CardMap<E>> {
    fn fetch(&self, key: &E::Key) -> RepoResult<Option<Card<E>>> {
        let items = self.materialize()?;
        Ok(items.get(key).cloned())
    }
}

impl<E: Entity, B: Backing<E>> HolderLink<E> for HolderCore<E, B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> HolderShape {
        B::SHAPE
    }

    fn store(&self, card: &Card<E>) -> RepoResult<()> {
        self.store_card(card)
    }

    fn delete(&self, card: &Card<E>) -> RepoResult<bool> {
        self.delete_card(card)
    }

    fn persist_card(&self, card: &Card<E>) -> RepoResult<()> {
        let id = card.id();
        let mut items = self.items.borrow_mut();
        let outcome = match items.loaded_mut() {
            Some(backing) => backing.reseat(card),
            // Not materialized: storage holds the only copy, update it in place.
            None => Reseat::Unchanged,
        };

        match outcome {
            Reseat::Unchanged => {
                drop(items);
                self.persist_single(card)
            }
            Reseat::Moved { displaced } => {
                let items = RefMut::map(items, LazyContainer::force);
                self.flush_moved(items, card, displaced)
            }
            Reseat::Missing => Err(RepoError::NotFound(id)),
        }
    }
}

/// Attributes with repeated keys keep only their first occurrence.
fn distinct_criteria(attributes: &[Attribute]) -> Vec<&Attribute> {
    let mut seen = HashSet::new();
    attributes
        .iter()
        .filter(|attribute| seen.insert(*attribute))
        .collect()
}

fn id_label<E: Entity>(card: &Card<E>) -> String {
    card.attached_id()
        .map_or_else(|| "unattached".to_string(), |id| id.to_string())
}

/// Card container backed by lazily loaded storage.
///
/// Cheap to clone; clones share the same container.
pub struct Holder<E: Entity, B: Backing<E>> {
    core: Rc<HolderCore<E, B>>,
}

/// Unordered unique collection; membership follows entity `Eq`/`Hash`.
pub type SetHolder<E> = Holder<E, CardSet<E>>;
/// Ordered collection; keeps insertion order.
pub type ListHolder<E> = Holder<E, CardList<E>>;
/// Keyed collection; one card per `KeyedEntity::key`.
pub type MapHolder<E> = Holder<E, CardMap<E>>;

impl<E: Entity, B: Backing<E>> Holder<E, B> {
    /// Creates a holder named `name` over `repo`. Nothing is loaded yet.
    ///
    /// # Errors
    /// - `InvalidHolderName` unless `name` is a lowercase ASCII letter
    ///   followed by up to 63 of `[a-z0-9_.-]`.
    pub fn try_new(name: impl Into<String>, repo: Rc<dyn CardRepository>) -> RepoResult<Self> {
        let name = name.into();
        if !is_valid_holder_name(&name) {
            return Err(RepoError::InvalidHolderName(name));
        }

        let core = Rc::new_cyclic(|this| HolderCore {
            name,
            repo,
            items: RefCell::new(LazyContainer::new()),
            this: this.clone(),
            _entity: PhantomData,
        });
        Ok(Self { core })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn shape(&self) -> HolderShape {
        B::SHAPE
    }

    /// Returns whether the container is currently materialized.
    pub fn is_loaded(&self) -> bool {
        self.core.items.borrow().is_loaded()
    }

    pub fn len(&self) -> RepoResult<usize> {
        Ok(self.core.materialize()?.len())
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.core.materialize()?.is_empty())
    }

    /// Returns the first card matching every attribute.
    ///
    /// Traversal follows the container's iteration order: insertion order
    /// for lists, unspecified for sets and maps. An empty attribute list
    /// matches nothing.
    pub fn search_for(&self, attributes: &[Attribute]) -> RepoResult<Option<Card<E>>> {
        self.core.search_for(attributes)
    }

    /// Returns the cards accepted by `predicate`, lazily, over a snapshot of
    /// the members taken now.
    pub fn filter<P>(&self, predicate: P) -> RepoResult<Filtered<E, P>>
    where
        P: FnMut(&Card<E>) -> bool,
    {
        Ok(self.core.snapshot()?.into_iter().filter(predicate))
    }

    /// Attaches `card` to this holder, adds it and flushes the container.
    ///
    /// - Set: an equal member already present wins; `card` stays unattached
    ///   and nothing is written.
    /// - List: appends.
    /// - Map: inserts, overwriting any card with the same key. The
    ///   overwritten card is marked deleted.
    ///
    /// Re-storing a member after altering it re-files it under its current
    /// fields. A member it collides with is marked deleted.
    ///
    /// # Panics
    /// - When `card` is deleted or attached to another holder.
    pub fn store(&self, card: &Card<E>) -> RepoResult<()> {
        self.core.store_card(card)
    }

    /// Removes `card`, flushes the container and marks the removed member
    /// deleted. Returns `Ok(false)` without writing when `card` is absent.
    pub fn delete(&self, card: &Card<E>) -> RepoResult<bool> {
        self.core.delete_card(card)
    }

    /// Raw access to the materialized container.
    ///
    /// Changes made through it are not persisted until `flush()`. Other
    /// holder calls panic while the returned guard is alive.
    pub fn expose(&self) -> RepoResult<RefMut<'_, B>> {
        self.core.materialize()
    }

    /// Writes the whole container as it is in memory.
    pub fn flush(&self) -> RepoResult<()> {
        let items = self.core.materialize()?;
        self.core.flush(&items)
    }

    /// Drops the materialized container; the next access reloads it.
    ///
    /// Returns whether anything was loaded.
    pub fn evict(&self) -> bool {
        let evicted = self.core.items.borrow_mut().evict().is_some();
        if evicted {
            debug!(
                "event=holder_evict module=holder status=ok holder={}",
                self.core.name
            );
        }
        evicted
    }

    /// Returns a creator that commits into this holder.
    pub fn create(&self) -> E::Creator
    where
        E: Creatable,
    {
        let link: Rc<dyn HolderLink<E>> = self.core.clone();
        E::creator(InsertTarget::new(link))
    }
}

impl<E: KeyedEntity> Holder<E, CardMap<E>> {
    /// Looks a card up by key without scanning.
    pub fn fetch(&self, key: &E::Key) -> RepoResult<Option<Card<E>>> {
        self.core.fetch(key)
    }
}

impl<E: Entity, B: Backing<E>> Clone for Holder<E, B> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<E: Entity, B: Backing<E>> Debug for Holder<E, B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Holder")
            .field("name", &self.core.name)
            .field("shape", &B::SHAPE)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl<E: Creatable, B: Backing<E>> Create<E> for Holder<E, B> {
    fn create(&self) -> E::Creator {
        Holder::create(self)
    }
}

impl<E: Entity, B: Backing<E>> ReadEntry<E> for Holder<E, B> {
    fn search_for(&self, attributes: &[Attribute]) -> RepoResult<Option<Card<E>>> {
        Holder::search_for(self, attributes)
    }

    fn filter<P>(&self, predicate: P) -> RepoResult<Filtered<E, P>>
    where
        P: FnMut(&Card<E>) -> bool,
    {
        Holder::filter(self, predicate)
    }
}

impl<E: KeyedEntity> ReadKeyValue<E> for Holder<E, CardMap<E>> {
    fn fetch(&self, key: &E::Key) -> RepoResult<Option<Card<E>>> {
        Holder::fetch(self, key)
    }
}

impl<E: Entity, B: Backing<E>> Storeable<E> for Holder<E, B> {
    fn store(&self, card: &Card<E>) -> RepoResult<()> {
        Holder::store(self, card)
    }
}

impl<E: Entity, B: Backing<E>> Deletable<E> for Holder<E, B> {
    fn delete(&self, card: &Card<E>) -> RepoResult<bool> {
        Holder::delete(self, card)
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_holder_name, HolderShape, ListHolder, MapHolder, SetHolder};
    use crate::model::attribute::Attribute;
    use crate::model::card::{Card, Entity, KeyedEntity};
    use crate::repo::card_repo::RepoError;
    use crate::repo::memory_repo::MemoryCardRepository;
    use serde::{Deserialize, Serialize};
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    struct Tag {
        label: String,
        weight: i64,
    }

    impl Entity for Tag {
        fn attribute_equals(&self, attribute: &Attribute) -> bool {
            match attribute.key() {
                "label" => attribute.value().as_text() == Some(self.label.as_str()),
                "weight" => attribute.value().as_int() == Some(self.weight),
                _ => false,
            }
        }
    }

    impl KeyedEntity for Tag {
        type Key = String;

        fn key(&self) -> String {
            self.label.clone()
        }
    }

    fn tag(label: &str, weight: i64) -> Card<Tag> {
        Card::new(Tag {
            label: label.to_string(),
            weight,
        })
    }

    #[test]
    fn holder_names_are_validated() {
        assert!(is_valid_holder_name("players"));
        assert!(is_valid_holder_name("guild.members_v2"));
        assert!(!is_valid_holder_name(""));
        assert!(!is_valid_holder_name("Players"));
        assert!(!is_valid_holder_name("9lives"));
        assert!(!is_valid_holder_name(&"a".repeat(65)));

        let repo = Rc::new(MemoryCardRepository::new());
        let err = SetHolder::<Tag>::try_new("bad name", repo).unwrap_err();
        assert!(matches!(err, RepoError::InvalidHolderName(name) if name == "bad name"));
    }

    #[test]
    fn shape_round_trips_through_str() {
        for shape in [HolderShape::Set, HolderShape::List, HolderShape::Map] {
            assert_eq!(HolderShape::parse(shape.as_str()), Some(shape));
        }
        assert_eq!(HolderShape::parse("tree"), None);
    }

    #[test]
    fn container_is_loaded_on_first_access_only() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo.clone()).unwrap();
        assert!(!holder.is_loaded());
        assert_eq!(repo.loads(), 0);

        holder.store(&tag("red", 1)).unwrap();
        holder.search_for(&[Attribute::new("label", "red")]).unwrap();
        assert!(holder.is_loaded());
        assert_eq!(repo.loads(), 1);
    }

    #[test]
    fn every_store_and_delete_flushes_once() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo.clone()).unwrap();
        let red = tag("red", 1);

        holder.store(&red).unwrap();
        holder.store(&tag("blue", 2)).unwrap();
        assert!(holder.delete(&red).unwrap());
        assert_eq!(repo.container_writes(), 3);
        assert_eq!(repo.snapshot("tags").unwrap().records.len(), 1);
    }

    #[test]
    fn empty_attribute_list_matches_nothing() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo).unwrap();
        holder.store(&tag("red", 1)).unwrap();

        assert!(holder.search_for(&[]).unwrap().is_none());
    }

    #[test]
    fn search_requires_every_attribute() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo).unwrap();
        holder.store(&tag("red", 1)).unwrap();
        holder.store(&tag("red", 2)).unwrap();

        let found = holder
            .search_for(&[Attribute::new("label", "red"), Attribute::new("weight", 2_i64)])
            .unwrap()
            .unwrap();
        assert_eq!(found.read().weight, 2);

        let none = holder
            .search_for(&[Attribute::new("label", "red"), Attribute::new("weight", 3_i64)])
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn repeated_attribute_key_uses_first_occurrence() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo).unwrap();
        holder.store(&tag("red", 1)).unwrap();

        let found = holder
            .search_for(&[Attribute::new("label", "red"), Attribute::new("label", "blue")])
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn unknown_attribute_key_matches_nothing() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo).unwrap();
        holder.store(&tag("red", 1)).unwrap();

        assert!(holder
            .search_for(&[Attribute::new("colour", "red")])
            .unwrap()
            .is_none());
    }

    #[test]
    fn failed_flush_rolls_back_store() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = SetHolder::<Tag>::try_new("tags", repo.clone()).unwrap();
        let red = tag("red", 1);

        repo.set_read_only(true);
        let err = holder.store(&red).unwrap_err();
        assert!(matches!(err, RepoError::ReadOnly(_)));
        assert!(!red.is_attached());
        assert_eq!(holder.len().unwrap(), 0);

        repo.set_read_only(false);
        holder.store(&red).unwrap();
        assert!(red.is_attached());
    }

    #[test]
    fn failed_flush_rolls_back_delete() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo.clone()).unwrap();
        let red = tag("red", 1);
        holder.store(&red).unwrap();

        repo.set_read_only(true);
        assert!(holder.delete(&red).is_err());
        assert!(!red.deleted());
        assert_eq!(holder.len().unwrap(), 1);
    }

    #[test]
    fn shape_mismatch_is_reported_on_load() {
        let repo = Rc::new(MemoryCardRepository::new());
        let list = ListHolder::<Tag>::try_new("tags", repo.clone()).unwrap();
        list.store(&tag("red", 1)).unwrap();

        let map = MapHolder::<Tag>::try_new("tags", repo).unwrap();
        let err = map.fetch(&"red".to_string()).unwrap_err();
        assert!(matches!(
            err,
            RepoError::ShapeMismatch {
                expected: HolderShape::Map,
                found: HolderShape::List,
                ..
            }
        ));
    }

    #[test]
    fn store_of_unloaded_card_writes_single_record() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo.clone()).unwrap();
        let red = tag("red", 1);
        holder.store(&red).unwrap();
        assert!(holder.evict());

        red.store().unwrap();
        assert_eq!(repo.card_writes(), 1);
        assert_eq!(repo.container_writes(), 1);
        assert!(!holder.is_loaded());
    }

    #[test]
    #[should_panic(expected = "another holder")]
    fn storing_card_owned_elsewhere_panics() {
        let repo = Rc::new(MemoryCardRepository::new());
        let first = ListHolder::<Tag>::try_new("first", repo.clone()).unwrap();
        let second = ListHolder::<Tag>::try_new("second", repo).unwrap();
        let red = tag("red", 1);

        first.store(&red).unwrap();
        let _ = second.store(&red);
    }

    #[test]
    #[should_panic(expected = "has been deleted")]
    fn storing_deleted_card_panics() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo).unwrap();
        let red = tag("red", 1);
        holder.store(&red).unwrap();
        red.delete().unwrap();

        let _ = holder.store(&red);
    }

    #[test]
    fn restoring_member_does_not_duplicate_it() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo.clone()).unwrap();
        let red = tag("red", 1);

        holder.store(&red).unwrap();
        holder.store(&red).unwrap();
        assert_eq!(holder.len().unwrap(), 1);
        assert_eq!(repo.container_writes(), 2);
    }

    #[test]
    fn exposed_members_are_adopted_on_flush() {
        let repo = Rc::new(MemoryCardRepository::new());
        let holder = ListHolder::<Tag>::try_new("tags", repo.clone()).unwrap();
        let red = tag("red", 1);

        holder.expose().unwrap().items_mut().push(red.clone());
        assert!(!red.is_attached());

        holder.flush().unwrap();
        assert!(red.is_attached());
        assert_eq!(red.parent().name(), "tags");
        assert_eq!(repo.snapshot("tags").unwrap().records[0].card_id, red.id());
    }
}
