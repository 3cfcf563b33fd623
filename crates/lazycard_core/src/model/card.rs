//! Card handle and entity contracts.
//!
//! # Responsibility
//! - Wrap one entity value with deletion state and a holder back-reference.
//! - Gate identity-dependent operations behind the attachment check.
//!
//! # Invariants
//! - A card is attached to at most one holder for its whole lifetime.
//! - `deleted` only ever flips from `false` to `true`.
//! - The back-reference is weak; a card never keeps its holder alive.
//! - Calling an identity-dependent operation on an unattached card panics.
//!   That is API misuse, not a data condition.

use crate::controller::{Alter, Altercation, Delete};
use crate::holder::{HolderLink, HolderRef};
use crate::model::attribute::Attribute;
use crate::repo::card_repo::RepoResult;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Identity granted to a card when it is attached to a holder.
pub type CardId = Uuid;

/// Domain payload carried by a card.
///
/// Concrete entities (players, servers, ...) implement this to become
/// storable in a holder.
pub trait Entity: Serialize + DeserializeOwned + 'static {
    /// Compares the field named by `attribute.key()` against the attribute
    /// value.
    ///
    /// Unknown keys must return `false`.
    fn attribute_equals(&self, attribute: &Attribute) -> bool;
}

/// Entity that exposes a stable key, required by map holders.
pub trait KeyedEntity: Entity {
    type Key: Clone + Eq + Hash + Debug + Serialize + 'static;

    /// Returns the lookup key. Altering it re-files the card on its next
    /// `store()`.
    fn key(&self) -> Self::Key;
}

struct Attachment<E: Entity> {
    id: CardId,
    holder: Weak<dyn HolderLink<E>>,
}

struct CardState<E: Entity> {
    entity: RefCell<E>,
    deleted: Cell<bool>,
    attachment: RefCell<Option<Attachment<E>>>,
}

/// Shared handle to one card.
///
/// Cloning the handle does not clone the card; all clones observe the same
/// fields, deletion state and attachment.
pub struct Card<E: Entity> {
    inner: Rc<CardState<E>>,
}

/// Where a card stands relative to one particular holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttachmentState {
    Detached,
    Here,
    Elsewhere,
}

impl<E: Entity> Card<E> {
    /// Wraps an entity into an unattached card.
    pub fn new(entity: E) -> Self {
        Self {
            inner: Rc::new(CardState {
                entity: RefCell::new(entity),
                deleted: Cell::new(false),
                attachment: RefCell::new(None),
            }),
        }
    }

    /// Returns whether the card has been attached to a holder.
    pub fn is_attached(&self) -> bool {
        self.inner.attachment.borrow().is_some()
    }

    /// Returns the identity assigned at attachment.
    ///
    /// # Panics
    /// - When the card is not attached.
    pub fn id(&self) -> CardId {
        self.catch_illegal_call("id").0
    }

    /// Returns the owning holder.
    ///
    /// # Panics
    /// - When the card is not attached.
    /// - When the owning holder has already been dropped.
    pub fn parent(&self) -> HolderRef<E> {
        let (id, holder) = self.catch_illegal_call("parent");
        match holder.upgrade() {
            Some(link) => HolderRef::new(link),
            None => panic!("illegal call to `parent`: holder of card {id} has been dropped"),
        }
    }

    /// Borrows the entity fields.
    ///
    /// # Panics
    /// - When the card is not attached.
    pub fn read(&self) -> Ref<'_, E> {
        self.catch_illegal_call("read");
        self.inner.entity.borrow()
    }

    /// Compares this card against one attribute through its entity.
    ///
    /// # Panics
    /// - When the card is not attached.
    pub fn attribute_equals(&self, attribute: &Attribute) -> bool {
        self.catch_illegal_call("attribute_equals");
        self.inner.entity.borrow().attribute_equals(attribute)
    }

    /// Removes this card from its holder and marks it deleted.
    ///
    /// Deleting an already-deleted card is a no-op. A card its holder no
    /// longer contains is marked deleted without a flush.
    ///
    /// # Panics
    /// - When the card is not attached.
    pub fn delete(&self) -> RepoResult<()> {
        let (id, _) = self.catch_illegal_call("delete");
        if self.deleted() {
            debug!("event=card_delete module=card status=skipped reason=already_deleted card_id={id}");
            return Ok(());
        }

        if !self.parent().delete(self)? {
            debug!("event=card_delete module=card status=absent card_id={id}");
        }
        self.mark_deleted();
        Ok(())
    }

    /// Returns whether the card has been deleted. Safe before attachment.
    pub fn deleted(&self) -> bool {
        self.inner.deleted.get()
    }

    /// Persists the current in-memory fields through the owning holder.
    ///
    /// # Panics
    /// - When the card is not attached or has been deleted.
    pub fn store(&self) -> RepoResult<()> {
        self.catch_illegal_call("store");
        self.catch_deleted_call("store");
        self.parent().persist_card(self)
    }

    /// Opens the entity's mutation gateway.
    ///
    /// Changes stay in memory until `store()` is called.
    ///
    /// # Panics
    /// - When the card is not attached or has been deleted.
    pub fn alter(&self) -> E::Altercator<'_>
    where
        E: Alter,
    {
        E::altercator(Altercation::new(self))
    }

    /// Returns whether both handles denote the same card.
    ///
    /// Attached cards compare by id, so a handle re-materialized from
    /// storage is the same card as the one that was stored.
    pub fn same_card(&self, other: &Card<E>) -> bool {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        match (self.attached_id(), other.attached_id()) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }

    pub(crate) fn same_handle(&self, other: &Card<E>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn catch_illegal_call(&self, operation: &str) -> (CardId, Weak<dyn HolderLink<E>>) {
        match self.inner.attachment.borrow().as_ref() {
            Some(attachment) => (attachment.id, attachment.holder.clone()),
            None => panic!("illegal call to `{operation}`: card is not attached to a holder"),
        }
    }

    pub(crate) fn catch_deleted_call(&self, operation: &str) {
        if self.deleted() {
            panic!("illegal call to `{operation}`: card has been deleted");
        }
    }

    pub(crate) fn attached_id(&self) -> Option<CardId> {
        self.inner
            .attachment
            .borrow()
            .as_ref()
            .map(|attachment| attachment.id)
    }

    pub(crate) fn attachment_state(&self, holder: &Weak<dyn HolderLink<E>>) -> AttachmentState {
        match self.inner.attachment.borrow().as_ref() {
            None => AttachmentState::Detached,
            Some(attachment) if same_holder(&attachment.holder, holder) => AttachmentState::Here,
            Some(_) => AttachmentState::Elsewhere,
        }
    }

    pub(crate) fn attach(&self, id: CardId, holder: Weak<dyn HolderLink<E>>) {
        *self.inner.attachment.borrow_mut() = Some(Attachment { id, holder });
    }

    pub(crate) fn detach(&self) {
        *self.inner.attachment.borrow_mut() = None;
    }

    pub(crate) fn mark_deleted(&self) {
        self.inner.deleted.set(true);
    }

    /// Unguarded read used by holders for encoding and hashing.
    pub(crate) fn peek(&self) -> Ref<'_, E> {
        self.inner.entity.borrow()
    }

    pub(crate) fn entity_mut(&self) -> RefMut<'_, E> {
        self.inner.entity.borrow_mut()
    }
}

impl<E: KeyedEntity> Card<E> {
    /// Returns the entity key. Safe before attachment.
    pub fn key(&self) -> E::Key {
        self.inner.entity.borrow().key()
    }
}

fn same_holder<E: Entity>(left: &Weak<dyn HolderLink<E>>, right: &Weak<dyn HolderLink<E>>) -> bool {
    left.as_ptr() as *const () == right.as_ptr() as *const ()
}

impl<E: Entity> Clone for Card<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Entity + PartialEq> PartialEq for Card<E> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner) || *self.peek() == *other.peek()
    }
}

impl<E: Entity + Eq> Eq for Card<E> {}

impl<E: Entity + Hash> Hash for Card<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.peek().hash(state);
    }
}

impl<E: Entity + Debug> Debug for Card<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Card")
            .field("id", &self.attached_id())
            .field("deleted", &self.deleted())
            .field("entity", &*self.peek())
            .finish()
    }
}

impl<E: Entity> Delete for Card<E> {
    fn delete(&self) -> RepoResult<()> {
        Card::delete(self)
    }

    fn deleted(&self) -> bool {
        Card::deleted(self)
    }
}
