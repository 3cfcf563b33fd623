//! In-memory card repository.
//!
//! Keeps containers in a map and counts storage calls, so tests and
//! ephemeral stores can observe load and flush behavior without SQLite.

use crate::holder::HolderShape;
use crate::repo::card_repo::{CardRecord, CardRepository, RepoError, RepoResult, StoredContainer};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// Non-durable repository backed by a `BTreeMap`.
#[derive(Debug, Default)]
pub struct MemoryCardRepository {
    containers: RefCell<BTreeMap<String, StoredContainer>>,
    loads: Cell<usize>,
    container_writes: Cell<usize>,
    card_writes: Cell<usize>,
    read_only: Cell<bool>,
}

impl MemoryCardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `load_container` calls served.
    pub fn loads(&self) -> usize {
        self.loads.get()
    }

    /// Number of successful whole-container writes.
    pub fn container_writes(&self) -> usize {
        self.container_writes.get()
    }

    /// Number of successful single-card writes.
    pub fn card_writes(&self) -> usize {
        self.card_writes.get()
    }

    /// Rejects every subsequent write with `RepoError::ReadOnly` while set.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }

    /// Returns a copy of what is stored for `holder`.
    pub fn snapshot(&self, holder: &str) -> Option<StoredContainer> {
        self.containers.borrow().get(holder).cloned()
    }

    fn check_writable(&self, holder: &str) -> RepoResult<()> {
        if self.read_only.get() {
            return Err(RepoError::ReadOnly(holder.to_string()));
        }
        Ok(())
    }
}

impl CardRepository for MemoryCardRepository {
    fn load_container(&self, holder: &str) -> RepoResult<Option<StoredContainer>> {
        self.loads.set(self.loads.get() + 1);
        Ok(self.snapshot(holder))
    }

    fn persist_container(
        &self,
        holder: &str,
        shape: HolderShape,
        records: &[CardRecord],
    ) -> RepoResult<()> {
        self.check_writable(holder)?;
        self.containers.borrow_mut().insert(
            holder.to_string(),
            StoredContainer {
                shape,
                records: records.to_vec(),
            },
        );
        self.container_writes.set(self.container_writes.get() + 1);
        Ok(())
    }

    fn persist_card(&self, holder: &str, record: &CardRecord) -> RepoResult<()> {
        self.check_writable(holder)?;
        let mut containers = self.containers.borrow_mut();
        let stored = containers
            .get_mut(holder)
            .and_then(|container| {
                container
                    .records
                    .iter_mut()
                    .find(|stored| stored.card_id == record.card_id)
            })
            .ok_or(RepoError::NotFound(record.card_id))?;

        *stored = record.clone();
        self.card_writes.set(self.card_writes.get() + 1);
        Ok(())
    }
}
