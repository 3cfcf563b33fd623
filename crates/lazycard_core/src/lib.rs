//! Core of LazyCard: persisted cards held in lazily loaded holders.
//!
//! Cards are inert values until a holder attaches them. Attached cards gain
//! an id, can be searched, altered through their entity's altercator and
//! deleted. Holders come in three shapes (set, list, map) and flush their
//! whole container to a `CardRepository` on every change.

pub mod config;
pub mod controller;
pub mod db;
pub mod holder;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{default_log_level, ConfigError, CoreConfig};
pub use controller::{
    Alter, Altercation, Create, Creatable, Creator, Deletable, Delete, Filtered, InsertTarget,
    ReadEntry, ReadKeyValue, ReadyForInsert, Storeable,
};
pub use holder::{
    Backing, CardList, CardMap, CardSet, Holder, HolderRef, HolderShape, ListHolder, MapHolder,
    SetHolder,
};
pub use logging::{init_logging, init_logging_from, logging_status, LoggingError};
pub use model::attribute::{Attribute, AttributeValue};
pub use model::card::{Card, CardId, Entity, KeyedEntity};
pub use repo::card_repo::{
    CardRecord, CardRepository, RepoError, RepoResult, SqliteCardRepository, StoredContainer,
};
pub use repo::memory_repo::MemoryCardRepository;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
