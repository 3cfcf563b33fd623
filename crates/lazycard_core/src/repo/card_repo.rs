//! Card container persistence contracts and SQLite implementation.
//!
//! # Responsibility
//! - Durably write whole holder containers and single card records.
//! - Load a holder's container on demand.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `persist_container` replaces every stored card of the holder in one
//!   transaction; readers never see a half-written container.
//! - Card order is the container iteration order at write time.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::holder::HolderShape;
use crate::model::card::CardId;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use uuid::Uuid;

const CARD_SELECT_SQL: &str = "SELECT
    card_id,
    map_key,
    payload
FROM cards";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for container persistence and card decoding.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Codec(serde_json::Error),
    InvalidHolderName(String),
    ShapeMismatch {
        holder: String,
        expected: HolderShape,
        found: HolderShape,
    },
    NotFound(CardId),
    InvalidData(String),
    ReadOnly(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "card payload codec failed: {err}"),
            Self::InvalidHolderName(name) => write!(f, "invalid holder name: `{name}`"),
            Self::ShapeMismatch {
                holder,
                expected,
                found,
            } => write!(
                f,
                "holder `{holder}` is stored as a {} container, not a {}",
                found.as_str(),
                expected.as_str()
            ),
            Self::NotFound(id) => write!(f, "card not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted card data: {message}"),
            Self::ReadOnly(holder) => write!(f, "repository is read-only; cannot write `{holder}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::InvalidHolderName(_)
            | Self::ShapeMismatch { .. }
            | Self::NotFound(_)
            | Self::InvalidData(_)
            | Self::ReadOnly(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value)
    }
}

/// One persisted card as seen by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    pub card_id: CardId,
    /// JSON-encoded key, set for map holders only.
    pub map_key: Option<String>,
    /// JSON-encoded entity fields.
    pub payload: String,
}

/// A holder's container as last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContainer {
    pub shape: HolderShape,
    pub records: Vec<CardRecord>,
}

/// Durable storage used by holders.
///
/// Writes are whole-container (`persist_container`) except for in-place
/// card updates (`persist_card`).
pub trait CardRepository {
    /// Returns `None` when the holder has never been written.
    fn load_container(&self, holder: &str) -> RepoResult<Option<StoredContainer>>;
    fn persist_container(
        &self,
        holder: &str,
        shape: HolderShape,
        records: &[CardRecord],
    ) -> RepoResult<()>;
    /// Rewrites one stored card. Returns `NotFound` when it is not stored
    /// under `holder`.
    fn persist_card(&self, holder: &str, record: &CardRecord) -> RepoResult<()>;
}

/// SQLite-backed card repository.
pub struct SqliteCardRepository {
    conn: Connection,
}

impl SqliteCardRepository {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl CardRepository for SqliteCardRepository {
    fn load_container(&self, holder: &str) -> RepoResult<Option<StoredContainer>> {
        let shape_text: Option<String> = self
            .conn
            .query_row(
                "SELECT shape FROM holders WHERE name = ?1;",
                [holder],
                |row| row.get(0),
            )
            .optional()?;
        let Some(shape_text) = shape_text else {
            return Ok(None);
        };
        let shape = HolderShape::parse(&shape_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid shape `{shape_text}` in holders.shape"))
        })?;

        let mut stmt = self.conn.prepare(&format!(
            "{CARD_SELECT_SQL}
             WHERE holder = ?1
             ORDER BY position ASC;"
        ))?;
        let mut rows = stmt.query([holder])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_card_row(row)?);
        }

        Ok(Some(StoredContainer { shape, records }))
    }

    fn persist_container(
        &self,
        holder: &str,
        shape: HolderShape,
        records: &[CardRecord],
    ) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO holders (name, shape) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET
                shape = excluded.shape,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![holder, shape.as_str()],
        )?;
        tx.execute("DELETE FROM cards WHERE holder = ?1;", [holder])?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO cards (
                    card_id,
                    holder,
                    position,
                    map_key,
                    payload
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            for (position, record) in records.iter().enumerate() {
                let position = i64::try_from(position).map_err(|_| {
                    RepoError::InvalidData(format!("container `{holder}` is too large"))
                })?;
                insert.execute(params![
                    record.card_id.to_string(),
                    holder,
                    position,
                    record.map_key.as_deref(),
                    record.payload.as_str(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn persist_card(&self, holder: &str, record: &CardRecord) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE cards
             SET
                map_key = ?1,
                payload = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE card_id = ?3 AND holder = ?4;",
            params![
                record.map_key.as_deref(),
                record.payload.as_str(),
                record.card_id.to_string(),
                holder,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(record.card_id));
        }

        Ok(())
    }
}

fn parse_card_row(row: &Row<'_>) -> RepoResult<CardRecord> {
    let id_text: String = row.get("card_id")?;
    let card_id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in cards.card_id"))
    })?;

    Ok(CardRecord {
        card_id,
        map_key: row.get("map_key")?,
        payload: row.get("payload")?,
    })
}
