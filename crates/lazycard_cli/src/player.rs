//! Demo `Player` card: a uuid plus a username.

use lazycard_core::{
    Alter, Altercation, Attribute, Creatable, Creator, Entity, InsertTarget, ReadyForInsert,
    RepoResult,
};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Players are identified by uuid; usernames may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    uuid: Uuid,
    username: String,
}

impl Player {
    pub const UUID: &'static str = "uuid";
    pub const USERNAME: &'static str = "username";

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl Entity for Player {
    fn attribute_equals(&self, attribute: &Attribute) -> bool {
        match attribute.key() {
            Self::UUID => attribute.value().as_uuid() == Some(self.uuid),
            Self::USERNAME => attribute.value().as_text() == Some(self.username.as_str()),
            _ => false,
        }
    }
}

pub struct PlayerCreator {
    target: InsertTarget<Player>,
    uuid: Uuid,
    username: String,
}

impl PlayerCreator {
    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }
}

impl Creator<Player> for PlayerCreator {
    fn prepare(self) -> ReadyForInsert<Player> {
        let player = Player {
            uuid: self.uuid,
            username: self.username,
        };
        ReadyForInsert::new(self.target, player)
    }
}

impl Creatable for Player {
    type Creator = PlayerCreator;

    fn creator(target: InsertTarget<Self>) -> PlayerCreator {
        PlayerCreator {
            target,
            uuid: Uuid::new_v4(),
            username: String::new(),
        }
    }
}

pub struct PlayerAltercator<'a> {
    handle: Altercation<'a, Player>,
}

impl PlayerAltercator<'_> {
    pub fn username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        self.handle.apply(|player| player.username = username);
        self
    }

    pub fn store(&self) -> RepoResult<()> {
        self.handle.store()
    }
}

impl Alter for Player {
    type Altercator<'a> = PlayerAltercator<'a>;

    fn altercator(handle: Altercation<'_, Self>) -> PlayerAltercator<'_> {
        PlayerAltercator { handle }
    }
}
