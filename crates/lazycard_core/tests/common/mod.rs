#![allow(dead_code)]

use lazycard_core::{
    Alter, Altercation, Attribute, Card, Creatable, Creator, Entity, InsertTarget, KeyedEntity,
    ReadyForInsert, RepoResult,
};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Player card. Two players are equal when their uuids are equal.
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

pub fn username_of(card: &Card<Player>) -> String {
    card.read().username().to_string()
}

pub struct PlayerCreator {
    target: InsertTarget<Player>,
    uuid: Option<Uuid>,
    username: String,
}

impl PlayerCreator {
    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
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
            uuid: self.uuid.unwrap_or_else(Uuid::new_v4),
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
            uuid: None,
            username: String::new(),
        }
    }
}

pub struct PlayerAltercator<'a> {
    handle: Altercation<'a, Player>,
}

impl PlayerAltercator<'_> {
    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.handle.apply(|player| player.uuid = uuid);
        self
    }

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

/// Server card keyed by its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    name: String,
    address: String,
    capacity: i64,
}

impl Server {
    pub fn new(name: &str, address: &str, capacity: i64) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            capacity,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }
}

impl Entity for Server {
    fn attribute_equals(&self, attribute: &Attribute) -> bool {
        match attribute.key() {
            "name" => attribute.value().as_text() == Some(self.name.as_str()),
            "address" => attribute.value().as_text() == Some(self.address.as_str()),
            "capacity" => attribute.value().as_int() == Some(self.capacity),
            _ => false,
        }
    }
}

impl KeyedEntity for Server {
    type Key = String;

    fn key(&self) -> String {
        self.name.clone()
    }
}

pub struct ServerAltercator<'a> {
    handle: Altercation<'a, Server>,
}

impl ServerAltercator<'_> {
    pub fn name(mut self, name: &str) -> Self {
        let name = name.to_string();
        self.handle.apply(|server| server.name = name);
        self
    }

    pub fn capacity(mut self, capacity: i64) -> Self {
        self.handle.apply(|server| server.capacity = capacity);
        self
    }
}

impl Alter for Server {
    type Altercator<'a> = ServerAltercator<'a>;

    fn altercator(handle: Altercation<'_, Self>) -> ServerAltercator<'_> {
        ServerAltercator { handle }
    }
}
