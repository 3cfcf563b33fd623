mod common;

use common::{Player, Server};
use lazycard_core::{
    Attribute, Card, CardRepository, Creator, HolderShape, ListHolder, MapHolder, RepoError,
    SetHolder, SqliteCardRepository,
};
use std::rc::Rc;
use uuid::Uuid;

fn open_repo(path: &std::path::Path) -> Rc<SqliteCardRepository> {
    Rc::new(SqliteCardRepository::open(path).expect("open card store"))
}

#[test]
fn set_holder_round_trips_through_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cards.db");
    let uuid = Uuid::new_v4();

    let id = {
        let repo = open_repo(&path);
        let holder = SetHolder::<Player>::try_new("players", repo).unwrap();
        let card = holder
            .create()
            .uuid(uuid)
            .username("alice")
            .prepare()
            .commit()
            .unwrap();
        card.alter().username("bob").store().unwrap();
        card.id()
    };

    let repo = open_repo(&path);
    let holder = SetHolder::<Player>::try_new("players", repo).unwrap();
    let card = holder
        .search_for(&[Attribute::new(Player::UUID, uuid)])
        .unwrap()
        .expect("player persisted");
    assert_eq!(card.id(), id);
    assert_eq!(card.read().username(), "bob");
    assert_eq!(card.parent().shape(), HolderShape::Set);
}

#[test]
fn list_order_survives_reload() {
    let repo = Rc::new(SqliteCardRepository::open_in_memory().unwrap());
    let queue = ListHolder::<Player>::try_new("queue", repo.clone()).unwrap();
    for name in ["first", "second", "third"] {
        queue.create().username(name).prepare().commit().unwrap();
    }
    let second = queue
        .search_for(&[Attribute::new(Player::USERNAME, "second")])
        .unwrap()
        .unwrap();
    second.delete().unwrap();
    queue.create().username("fourth").prepare().commit().unwrap();

    let reloaded = ListHolder::<Player>::try_new("queue", repo).unwrap();
    let names: Vec<String> = reloaded
        .filter(|_| true)
        .unwrap()
        .map(|card| common::username_of(&card))
        .collect();
    assert_eq!(names, ["first", "third", "fourth"]);
}

#[test]
fn map_keys_are_stored_alongside_cards() {
    let repo = Rc::new(SqliteCardRepository::open_in_memory().unwrap());
    let servers = MapHolder::<Server>::try_new("servers", repo.clone()).unwrap();
    let hub = Card::new(Server::new("hub", "10.0.0.1:25565", 50));
    servers.store(&hub).unwrap();

    let stored = repo.load_container("servers").unwrap().unwrap();
    assert_eq!(stored.shape, HolderShape::Map);
    assert_eq!(stored.records[0].card_id, hub.id());
    assert_eq!(stored.records[0].map_key.as_deref(), Some("\"hub\""));

    let reloaded = MapHolder::<Server>::try_new("servers", repo).unwrap();
    let fetched = reloaded.fetch(&"hub".to_string()).unwrap().unwrap();
    assert_eq!(fetched.read().address(), "10.0.0.1:25565");
}

#[test]
fn single_record_update_when_container_not_loaded() {
    let repo = Rc::new(SqliteCardRepository::open_in_memory().unwrap());
    let servers = MapHolder::<Server>::try_new("servers", repo.clone()).unwrap();
    let hub = Card::new(Server::new("hub", "10.0.0.1:25565", 50));
    servers.store(&hub).unwrap();
    servers.evict();

    hub.alter().capacity(75);
    hub.store().unwrap();
    assert!(!servers.is_loaded());

    let fetched = servers.fetch(&"hub".to_string()).unwrap().unwrap();
    assert_eq!(fetched.read().capacity(), 75);
}

#[test]
fn storing_card_removed_behind_the_holder_reports_not_found() {
    let repo = Rc::new(SqliteCardRepository::open_in_memory().unwrap());
    let holder = ListHolder::<Player>::try_new("queue", repo.clone()).unwrap();
    let card = holder.create().username("ghost").prepare().commit().unwrap();
    holder.evict();

    repo.connection()
        .execute("DELETE FROM cards WHERE holder = 'queue';", [])
        .unwrap();

    let err = card.store().unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == card.id()));
}

#[test]
fn corrupt_payload_surfaces_as_codec_error() {
    let repo = Rc::new(SqliteCardRepository::open_in_memory().unwrap());
    let holder = ListHolder::<Player>::try_new("queue", repo.clone()).unwrap();
    holder.create().username("broken").prepare().commit().unwrap();
    holder.evict();

    repo.connection()
        .execute("UPDATE cards SET payload = '{\"nope\":1}';", [])
        .unwrap();

    let err = holder.len().unwrap_err();
    assert!(matches!(err, RepoError::Codec(_)));
    assert!(!holder.is_loaded());
}
