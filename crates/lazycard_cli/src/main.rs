//! CLI demo for the card store.
//!
//! # Responsibility
//! - Wire configuration, logging and the SQLite card store together.
//! - Walk one player card through create, search, alter and delete.
//!
//! Usage: `lazycard_cli [demo|list]`. The store lives at
//! `LAZYCARD_DB_PATH`, or in memory when unset.

mod player;

use lazycard_core::{
    init_logging_from, Attribute, CardRepository, CoreConfig, Creator, SetHolder,
    SqliteCardRepository,
};
use log::info;
use player::Player;
use std::error::Error;
use std::rc::Rc;
use uuid::Uuid;

const HOLDER_NAME: &str = "players";

fn main() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    init_logging_from(&config)?;

    let repo: Rc<dyn CardRepository> = match &config.db_path {
        Some(path) => Rc::new(SqliteCardRepository::open(path)?),
        None => Rc::new(SqliteCardRepository::open_in_memory()?),
    };
    let players = SetHolder::<Player>::try_new(HOLDER_NAME, repo)?;

    let command = std::env::args().nth(1).unwrap_or_else(|| "demo".to_string());
    match command.as_str() {
        "demo" => run_demo(&players),
        "list" => list_players(&players),
        other => Err(format!("unknown command `{other}`; expected demo|list").into()),
    }
}

fn run_demo(players: &SetHolder<Player>) -> Result<(), Box<dyn Error>> {
    let uuid = Uuid::new_v4();
    let card = players
        .create()
        .uuid(uuid)
        .username("alice")
        .prepare()
        .commit()?;
    println!("created player {} as alice (card {})", uuid, card.id());

    let found = players.search_for(&[Attribute::new(Player::UUID, uuid)])?;
    let found = found.as_ref().map(|card| card.read().username().to_string());
    println!("search uuid={uuid}: {}", describe(found));

    card.alter().username("bob").store()?;
    let bob = players.search_for(&[Attribute::new(Player::USERNAME, "bob")])?;
    let alice = players.search_for(&[Attribute::new(Player::USERNAME, "alice")])?;
    println!(
        "search username=bob: {}",
        describe(bob.map(|card| card.id().to_string()))
    );
    println!(
        "search username=alice: {}",
        describe(alice.map(|card| card.id().to_string()))
    );

    card.delete()?;
    println!("deleted card {}; deleted={}", card.id(), card.deleted());
    info!(
        "event=cli_demo module=cli status=ok holder={} remaining={}",
        players.name(),
        players.len()?
    );
    Ok(())
}

fn list_players(players: &SetHolder<Player>) -> Result<(), Box<dyn Error>> {
    let mut count = 0;
    for card in players.filter(|_| true)? {
        let player = card.read();
        println!("{} {} {}", card.id(), player.uuid(), player.username());
        count += 1;
    }
    println!("{count} player(s) in `{}`", players.name());
    Ok(())
}

fn describe(value: Option<String>) -> String {
    value.unwrap_or_else(|| "none".to_string())
}
