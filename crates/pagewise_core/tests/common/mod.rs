#![allow(dead_code)]

use pagewise_core::db::migrations::Migration;
use pagewise_core::db::{open_db_in_memory, SharedConnectionProvider};
use pagewise_core::{EntityDescriptor, FromRow, Schema, SqliteReadOnlyRepository};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use std::sync::Arc;

pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "CREATE TABLE addresses (
            id INTEGER PRIMARY KEY,
            city TEXT NOT NULL
        );
        CREATE TABLE people (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            address_id INTEGER REFERENCES addresses(id)
        );",
    ),
    Migration::new(
        2,
        "CREATE TABLE pets (
            pet_id INTEGER PRIMARY KEY,
            owner_id INTEGER NOT NULL REFERENCES people(id),
            species TEXT NOT NULL,
            name TEXT NOT NULL
        );",
    ),
];

pub fn schema() -> Arc<Schema> {
    let schema = Schema::builder()
        .entity(
            EntityDescriptor::new("person", "people")
                .field("name")
                .field("age")
                .field_with_column("addressId", "address_id")
                .to_one("address", "address", "address_id")
                .to_many("pets", "pet", "owner_id"),
        )
        .entity(EntityDescriptor::new("address", "addresses").field("city"))
        .entity(
            EntityDescriptor::new("pet", "pets")
                .primary_key("pet_id")
                .field("species")
                .field("name")
                .field_with_column("ownerId", "owner_id")
                .to_one("owner", "person", "owner_id"),
        )
        .entity(EntityDescriptor::new("ghost", "ghosts").field("name"))
        .build()
        .unwrap();
    Arc::new(schema)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub address_id: Option<i64>,
}

impl FromRow for Person {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            age: row.get("age")?,
            address_id: row.get("address_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pet {
    pub pet_id: i64,
    pub owner_id: i64,
    pub species: String,
    pub name: String,
}

impl FromRow for Pet {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            pet_id: row.get("pet_id")?,
            owner_id: row.get("owner_id")?,
            species: row.get("species")?,
            name: row.get("name")?,
        })
    }
}

pub const CITIES: [&str; 4] = ["Berlin", "Lisbon", "Oslo", "Austin"];

pub fn empty_db() -> Connection {
    open_db_in_memory(MIGRATIONS).unwrap()
}

/// Inserts the four addresses and `count` people named `person-01`, ...
/// Person `n` is `20 + n` years old and lives at address `(n - 1) % 4 + 1`.
pub fn seed_people(conn: &Connection, count: i64) {
    for (index, city) in CITIES.iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO addresses (id, city) VALUES (?1, ?2)",
            params![index as i64 + 1, city],
        )
        .unwrap();
    }
    for n in 1..=count {
        conn.execute(
            "INSERT INTO people (id, name, age, address_id) VALUES (?1, ?2, ?3, ?4)",
            params![n, format!("person-{n:02}"), 20 + n, (n - 1) % 4 + 1],
        )
        .unwrap();
    }
}

pub fn add_pet(conn: &Connection, owner_id: i64, species: &str, name: &str) {
    conn.execute(
        "INSERT INTO pets (owner_id, species, name) VALUES (?1, ?2, ?3)",
        params![owner_id, species, name],
    )
    .unwrap();
}

pub fn person_repo(conn: Connection) -> SqliteReadOnlyRepository<Person, SharedConnectionProvider> {
    SqliteReadOnlyRepository::new(SharedConnectionProvider::new(conn), schema(), "person").unwrap()
}

pub fn seeded_person_repo(
    count: i64,
) -> SqliteReadOnlyRepository<Person, SharedConnectionProvider> {
    let conn = empty_db();
    seed_people(&conn, count);
    person_repo(conn)
}

pub fn ids(people: &[Person]) -> Vec<i64> {
    people.iter().map(|person| person.id).collect()
}

pub fn city_of(person: &Person) -> &'static str {
    let address_id = person.address_id.expect("seeded people have an address");
    CITIES[(address_id - 1) as usize]
}
