// Copyright 2023 Remi Bernotavicius

use diesel::prelude::Connection as _;
use diesel::r2d2::{ConnectionManager, CustomizeConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::error::Error;
use std::path::Path;

pub mod models;
pub mod schema;

pub type Connection = diesel::sqlite::SqliteConnection;
pub type Pool = diesel::r2d2::Pool<ConnectionManager<Connection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// SQLite keeps foreign-key enforcement off per connection unless asked;
/// the schema's cascades depend on it.
#[derive(Debug, Clone, Copy)]
struct ForeignKeysOn;

impl CustomizeConnection<Connection, diesel::r2d2::Error> for ForeignKeysOn {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), diesel::r2d2::Error> {
        use diesel::RunQueryDsl as _;

        diesel::sql_query("PRAGMA foreign_keys = ON")
            .execute(conn)
            .map(|_| ())
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn establish_pool(
    path: impl AsRef<Path>,
) -> Result<Pool, Box<dyn Error + Send + Sync + 'static>> {
    let database_url = path.as_ref().to_str().unwrap();

    let mut connection = Connection::establish(database_url)?;
    connection.run_pending_migrations(MIGRATIONS)?;

    let pool = diesel::r2d2::Pool::builder()
        .connection_customizer(Box::new(ForeignKeysOn))
        .build(ConnectionManager::new(database_url))?;
    Ok(pool)
}

#[cfg(test)]
pub fn test_connection() -> Connection {
    use diesel::RunQueryDsl as _;

    let mut conn = Connection::establish(":memory:").unwrap();
    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut conn)
        .unwrap();
    conn.run_pending_migrations(MIGRATIONS).unwrap();
    conn
}

#[test]
fn migrations() {
    let mut conn = Connection::establish(":memory:").unwrap();

    let applied: Vec<_> = conn
        .run_pending_migrations(MIGRATIONS)
        .unwrap()
        .iter()
        .map(|v| v.as_owned())
        .collect();
    assert!(!applied.is_empty());

    conn.revert_all_migrations(MIGRATIONS).unwrap();
    let reapplied = conn.run_pending_migrations(MIGRATIONS).unwrap();
    assert_eq!(applied.len(), reapplied.len());
}
