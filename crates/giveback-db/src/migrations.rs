use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);",
    )?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // event_responses.event_id has no foreign key: responses outlive
        // their event until a cascade deletes them.
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE requests (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL,
                contact     TEXT NOT NULL,
                description TEXT NOT NULL,
                color       TEXT NOT NULL,
                size        TEXT NOT NULL,
                images      TEXT NOT NULL DEFAULT '[]',
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_requests_created ON requests(created_at);
            CREATE INDEX idx_requests_author ON requests(author_id);

            CREATE TABLE events (
                id              TEXT PRIMARY KEY,
                coordinator_id  TEXT NOT NULL,
                description     TEXT NOT NULL,
                location        TEXT NOT NULL,
                start_date      TEXT NOT NULL,
                end_date        TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_events_created ON events(created_at);

            CREATE TABLE event_responses (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL,
                event_id    TEXT NOT NULL,
                contact     TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_event_responses_event ON event_responses(event_id, created_at);
            CREATE INDEX idx_event_responses_author ON event_responses(author_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
