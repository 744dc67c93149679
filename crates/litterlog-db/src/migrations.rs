use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            password_hash   TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- user_id is NULL for anonymous sessions that only carry a flash
        CREATE TABLE IF NOT EXISTS sessions (
            id              TEXT PRIMARY KEY,
            user_id         TEXT REFERENCES users(id) ON DELETE CASCADE,
            flash_kind      TEXT,
            flash_message   TEXT,
            expires_at      TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_expires
            ON sessions(expires_at);

        CREATE TABLE IF NOT EXISTS cleanups (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            items           TEXT NOT NULL,
            location_type   TEXT,
            ward            TEXT,
            latitude        REAL,
            longitude       REAL,
            start_time      TEXT NOT NULL,
            end_time        TEXT NOT NULL,
            photo_path      TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_cleanups_user_start
            ON cleanups(user_id, start_time);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
