use crate::Database;
use crate::models::{AuthedSession, CleanupRow, NewCleanupRow, SessionRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

/// Outcome of a user insert. Duplicate usernames are reported through the
/// UNIQUE constraint so registration stays a single statement with no
/// check-then-insert race.
#[derive(Debug, PartialEq, Eq)]
pub enum CreateUserOutcome {
    Created,
    UsernameTaken,
}

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<CreateUserOutcome> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password_hash) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            );
            match inserted {
                Ok(_) => Ok(CreateUserOutcome::Created),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(CreateUserOutcome::UsernameTaken)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, user_id: Option<&str>, ttl_hours: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, expires_at)
                 VALUES (?1, ?2, datetime('now', '+' || ?3 || ' hours'))",
                rusqlite::params![id, user_id, ttl_hours],
            )?;
            Ok(())
        })
    }

    /// Any live session row, anonymous or authenticated.
    pub fn find_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| query_session(conn, id))
    }

    /// A live session joined to its user. Anonymous sessions yield None.
    pub fn find_authed_session(&self, id: &str) -> Result<Option<AuthedSession>> {
        self.with_conn(|conn| query_authed_session(conn, id))
    }

    /// Slide the expiry window forward from now.
    pub fn touch_session(&self, id: &str, ttl_hours: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET expires_at = datetime('now', '+' || ?2 || ' hours')
                 WHERE id = ?1",
                rusqlite::params![id, ttl_hours],
            )?;
            Ok(())
        })
    }

    /// Returns false when the session no longer exists or has expired, so
    /// the caller can issue a fresh one.
    pub fn set_flash(&self, session_id: &str, kind: &str, message: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE sessions SET flash_kind = ?2, flash_message = ?3
                 WHERE id = ?1 AND expires_at > datetime('now')",
                rusqlite::params![session_id, kind, message],
            )?;
            Ok(updated > 0)
        })
    }

    /// One-shot read: clears the flash in the same lock scope, so it
    /// renders on exactly one page.
    pub fn take_flash(&self, session_id: &str) -> Result<Option<(String, String)>> {
        self.with_conn(|conn| {
            let flash: Option<(String, String)> = conn
                .query_row(
                    "SELECT flash_kind, flash_message FROM sessions
                     WHERE id = ?1 AND flash_kind IS NOT NULL AND flash_message IS NOT NULL
                       AND expires_at > datetime('now')",
                    [session_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            if flash.is_some() {
                conn.execute(
                    "UPDATE sessions SET flash_kind = NULL, flash_message = NULL WHERE id = ?1",
                    [session_id],
                )?;
            }

            Ok(flash)
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn prune_expired_sessions(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM sessions WHERE expires_at <= datetime('now')",
                [],
            )?;
            Ok(deleted)
        })
    }

    // -- Cleanups --

    pub fn insert_cleanup(&self, row: &NewCleanupRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cleanups
                 (id, user_id, items, location_type, ward, latitude, longitude,
                  start_time, end_time, photo_path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    row.id,
                    row.user_id,
                    row.items,
                    row.location_type,
                    row.ward,
                    row.latitude,
                    row.longitude,
                    row.start_time,
                    row.end_time,
                    row.photo_path,
                ],
            )?;
            Ok(())
        })
    }

    /// All cleanups for one user, most recent start time first.
    pub fn cleanups_for_user(&self, user_id: &str) -> Result<Vec<CleanupRow>> {
        self.with_conn(|conn| query_cleanups_for_user(conn, user_id))
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_session(conn: &Connection, id: &str) -> Result<Option<SessionRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, expires_at FROM sessions
         WHERE id = ?1 AND expires_at > datetime('now')",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(SessionRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                expires_at: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_authed_session(conn: &Connection, id: &str) -> Result<Option<AuthedSession>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, u.id, u.username
         FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.id = ?1 AND s.expires_at > datetime('now')",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(AuthedSession {
                session_id: row.get(0)?,
                user_id: row.get(1)?,
                username: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_cleanups_for_user(conn: &Connection, user_id: &str) -> Result<Vec<CleanupRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, items, location_type, ward, latitude, longitude,
                start_time, end_time, photo_path, created_at
         FROM cleanups
         WHERE user_id = ?1
         ORDER BY start_time DESC",
    )?;

    let rows = stmt
        .query_map([user_id], |row| {
            Ok(CleanupRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                items: row.get(2)?,
                location_type: row.get(3)?,
                ward: row.get(4)?,
                latitude: row.get(5)?,
                longitude: row.get(6)?,
                start_time: row.get(7)?,
                end_time: row.get(8)?,
                photo_path: row.get(9)?,
                created_at: row.get(10)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::models::NewCleanupRow;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, username: &str) -> String {
        let id = format!("user-{}", username);
        let outcome = db.create_user(&id, username, "not-a-real-hash").unwrap();
        assert_eq!(outcome, CreateUserOutcome::Created);
        id
    }

    fn cleanup_row(id: &str, user_id: &str, start: &str, end: &str) -> NewCleanupRow {
        NewCleanupRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            items: "bottles".to_string(),
            location_type: None,
            ward: None,
            latitude: None,
            longitude: None,
            start_time: start.to_string(),
            end_time: end.to_string(),
            photo_path: None,
        }
    }

    #[test]
    fn duplicate_username_reports_conflict() {
        let db = test_db();
        seed_user(&db, "alice");

        let outcome = db.create_user("user-2", "alice", "other-hash").unwrap();
        assert_eq!(outcome, CreateUserOutcome::UsernameTaken);

        // the original row is untouched
        let user = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(user.id, "user-alice");
        assert_eq!(user.password_hash, "not-a-real-hash");
    }

    #[test]
    fn unknown_username_is_none() {
        let db = test_db();
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn session_lookup_ignores_expired_rows() {
        let db = test_db();
        let user_id = seed_user(&db, "alice");
        db.create_session("sess-1", Some(&user_id), 6).unwrap();

        assert!(db.find_session("sess-1").unwrap().is_some());

        db.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET expires_at = datetime('now', '-1 hours') WHERE id = 'sess-1'",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        assert!(db.find_session("sess-1").unwrap().is_none());
        assert!(db.find_authed_session("sess-1").unwrap().is_none());

        assert_eq!(db.prune_expired_sessions().unwrap(), 1);
        assert_eq!(db.prune_expired_sessions().unwrap(), 0);
    }

    #[test]
    fn touch_extends_a_session() {
        let db = test_db();
        db.create_session("sess-1", None, 6).unwrap();

        let before = db.find_session("sess-1").unwrap().unwrap().expires_at;
        db.touch_session("sess-1", 48).unwrap();
        let after = db.find_session("sess-1").unwrap().unwrap().expires_at;

        // both are 'YYYY-MM-DD HH:MM:SS', so string order is time order
        assert!(after > before);
    }

    #[test]
    fn anonymous_session_is_not_authed() {
        let db = test_db();
        db.create_session("sess-anon", None, 6).unwrap();

        assert!(db.find_session("sess-anon").unwrap().is_some());
        assert!(db.find_authed_session("sess-anon").unwrap().is_none());

        let user_id = seed_user(&db, "alice");
        db.create_session("sess-auth", Some(&user_id), 6).unwrap();

        let authed = db.find_authed_session("sess-auth").unwrap().unwrap();
        assert_eq!(authed.user_id, user_id);
        assert_eq!(authed.username, "alice");
        assert_eq!(authed.session_id, "sess-auth");
    }

    #[test]
    fn flash_reads_exactly_once() {
        let db = test_db();
        db.create_session("sess-1", None, 6).unwrap();

        assert!(db.take_flash("sess-1").unwrap().is_none());

        assert!(db.set_flash("sess-1", "success", "Account created. Please log in.").unwrap());
        let (kind, message) = db.take_flash("sess-1").unwrap().unwrap();
        assert_eq!(kind, "success");
        assert_eq!(message, "Account created. Please log in.");

        assert!(db.take_flash("sess-1").unwrap().is_none());
    }

    #[test]
    fn set_flash_on_missing_session_reports_failure() {
        let db = test_db();
        assert!(!db.set_flash("no-such-session", "error", "nope").unwrap());
    }

    #[test]
    fn cleanups_come_back_newest_start_first() {
        let db = test_db();
        let user_id = seed_user(&db, "alice");

        db.insert_cleanup(&cleanup_row("c1", &user_id, "2024-03-01T09:00:00", "2024-03-01T10:00:00"))
            .unwrap();
        db.insert_cleanup(&cleanup_row("c3", &user_id, "2024-03-03T09:00:00", "2024-03-03T10:00:00"))
            .unwrap();
        db.insert_cleanup(&cleanup_row("c2", &user_id, "2024-03-02T09:00:00", "2024-03-02T10:00:00"))
            .unwrap();

        let rows = db.cleanups_for_user(&user_id).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["c3", "c2", "c1"]);
    }

    #[test]
    fn cleanups_are_scoped_to_their_user() {
        let db = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        db.insert_cleanup(&cleanup_row("c1", &alice, "2024-03-01T09:00:00", "2024-03-01T10:00:00"))
            .unwrap();

        assert_eq!(db.cleanups_for_user(&alice).unwrap().len(), 1);
        assert!(db.cleanups_for_user(&bob).unwrap().is_empty());
    }

    #[test]
    fn location_columns_round_trip() {
        let db = test_db();
        let user_id = seed_user(&db, "alice");

        let mut row = cleanup_row("c1", &user_id, "2024-03-01T09:00:00", "2024-03-01T10:00:00");
        row.location_type = Some("gps".to_string());
        row.latitude = Some(35.6895);
        row.longitude = Some(139.6917);
        db.insert_cleanup(&row).unwrap();

        let stored = &db.cleanups_for_user(&user_id).unwrap()[0];
        assert_eq!(stored.location_type.as_deref(), Some("gps"));
        assert_eq!(stored.latitude, Some(35.6895));
        assert_eq!(stored.longitude, Some(139.6917));
        assert!(stored.ward.is_none());
    }

    #[test]
    fn deleting_a_user_cascades() {
        let db = test_db();
        let user_id = seed_user(&db, "alice");
        db.create_session("sess-1", Some(&user_id), 6).unwrap();
        db.insert_cleanup(&cleanup_row("c1", &user_id, "2024-03-01T09:00:00", "2024-03-01T10:00:00"))
            .unwrap();

        db.with_conn(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [&user_id])?;
            Ok(())
        })
        .unwrap();

        assert!(db.find_session("sess-1").unwrap().is_none());
        assert!(db.cleanups_for_user(&user_id).unwrap().is_empty());
    }
}
