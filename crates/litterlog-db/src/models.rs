/// Database row types; these map directly to SQLite rows.
/// Form parsing and display formatting live in the server crate.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: Option<String>,
    pub expires_at: String,
}

/// A live session joined to the user it belongs to. Anonymous sessions
/// never produce one of these.
pub struct AuthedSession {
    pub session_id: String,
    pub user_id: String,
    pub username: String,
}

pub struct CleanupRow {
    pub id: String,
    pub user_id: String,
    pub items: String,
    pub location_type: Option<String>,
    pub ward: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub start_time: String,
    pub end_time: String,
    pub photo_path: Option<String>,
    pub created_at: String,
}

/// Insert payload for a cleanup. Timestamps arrive already normalized to
/// `YYYY-MM-DDTHH:MM:SS` so ordering by start_time as text is
/// chronological.
pub struct NewCleanupRow {
    pub id: String,
    pub user_id: String,
    pub items: String,
    pub location_type: Option<String>,
    pub ward: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub start_time: String,
    pub end_time: String,
    pub photo_path: Option<String>,
}
