use askama::Template;
use axum::response::Html;
use chrono::NaiveDateTime;

use litterlog_db::models::CleanupRow;

use crate::error::AppError;
use crate::session::Flash;

/// Render a template, mapping failures into an `AppError`.
pub fn render<T: Template>(template: T) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub flash: Option<Flash>,
    pub username: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub flash: Option<Flash>,
    pub username: Option<String>,
}

#[derive(Template)]
#[template(path = "cleanups.html")]
pub struct CleanupsPage {
    pub flash: Option<Flash>,
    pub username: Option<String>,
    pub cleanups: Vec<CleanupView>,
}

#[derive(Template)]
#[template(path = "new_cleanup.html")]
pub struct NewCleanupPage {
    pub flash: Option<Flash>,
    pub username: Option<String>,
}

/// One row of the cleanups table, preformatted so the template only
/// prints strings.
pub struct CleanupView {
    pub items: String,
    pub time_range: String,
    pub location: String,
    pub photo_path: Option<String>,
}

impl From<CleanupRow> for CleanupView {
    fn from(row: CleanupRow) -> Self {
        let location = match (row.location_type.as_deref(), &row.ward, row.latitude, row.longitude)
        {
            (Some("ward"), Some(ward), _, _) => ward.clone(),
            (Some("gps"), _, Some(lat), Some(lng)) => format!("{:.6}, {:.6}", lat, lng),
            _ => "–".to_string(),
        };

        Self {
            items: row.items,
            time_range: format_range(&row.start_time, &row.end_time),
            location,
            photo_path: row.photo_path,
        }
    }
}

/// Compact time range: same-day cleanups show the date once.
fn format_range(start: &str, end: &str) -> String {
    match (parse_stored(start), parse_stored(end)) {
        (Some(s), Some(e)) if s.date() == e.date() => {
            format!("{} {} to {}", s.format("%Y-%m-%d"), s.format("%H:%M"), e.format("%H:%M"))
        }
        (Some(s), Some(e)) => {
            format!("{} to {}", s.format("%Y-%m-%d %H:%M"), e.format("%Y-%m-%d %H:%M"))
        }
        // rows predating the format normalization render as stored
        _ => format!("{} to {}", start, end),
    }
}

fn parse_stored(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()
}
