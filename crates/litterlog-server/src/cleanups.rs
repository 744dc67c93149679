use axum::{
    Extension,
    extract::{Multipart, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;
use uuid::Uuid;

use litterlog_db::models::NewCleanupRow;

use crate::AppState;
use crate::error::AppError;
use crate::forms::CleanupForm;
use crate::session::{self, CurrentUser, Flash};
use crate::views::{self, CleanupView, CleanupsPage, NewCleanupPage};

/// Storage format for timestamps; sorts chronologically as text.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// GET /cleanups
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let flash = session::take_flash_for(&state, &user.session_id)?;
    let cleanups = state
        .db
        .cleanups_for_user(&user.user_id)?
        .into_iter()
        .map(CleanupView::from)
        .collect();

    views::render(CleanupsPage { flash, username: Some(user.username), cleanups })
}

/// GET /cleanups/new
pub async fn new_form(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let flash = session::take_flash_for(&state, &user.session_id)?;
    views::render(NewCleanupPage { flash, username: Some(user.username) })
}

/// POST /cleanups. The body is multipart: text fields plus at most one
/// photo. Validation failures bounce back to the form with an error
/// flash; nothing is written in that case.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = CleanupForm::from_multipart(multipart).await?;

    let (cleanup, photo) = match form.validate() {
        Ok(parts) => parts,
        Err(e) => {
            let jar = session::set_flash(&state, jar, Flash::error(e.to_string()))?;
            return Ok((jar, Redirect::to("/cleanups/new")));
        }
    };

    let photo_path = match photo {
        Some(photo) => {
            Some(state.photos.save(photo.original_name.as_deref(), &photo.data).await?)
        }
        None => None,
    };

    let (location_type, ward, latitude, longitude) = cleanup.location.into_columns();
    let row = NewCleanupRow {
        id: Uuid::new_v4().to_string(),
        user_id: user.user_id,
        items: cleanup.items,
        location_type,
        ward,
        latitude,
        longitude,
        start_time: cleanup.start_time.format(TIME_FORMAT).to_string(),
        end_time: cleanup.end_time.format(TIME_FORMAT).to_string(),
        photo_path,
    };
    state.db.insert_cleanup(&row)?;

    info!("User {} logged cleanup {}", user.username, row.id);
    let jar = session::set_flash(&state, jar, Flash::success("Cleanup logged successfully!"))?;
    Ok((jar, Redirect::to("/cleanups")))
}
