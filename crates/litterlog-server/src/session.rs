use std::fmt;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, error, warn};
use uuid::Uuid;

use litterlog_db::models::SessionRow;

use crate::AppState;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "sid";

/// Sessions stay alive this long past the most recent request to a
/// protected route.
pub const SESSION_TTL_HOURS: i64 = 6;

/// Identity attached to the request by `require_session`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub username: String,
    pub session_id: String,
}

/// One-shot notice rendered on the next page and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: FlashKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: FlashKind::Error, message: message.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    fn as_str(self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "error" => FlashKind::Error,
            _ => FlashKind::Success,
        }
    }
}

impl fmt::Display for FlashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn sign(secret: &str, session_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(session_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Cookie value is `<session id>.<hex hmac-sha256 tag>`, keyed to the
/// configured session secret.
fn encode_cookie_value(secret: &str, session_id: &str) -> String {
    format!("{}.{}", session_id, sign(secret, session_id))
}

/// Returns the session id only when the signature verifies. Tampered or
/// truncated values come back as None and are treated as no cookie.
fn decode_cookie_value(secret: &str, value: &str) -> Option<String> {
    let (session_id, tag_hex) = value.split_once('.')?;
    let tag = hex::decode(tag_hex).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(session_id.as_bytes());
    mac.verify_slice(&tag).ok()?;
    Some(session_id.to_string())
}

fn session_id_from_jar(state: &AppState, jar: &CookieJar) -> Option<String> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let id = decode_cookie_value(&state.session_secret, cookie.value());
    if id.is_none() {
        warn!("Session cookie failed its signature check");
    }
    id
}

fn session_cookie(state: &AppState, session_id: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, encode_cookie_value(&state.session_secret, session_id)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(SESSION_TTL_HOURS))
        .build()
}

/// The live session named by the request's cookie, if any.
pub fn current_session(state: &AppState, jar: &CookieJar) -> Result<Option<SessionRow>, AppError> {
    let Some(id) = session_id_from_jar(state, jar) else {
        return Ok(None);
    };
    Ok(state.db.find_session(&id)?)
}

/// Issue a fresh session bound to `user_id`. The session id rotates at
/// login: whatever session the cookie named before (typically an
/// anonymous flash carrier) is deleted, so a pre-auth cookie can never
/// become an authenticated one.
pub fn establish(state: &AppState, jar: CookieJar, user_id: &str) -> Result<CookieJar, AppError> {
    if let Some(old) = session_id_from_jar(state, &jar) {
        state.db.delete_session(&old)?;
    }

    let id = Uuid::new_v4().to_string();
    state.db.create_session(&id, Some(user_id), SESSION_TTL_HOURS)?;
    Ok(jar.add(session_cookie(state, &id)))
}

/// Delete whatever session the cookie names and clear the cookie.
pub fn destroy(state: &AppState, jar: CookieJar) -> Result<CookieJar, AppError> {
    if let Some(id) = session_id_from_jar(state, &jar) {
        state.db.delete_session(&id)?;
    }
    Ok(jar.remove(Cookie::build(SESSION_COOKIE).path("/")))
}

/// Store a one-shot flash, creating an anonymous session when the request
/// carries none (registration errors happen before any login).
pub fn set_flash(state: &AppState, jar: CookieJar, flash: Flash) -> Result<CookieJar, AppError> {
    if let Some(id) = session_id_from_jar(state, &jar) {
        if state.db.set_flash(&id, flash.kind.as_str(), &flash.message)? {
            return Ok(jar);
        }
        // cookie named an expired or deleted row; fall through to a new one
    }

    let id = Uuid::new_v4().to_string();
    state.db.create_session(&id, None, SESSION_TTL_HOURS)?;
    state.db.set_flash(&id, flash.kind.as_str(), &flash.message)?;
    Ok(jar.add(session_cookie(state, &id)))
}

/// Read and clear the pending flash for this request's session.
pub fn take_flash(state: &AppState, jar: &CookieJar) -> Result<Option<Flash>, AppError> {
    let Some(id) = session_id_from_jar(state, jar) else {
        return Ok(None);
    };
    take_flash_for(state, &id)
}

/// Flash read for handlers behind the guard, which already verified the
/// session id.
pub fn take_flash_for(state: &AppState, session_id: &str) -> Result<Option<Flash>, AppError> {
    let Some((kind, message)) = state.db.take_flash(session_id)? else {
        return Ok(None);
    };
    Ok(Some(Flash { kind: FlashKind::parse(&kind), message }))
}

/// Guard for routes that need a logged-in user. A valid session attaches
/// a `CurrentUser` extension and slides the expiry window forward;
/// anything else redirects to the login form.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, Redirect> {
    let Some(id) = session_id_from_jar(&state, &jar) else {
        return Err(Redirect::to("/login"));
    };

    let authed = state.db.find_authed_session(&id).map_err(|e| {
        error!("Session lookup failed: {}", e);
        Redirect::to("/login")
    })?;

    let Some(authed) = authed else {
        debug!("Session {} is unknown, expired, or anonymous", id);
        return Err(Redirect::to("/login"));
    };

    if let Err(e) = state.db.touch_session(&id, SESSION_TTL_HOURS) {
        warn!("Could not refresh session expiry: {}", e);
    }

    req.extensions_mut().insert(CurrentUser {
        user_id: authed.user_id,
        username: authed.username,
        session_id: authed.session_id,
    });

    Ok(next.run(req).await)
}
