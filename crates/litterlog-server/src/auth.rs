use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};
use uuid::Uuid;

use litterlog_db::queries::CreateUserOutcome;

use crate::AppState;
use crate::error::AppError;
use crate::forms::{LoginForm, RegisterForm};
use crate::session::{self, Flash};
use crate::views::{self, LoginPage, RegisterPage};

/// GET / lands on the cleanups list when the session is authenticated,
/// the login form otherwise.
pub async fn root(State(state): State<AppState>, jar: CookieJar) -> Result<Redirect, AppError> {
    let logged_in = match session::current_session(&state, &jar)? {
        Some(s) => s.user_id.is_some(),
        None => false,
    };

    if logged_in {
        Ok(Redirect::to("/cleanups"))
    } else {
        Ok(Redirect::to("/login"))
    }
}

pub async fn register_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let flash = session::take_flash(&state, &jar)?;
    views::render(RegisterPage { flash, username: None })
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<impl IntoResponse, AppError> {
    if form.username.is_empty() || form.password.is_empty() {
        let flash = Flash::error("Username and password are required.");
        let jar = session::set_flash(&state, jar, flash)?;
        return Ok((jar, Redirect::to("/register")));
    }

    // Argon2id with a per-user salt
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(form.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4().to_string();
    match state.db.create_user(&user_id, &form.username, &password_hash)? {
        CreateUserOutcome::Created => {
            info!("Registered user {}", form.username);
            let flash = Flash::success("Account created. Please log in.");
            let jar = session::set_flash(&state, jar, flash)?;
            Ok((jar, Redirect::to("/login")))
        }
        CreateUserOutcome::UsernameTaken => {
            let flash = Flash::error("Username already exists. Choose another.");
            let jar = session::set_flash(&state, jar, flash)?;
            Ok((jar, Redirect::to("/register")))
        }
    }
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let flash = session::take_flash(&state, &jar)?;
    views::render(LoginPage { flash, username: None })
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(user) = state.db.get_user_by_username(&form.username)? {
        let verified = PasswordHash::new(&user.password_hash)
            .map(|hash| {
                Argon2::default().verify_password(form.password.as_bytes(), &hash).is_ok()
            })
            .unwrap_or_else(|e| {
                warn!("Stored hash for {} does not parse: {}", user.username, e);
                false
            });

        if verified {
            let jar = session::establish(&state, jar, &user.id)?;
            info!("User {} logged in", user.username);
            return Ok((jar, Redirect::to("/cleanups")));
        }
    }

    // identical flash for unknown user and wrong password
    let flash = Flash::error("Invalid username or password.");
    let jar = session::set_flash(&state, jar, flash)?;
    Ok((jar, Redirect::to("/login")))
}

/// POST /logout destroys whatever session the cookie names. It stays on
/// the public router so an expired session can still log out cleanly.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let jar = session::destroy(&state, jar)?;
    Ok((jar, Redirect::to("/login")))
}
