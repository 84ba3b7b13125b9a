//! Registration and login orchestration: uniqueness checks, password
//! hashing, session creation, and token issuance.

use rusqlite::params;

use crate::auth::token::TokenService;
use crate::auth::{password, session};
use crate::db::models::User;
use crate::error::{AppError, AppResult, FieldError};
use crate::state::DbPool;

pub struct RegisterParams {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub user_agent: Option<String>,
}

pub struct LoginParams {
    pub email: String,
    pub password: String,
    pub user_agent: Option<String>,
}

/// Outcome of a successful registration or login.
#[derive(Debug)]
pub struct AuthOutcome {
    pub user: User,
    pub session_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn register(
    pool: &DbPool,
    tokens: &TokenService,
    refresh_days: u64,
    params: RegisterParams,
) -> AppResult<AuthOutcome> {
    validate_register(&params)?;

    let email = params.email.trim().to_lowercase();
    let username = params.username.trim().to_string();

    {
        let conn = pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        if exists {
            return Err(AppError::Conflict("User already exists".into()));
        }
    }

    let password_hash = password::hash(&params.password)?;
    let user_id = uuid::Uuid::now_v7().to_string();

    {
        let conn = pool.get()?;
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, username, email, password_hash],
        )?;
    }
    let user = fetch_user(pool, &user_id)?;

    issue_for_user(pool, tokens, refresh_days, user, params.user_agent.as_deref())
}

pub fn login(
    pool: &DbPool,
    tokens: &TokenService,
    refresh_days: u64,
    params: LoginParams,
) -> AppResult<AuthOutcome> {
    let email = params.email.trim().to_lowercase();

    // Unknown email and wrong password fail identically; the uniform
    // Unauthorized message prevents user enumeration.
    let user = find_user_by_email(pool, &email)?.ok_or(AppError::Unauthorized)?;

    if !password::verify(&params.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    issue_for_user(pool, tokens, refresh_days, user, params.user_agent.as_deref())
}

/// Exchange a refresh token for a fresh access token. The refresh token
/// carries only a session id; identity is resolved through the session store,
/// which also enforces session expiry.
pub fn refresh(pool: &DbPool, tokens: &TokenService, refresh_token: &str) -> AppResult<String> {
    let claims = tokens.verify_refresh(refresh_token)?;
    let session = session::get_active_session(pool, &claims.session_id)?;
    tokens.issue_access(&session.user_id, &session.id)
}

/// End a session (logout).
pub fn logout(pool: &DbPool, session_id: &str) -> AppResult<()> {
    session::delete_session(pool, session_id)
}

pub fn fetch_user(pool: &DbPool, user_id: &str) -> AppResult<User> {
    let conn = pool.get()?;
    let result = conn.query_row(
        "SELECT id, username, email, password_hash, created_at, updated_at \
         FROM users WHERE id = ?1",
        params![user_id],
        map_user_row,
    );
    match result {
        Ok(user) => Ok(user),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(AppError::NotFound("User not found".into()))
        }
        Err(e) => Err(e.into()),
    }
}

fn find_user_by_email(pool: &DbPool, email: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let result = conn.query_row(
        "SELECT id, username, email, password_hash, created_at, updated_at \
         FROM users WHERE email = ?1",
        params![email],
        map_user_row,
    );
    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn issue_for_user(
    pool: &DbPool,
    tokens: &TokenService,
    refresh_days: u64,
    user: User,
    user_agent: Option<&str>,
) -> AppResult<AuthOutcome> {
    let session = session::create_session(pool, &user.id, user_agent, refresh_days)?;
    let access_token = tokens.issue_access(&user.id, &session.id)?;
    let refresh_token = tokens.issue_refresh(&session.id)?;

    Ok(AuthOutcome {
        user,
        session_id: session.id,
        access_token,
        refresh_token,
    })
}

// -- Validation --

fn validate_register(params: &RegisterParams) -> AppResult<()> {
    let mut errors = Vec::new();

    let email = params.email.trim();
    if email.is_empty() || email.len() > 255 || !is_valid_email(email) {
        errors.push(FieldError::new("email", "Invalid email address"));
    }

    let username = params.username.trim();
    if username.len() < 3 || username.len() > 30 {
        errors.push(FieldError::new(
            "username",
            "Username must be between 3 and 30 characters",
        ));
    }

    if params.password.len() < 8 || params.password.len() > 255 {
        errors.push(FieldError::new(
            "password",
            "Password must be between 8 and 255 characters",
        ));
    }

    // Re-checked here even though the handler validates first
    if params.password != params.confirm_password {
        errors.push(FieldError::new("confirmPassword", "Passwords do not match"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}
