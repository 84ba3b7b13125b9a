use chrono::{Duration, Utc};
use rusqlite::params;

use crate::db::models::Session;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// SQLite datetime format, comparable with datetime('now').
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Create a new session for a user. Every successful login or registration
/// gets its own row, so one user can hold multiple concurrent sessions.
pub fn create_session(
    pool: &DbPool,
    user_id: &str,
    user_agent: Option<&str>,
    days: u64,
) -> AppResult<Session> {
    let conn = pool.get()?;

    let id = uuid::Uuid::now_v7().to_string();
    let created_at = Utc::now().format(DATETIME_FORMAT).to_string();
    let expires_at = (Utc::now() + Duration::days(days as i64))
        .format(DATETIME_FORMAT)
        .to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, user_agent, created_at, expires_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, user_id, user_agent, created_at, expires_at],
    )?;

    Ok(Session {
        id,
        user_id: user_id.to_string(),
        user_agent: user_agent.map(str::to_string),
        created_at,
        expires_at,
    })
}

/// Look up a session that has not yet expired.
pub fn get_active_session(pool: &DbPool, session_id: &str) -> AppResult<Session> {
    let conn = pool.get()?;

    conn.query_row(
        "SELECT id, user_id, user_agent, created_at, expires_at FROM sessions \
         WHERE id = ?1 AND expires_at > datetime('now')",
        params![session_id],
        |row| {
            Ok(Session {
                id: row.get(0)?,
                user_id: row.get(1)?,
                user_agent: row.get(2)?,
                created_at: row.get(3)?,
                expires_at: row.get(4)?,
            })
        },
    )
    .map_err(|_| AppError::Unauthorized)
}

/// Delete a session by id (logout).
pub fn delete_session(pool: &DbPool, session_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
    Ok(())
}

/// Number of sessions currently held by a user.
pub fn count_sessions(pool: &DbPool, user_id: &str) -> AppResult<i64> {
    let conn = pool.get()?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn seed_user(pool: &DbPool, id: &str) {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?1, ?1 || '@x.com', 'h')",
            params![id],
        )
        .unwrap();
    }

    #[test]
    fn create_and_fetch_session() {
        let pool = test_pool();
        seed_user(&pool, "u1");

        let session = create_session(&pool, "u1", Some("test-agent"), 30).unwrap();
        let fetched = get_active_session(&pool, &session.id).unwrap();
        assert_eq!(fetched.user_id, "u1");
        assert_eq!(fetched.user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn expired_session_is_not_active() {
        let pool = test_pool();
        seed_user(&pool, "u1");

        let session = create_session(&pool, "u1", None, 30).unwrap();
        let conn = pool.get().unwrap();
        conn.execute(
            "UPDATE sessions SET expires_at = datetime('now', '-1 hour') WHERE id = ?1",
            params![session.id],
        )
        .unwrap();
        drop(conn);

        assert!(get_active_session(&pool, &session.id).is_err());
    }

    #[test]
    fn user_can_hold_multiple_sessions() {
        let pool = test_pool();
        seed_user(&pool, "u1");

        create_session(&pool, "u1", Some("phone"), 30).unwrap();
        create_session(&pool, "u1", Some("laptop"), 30).unwrap();
        assert_eq!(count_sessions(&pool, "u1").unwrap(), 2);
    }

    #[test]
    fn delete_session_removes_it() {
        let pool = test_pool();
        seed_user(&pool, "u1");

        let session = create_session(&pool, "u1", None, 30).unwrap();
        delete_session(&pool, &session.id).unwrap();
        assert!(get_active_session(&pool, &session.id).is_err());
    }
}
