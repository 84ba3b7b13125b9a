//! Post persistence: CRUD, like/save toggles, and saved-post listing.
//!
//! All operations are read-modify-write sequences against single rows; the
//! like counter is a denormalized cache of the post_likes set, recomputed
//! inside the same transaction as the toggle so it can never drift.

use rusqlite::{params, Connection};

use crate::db::models::{PostAuthor, PostStatus, PostView};
use crate::error::{AppError, AppResult, FieldError};
use crate::markdown;
use crate::state::DbPool;

/// Soft ceiling for data-URI cover images.
const MAX_COVER_IMAGE_BYTES: usize = 2 * 1024 * 1024;

pub struct NewPost {
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub cover_image: Option<String>,
}

/// Partial update: every None leaves the stored field unchanged.
#[derive(Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub cover_image: Option<String>,
}

pub struct LikeOutcome {
    pub liked: bool,
    pub likes: i64,
}

pub fn create_post(pool: &DbPool, author_id: &str, new_post: NewPost) -> AppResult<PostView> {
    validate_new_post(&new_post)?;

    let id = uuid::Uuid::now_v7().to_string();
    let title = new_post.title.trim().to_string();
    let content_html = markdown::render(&new_post.content);
    let tags = serde_json::to_string(&trimmed_tags(new_post.tags.unwrap_or_default()))?;
    let status = new_post.status.unwrap_or(PostStatus::Draft);

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO posts (id, author_id, title, content, content_html, tags, status, cover_image) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            author_id,
            title,
            new_post.content,
            content_html,
            tags,
            status.as_str(),
            new_post.cover_image
        ],
    )?;

    query_post(&conn, &id, Some(author_id))?.ok_or_else(not_found)
}

/// All posts, newest first, annotated with the viewer's like/save state.
/// Both flags are false for anonymous reads.
pub fn list_posts(pool: &DbPool, viewer_id: Option<&str>) -> AppResult<Vec<PostView>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY p.created_at DESC, p.id DESC",
        SELECT_POST
    ))?;

    let rows = stmt.query_map(params![viewer_id], map_post_row)?;
    let mut posts = Vec::new();
    for row in rows {
        posts.push(row?);
    }
    Ok(posts)
}

pub fn get_post(pool: &DbPool, post_id: &str, viewer_id: Option<&str>) -> AppResult<PostView> {
    let conn = pool.get()?;
    query_post(&conn, post_id, viewer_id)?.ok_or_else(not_found)
}

pub fn update_post(
    pool: &DbPool,
    user_id: &str,
    post_id: &str,
    patch: PostPatch,
) -> AppResult<PostView> {
    validate_patch(&patch)?;

    let mut conn = pool.get()?;

    // The patch is applied field by field; the transaction keeps a
    // mid-sequence failure from leaving a half-applied post.
    let tx = conn.transaction()?;
    require_author(&tx, post_id, user_id, "update")?;

    let mut changed = false;
    if let Some(title) = &patch.title {
        tx.execute(
            "UPDATE posts SET title = ?2 WHERE id = ?1",
            params![post_id, title.trim()],
        )?;
        changed = true;
    }
    if let Some(content) = &patch.content {
        // contentHtml is derived; re-render in the same update so the cache
        // is never stale.
        let content_html = markdown::render(content);
        tx.execute(
            "UPDATE posts SET content = ?2, content_html = ?3 WHERE id = ?1",
            params![post_id, content, content_html],
        )?;
        changed = true;
    }
    if let Some(tags) = patch.tags {
        let tags = serde_json::to_string(&trimmed_tags(tags))?;
        tx.execute(
            "UPDATE posts SET tags = ?2 WHERE id = ?1",
            params![post_id, tags],
        )?;
        changed = true;
    }
    if let Some(status) = patch.status {
        tx.execute(
            "UPDATE posts SET status = ?2 WHERE id = ?1",
            params![post_id, status.as_str()],
        )?;
        changed = true;
    }
    if let Some(cover_image) = &patch.cover_image {
        tx.execute(
            "UPDATE posts SET cover_image = ?2 WHERE id = ?1",
            params![post_id, cover_image],
        )?;
        changed = true;
    }

    if changed {
        tx.execute(
            "UPDATE posts SET updated_at = datetime('now') WHERE id = ?1",
            params![post_id],
        )?;
    }
    tx.commit()?;

    query_post(&conn, post_id, Some(user_id))?.ok_or_else(not_found)
}

/// Hard delete. Likes cascade with the row; saved references in other users'
/// lists are deliberately left behind (known gap, see the schema).
pub fn delete_post(pool: &DbPool, user_id: &str, post_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    require_author(&conn, post_id, user_id, "delete")?;
    conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
    Ok(())
}

/// Idempotent like toggle. The likes column is recomputed from the set after
/// the mutation, never incremented, so the counter and the set cannot drift.
pub fn toggle_like(pool: &DbPool, user_id: &str, post_id: &str) -> AppResult<LikeOutcome> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    if !post_exists(&tx, post_id)? {
        return Err(not_found());
    }

    let currently_liked: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM post_likes WHERE post_id = ?1 AND user_id = ?2)",
        params![post_id, user_id],
        |row| row.get(0),
    )?;

    if currently_liked {
        tx.execute(
            "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
        )?;
    } else {
        tx.execute(
            "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
            params![post_id, user_id],
        )?;
    }

    tx.execute(
        "UPDATE posts SET likes = (SELECT COUNT(*) FROM post_likes WHERE post_id = ?1) \
         WHERE id = ?1",
        params![post_id],
    )?;
    let likes: i64 = tx.query_row(
        "SELECT likes FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;

    tx.commit()?;

    Ok(LikeOutcome {
        liked: !currently_liked,
        likes,
    })
}

/// Symmetric toggle against the user's saved set. Validates post existence
/// first. Returns the new saved state.
pub fn toggle_save(pool: &DbPool, user_id: &str, post_id: &str) -> AppResult<bool> {
    let conn = pool.get()?;

    if !post_exists(&conn, post_id)? {
        return Err(not_found());
    }

    let currently_saved: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM saved_posts WHERE user_id = ?1 AND post_id = ?2)",
        params![user_id, post_id],
        |row| row.get(0),
    )?;

    if currently_saved {
        conn.execute(
            "DELETE FROM saved_posts WHERE user_id = ?1 AND post_id = ?2",
            params![user_id, post_id],
        )?;
    } else {
        conn.execute(
            "INSERT INTO saved_posts (user_id, post_id) VALUES (?1, ?2)",
            params![user_id, post_id],
        )?;
    }

    Ok(!currently_saved)
}

/// The viewer's saved posts, fully annotated. Saved ids whose post has been
/// deleted resolve to nothing and are skipped.
pub fn list_saved(pool: &DbPool, user_id: &str) -> AppResult<Vec<PostView>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "{} JOIN saved_posts sp ON sp.post_id = p.id AND sp.user_id = ?1 \
         ORDER BY sp.created_at DESC",
        SELECT_POST
    ))?;

    let rows = stmt.query_map(params![user_id], map_post_row)?;
    let mut posts = Vec::new();
    for row in rows {
        posts.push(row?);
    }
    Ok(posts)
}

// -- Row mapping --

const SELECT_POST: &str = "SELECT p.id, p.title, p.content, p.content_html, p.tags, p.status, \
     p.cover_image, p.likes, p.created_at, p.updated_at, u.id, u.email, \
     EXISTS(SELECT 1 FROM post_likes pl WHERE pl.post_id = p.id AND pl.user_id = ?1), \
     EXISTS(SELECT 1 FROM saved_posts s2 WHERE s2.post_id = p.id AND s2.user_id = ?1) \
     FROM posts p JOIN users u ON u.id = p.author_id";

fn query_post(
    conn: &Connection,
    post_id: &str,
    viewer_id: Option<&str>,
) -> AppResult<Option<PostView>> {
    let mut stmt = conn.prepare(&format!("{} WHERE p.id = ?2", SELECT_POST))?;
    let result = stmt.query_row(params![viewer_id, post_id], map_post_row);
    match result {
        Ok(post) => Ok(Some(post)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn map_post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostView> {
    let tags_json: String = row.get(4)?;
    let status_str: String = row.get(5)?;

    Ok(PostView {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        content_html: row.get(3)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        status: PostStatus::parse(&status_str).unwrap_or(PostStatus::Draft),
        cover_image: row.get(6)?,
        likes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        author: PostAuthor {
            id: row.get(10)?,
            email: row.get(11)?,
        },
        is_liked: row.get(12)?,
        is_saved: row.get(13)?,
    })
}

// -- Helpers --

fn not_found() -> AppError {
    AppError::NotFound("Post not found".into())
}

fn post_exists(conn: &Connection, post_id: &str) -> AppResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// NotFound before Forbidden: absence of the post is reported first, then
/// ownership is enforced. Authorship is immutable after creation.
fn require_author(conn: &Connection, post_id: &str, user_id: &str, action: &str) -> AppResult<()> {
    let result: Result<String, rusqlite::Error> = conn.query_row(
        "SELECT author_id FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    );
    let author_id = match result {
        Ok(author_id) => author_id,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    if author_id != user_id {
        return Err(AppError::Forbidden(format!(
            "You are not authorized to {} this post",
            action
        )));
    }
    Ok(())
}

fn trimmed_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn validate_title(title: &str, errors: &mut Vec<FieldError>) {
    let title = title.trim();
    if title.is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    } else if title.len() > 200 {
        errors.push(FieldError::new(
            "title",
            "Title must be 200 characters or less",
        ));
    }
}

fn validate_cover_image(cover_image: &str, errors: &mut Vec<FieldError>) {
    if !cover_image.starts_with("data:image/") {
        errors.push(FieldError::new(
            "coverImage",
            "Cover image must be a data-URI image string",
        ));
    } else if cover_image.len() > MAX_COVER_IMAGE_BYTES {
        errors.push(FieldError::new("coverImage", "Cover image is too large"));
    }
}

fn validate_new_post(new_post: &NewPost) -> AppResult<()> {
    let mut errors = Vec::new();
    validate_title(&new_post.title, &mut errors);
    if new_post.content.trim().is_empty() {
        errors.push(FieldError::new("content", "Content is required"));
    }
    if let Some(cover_image) = &new_post.cover_image {
        validate_cover_image(cover_image, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn validate_patch(patch: &PostPatch) -> AppResult<()> {
    let mut errors = Vec::new();
    if let Some(title) = &patch.title {
        validate_title(title, &mut errors);
    }
    if let Some(content) = &patch.content {
        if content.trim().is_empty() {
            errors.push(FieldError::new("content", "Content is required"));
        }
    }
    if let Some(cover_image) = &patch.cover_image {
        validate_cover_image(cover_image, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}
