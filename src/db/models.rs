use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Public view of a user, safe to return to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub user_agent: Option<String>,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub cover_image: Option<String>,
    pub likes: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A post as returned to clients: author resolved to a public reference,
/// annotated with the viewer's like/save state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub author: PostAuthor,
    pub tags: Vec<String>,
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub likes: i64,
    pub is_liked: bool,
    pub is_saved: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostAuthor {
    pub id: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_status_round_trips() {
        assert_eq!(PostStatus::parse("draft"), Some(PostStatus::Draft));
        assert_eq!(PostStatus::parse("published"), Some(PostStatus::Published));
        assert_eq!(PostStatus::parse("archived"), None);
        assert_eq!(PostStatus::Draft.as_str(), "draft");
    }

    #[test]
    fn user_profile_omits_password_hash() {
        let user = User {
            id: "u1".into(),
            username: "alice".into(),
            email: "a@x.com".into(),
            password_hash: "secret-hash".into(),
            created_at: "2024-01-01 00:00:00".into(),
            updated_at: "2024-01-01 00:00:00".into(),
        };
        let json = serde_json::to_string(&UserProfile::from(&user)).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("alice"));
    }

    #[test]
    fn post_view_serializes_camel_case() {
        let view = PostView {
            id: "p1".into(),
            title: "Hi".into(),
            content: "**bold**".into(),
            content_html: "<p><strong>bold</strong></p>".into(),
            author: PostAuthor {
                id: "u1".into(),
                email: "a@x.com".into(),
            },
            tags: vec![],
            status: PostStatus::Draft,
            cover_image: None,
            likes: 0,
            is_liked: false,
            is_saved: false,
            created_at: "2024-01-01 00:00:00".into(),
            updated_at: "2024-01-01 00:00:00".into(),
        };
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("contentHtml"));
        assert!(json.contains("isLiked"));
        assert!(json.contains("\"status\":\"draft\""));
        // Absent cover image is omitted entirely
        assert!(!json.contains("coverImage"));
    }
}
