//! Post model with embedded likes and comments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserSummary;

pub const MAX_POST_LENGTH: usize = 2000;
pub const MAX_COMMENT_LENGTH: usize = 500;

/// Post entity; likes and comments are embedded documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub likes: Vec<Uuid>,
    pub comments: Vec<Comment>,
    pub visibility: Visibility,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.likes.contains(&user_id)
    }

    /// Add or remove a like; returns true when the post is liked afterwards
    pub fn toggle_like(&mut self, user_id: Uuid) -> bool {
        if let Some(pos) = self.likes.iter().position(|id| *id == user_id) {
            self.likes.remove(pos);
            false
        } else {
            self.likes.push(user_id);
            true
        }
    }

    pub fn add_comment(&mut self, user_id: Uuid, text: String, now: DateTime<Utc>) -> &Comment {
        self.comments.push(Comment {
            user_id,
            text,
            created_at: now,
        });
        self.comments.last().expect("comment was just pushed")
    }
}

/// Embedded comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Post visibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Friends,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Friends => "friends",
            Visibility::Private => "private",
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "friends" => Ok(Visibility::Friends),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility: {}", other)),
        }
    }
}

/// Post joined with its author's public profile
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
    pub like_count: usize,
    pub comment_count: usize,
}

impl PostView {
    pub fn new(post: Post, author: UserSummary) -> Self {
        let like_count = post.like_count();
        let comment_count = post.comment_count();
        Self {
            post,
            author,
            like_count,
            comment_count,
        }
    }
}

/// Request to create a post
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

/// Request to comment on a post
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            content: "hello".to_string(),
            image_url: None,
            likes: vec![],
            comments: vec![],
            visibility: Visibility::Public,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_toggle_like_round_trip() {
        let mut post = post();
        let user = Uuid::new_v4();

        assert!(post.toggle_like(user));
        assert!(post.is_liked_by(user));
        assert_eq!(post.like_count(), 1);

        assert!(!post.toggle_like(user));
        assert!(!post.is_liked_by(user));
        assert_eq!(post.like_count(), 0);
    }

    #[test]
    fn test_add_comment_appends_in_order() {
        let mut post = post();
        let user = Uuid::new_v4();
        let now = Utc::now();

        post.add_comment(user, "first".to_string(), now);
        post.add_comment(user, "second".to_string(), now);

        assert_eq!(post.comment_count(), 2);
        assert_eq!(post.comments[0].text, "first");
        assert_eq!(post.comments[1].text, "second");
    }

    #[test]
    fn test_visibility_round_trips_through_text() {
        for v in [Visibility::Public, Visibility::Friends, Visibility::Private] {
            assert_eq!(v.as_str().parse::<Visibility>().unwrap(), v);
        }
        assert!("hidden".parse::<Visibility>().is_err());
    }
}
