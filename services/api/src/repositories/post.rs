//! Post repository for database operations

use anyhow::Result;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::post::{Post, PostView, Visibility};

const POST_COLUMNS: &str = "id, author_id, content, image_url, likes, comments, visibility, \
                            is_active, created_at, updated_at";

/// Post repository for database operations
#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    /// Create a new post repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new post
    pub async fn create(
        &self,
        author_id: Uuid,
        content: &str,
        image_url: Option<&str>,
        visibility: Visibility,
    ) -> Result<Post> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO posts (author_id, content, image_url, visibility)
            VALUES ($1, $2, $3, $4)
            RETURNING {POST_COLUMNS}
            "#,
        ))
        .bind(author_id)
        .bind(content)
        .bind(image_url)
        .bind(visibility.as_str())
        .fetch_one(&self.pool)
        .await?;

        map_post(&row)
    }

    /// Find an active post by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE id = $1 AND is_active = TRUE
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_post).transpose()
    }

    /// Public posts by active authors, newest first
    pub async fn public_feed(&self, limit: i64, offset: i64) -> Result<(Vec<PostView>, i64)> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT p.id, p.author_id, p.content, p.image_url, p.likes, p.comments,
                   p.visibility, p.is_active, p.created_at, p.updated_at,
                   u.id AS user_id, u.profile
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.is_active = TRUE AND p.visibility = 'public' AND u.is_active = TRUE
            ORDER BY p.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.is_active = TRUE AND p.visibility = 'public' AND u.is_active = TRUE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let views = rows.iter().map(map_post_view).collect::<Result<Vec<_>>>()?;
        Ok((views, total))
    }

    /// A user's own active posts, newest first
    pub async fn by_author(
        &self,
        author_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PostView>, i64)> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT p.id, p.author_id, p.content, p.image_url, p.likes, p.comments,
                   p.visibility, p.is_active, p.created_at, p.updated_at,
                   u.id AS user_id, u.profile
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.author_id = $1 AND p.is_active = TRUE
            ORDER BY p.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM posts
            WHERE author_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        let views = rows.iter().map(map_post_view).collect::<Result<Vec<_>>>()?;
        Ok((views, total))
    }

    /// Toggle a user's membership in a post's like set. Returns the
    /// updated post and whether it is now liked, or None for an unknown
    /// or inactive post.
    pub async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<(Post, bool)>> {
        let Some(mut post) = self.find_by_id(post_id).await? else {
            return Ok(None);
        };

        let liked = post.toggle_like(user_id);
        sqlx::query(
            r#"
            UPDATE posts
            SET likes = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(serde_json::to_value(&post.likes)?)
        .execute(&self.pool)
        .await?;

        Ok(Some((post, liked)))
    }

    /// Append a comment to a post
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Option<Post>> {
        let Some(mut post) = self.find_by_id(post_id).await? else {
            return Ok(None);
        };

        post.add_comment(user_id, text.to_string(), Utc::now());
        sqlx::query(
            r#"
            UPDATE posts
            SET comments = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(serde_json::to_value(&post.comments)?)
        .execute(&self.pool)
        .await?;

        Ok(Some(post))
    }

    /// Soft-delete a post, author-only
    pub async fn soft_delete(&self, post_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET is_active = FALSE, updated_at = now()
            WHERE id = $1 AND author_id = $2 AND is_active = TRUE
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_post(row: &PgRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        image_url: row.get("image_url"),
        likes: serde_json::from_value(row.get("likes"))?,
        comments: serde_json::from_value(row.get("comments"))?,
        visibility: row
            .get::<String, _>("visibility")
            .parse()
            .map_err(anyhow::Error::msg)?,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn map_post_view(row: &PgRow) -> Result<PostView> {
    let post = map_post(row)?;
    let author = crate::models::user::UserSummary {
        id: row.get("user_id"),
        profile: serde_json::from_value(row.get("profile"))?,
    };
    Ok(PostView::new(post, author))
}
