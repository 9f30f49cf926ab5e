//! Follow graph repository
//!
//! Edges are soft-deleted: unfollowing flips `is_active` and a later
//! re-follow reactivates the same row, so the unique pair constraint
//! always holds one row per ordered pair.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::follow::{Follow, FollowStats, FollowedUser, SuggestedFollow};
use crate::repositories::user::map_summary;

/// Follow repository for database operations
#[derive(Clone)]
pub struct FollowRepository {
    pool: PgPool,
}

impl FollowRepository {
    /// Create a new follow repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or reactivate a follow edge. Returns None when an active
    /// edge already exists.
    pub async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<Follow>> {
        let row = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, following_id)
                DO UPDATE SET is_active = TRUE, updated_at = now()
                WHERE follows.is_active = FALSE
            RETURNING id, follower_id, following_id, is_active, created_at, updated_at
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_follow))
    }

    /// Soft-delete an active edge
    pub async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE follows
            SET is_active = FALSE, updated_at = now()
            WHERE follower_id = $1 AND following_id = $2 AND is_active = TRUE
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Active-edge existence check
    pub async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM follows
            WHERE follower_id = $1 AND following_id = $2 AND is_active = TRUE
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Follower and following counts for a user
    pub async fn stats(&self, user_id: Uuid) -> Result<FollowStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows
                 WHERE following_id = $1 AND is_active = TRUE) AS followers_count,
                (SELECT COUNT(*) FROM follows
                 WHERE follower_id = $1 AND is_active = TRUE) AS following_count
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowStats {
            followers_count: row.get("followers_count"),
            following_count: row.get("following_count"),
        })
    }

    /// Users following `user_id`, newest edge first
    pub async fn followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FollowedUser>, i64)> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.profile, f.created_at AS followed_at
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1 AND f.is_active = TRUE AND u.is_active = TRUE
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1 AND f.is_active = TRUE AND u.is_active = TRUE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let users = rows
            .iter()
            .map(map_followed_user)
            .collect::<Result<Vec<_>>>()?;
        Ok((users, total))
    }

    /// Users `user_id` follows, newest edge first
    pub async fn following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FollowedUser>, i64)> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.profile, f.created_at AS followed_at
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1 AND f.is_active = TRUE AND u.is_active = TRUE
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1 AND f.is_active = TRUE AND u.is_active = TRUE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let users = rows
            .iter()
            .map(map_followed_user)
            .collect::<Result<Vec<_>>>()?;
        Ok((users, total))
    }

    /// IDs of everyone `user_id` actively follows
    pub async fn following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar(
            r#"
            SELECT following_id
            FROM follows
            WHERE follower_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Users with active edges in both directions
    pub async fn mutual(&self, user_id: Uuid) -> Result<Vec<crate::models::user::UserSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.profile
            FROM follows f1
            JOIN follows f2
              ON f2.follower_id = f1.following_id AND f2.following_id = f1.follower_id
            JOIN users u ON u.id = f1.following_id
            WHERE f1.follower_id = $1
              AND f1.is_active = TRUE
              AND f2.is_active = TRUE
              AND u.is_active = TRUE
            ORDER BY f1.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_summary).collect()
    }

    /// People the user's followers follow, excluding the user and anyone
    /// already followed. Ranked by distinct connecting followers, then by
    /// total connecting paths.
    pub async fn suggestions(&self, user_id: Uuid, limit: i64) -> Result<Vec<SuggestedFollow>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.profile,
                   COUNT(DISTINCT f1.follower_id) AS connection_count,
                   COUNT(*) AS path_count
            FROM follows f1
            JOIN follows f2 ON f2.follower_id = f1.follower_id
            JOIN users u ON u.id = f2.following_id
            WHERE f1.following_id = $1
              AND f1.is_active = TRUE
              AND f2.is_active = TRUE
              AND u.is_active = TRUE
              AND f2.following_id != $1
              AND NOT EXISTS (
                  SELECT 1 FROM follows f3
                  WHERE f3.follower_id = $1
                    AND f3.following_id = f2.following_id
                    AND f3.is_active = TRUE
              )
            GROUP BY u.id, u.profile
            ORDER BY connection_count DESC, path_count DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SuggestedFollow {
                    user: map_summary(row)?,
                    connection_count: row.get("connection_count"),
                    path_count: row.get("path_count"),
                })
            })
            .collect()
    }
}

fn map_follow(row: &PgRow) -> Follow {
    Follow {
        id: row.get("id"),
        follower_id: row.get("follower_id"),
        following_id: row.get("following_id"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn map_followed_user(row: &PgRow) -> Result<FollowedUser> {
    let followed_at: DateTime<Utc> = row.get("followed_at");
    Ok(FollowedUser {
        user: map_summary(row)?,
        followed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{NewUser, Profile};
    use crate::repositories::user::UserRepository;
    use common::database::{DatabaseConfig, init_pool};

    async fn test_pool() -> Result<PgPool> {
        let config = DatabaseConfig::from_env()?;
        let pool = init_pool(&config).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(pool)
    }

    async fn create_user(pool: &PgPool, first_name: &str) -> Result<Uuid> {
        let user = UserRepository::new(pool.clone())
            .create(&NewUser {
                auth_id: format!("local:{}", Uuid::new_v4()),
                email: format!("{}@follow-test.example", Uuid::new_v4()),
                password_hash: None,
                profile: Profile {
                    first_name: first_name.to_string(),
                    last_name: "Tester".to_string(),
                    ..Default::default()
                },
            })
            .await?;
        Ok(user.id)
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_unfollow_soft_deletes_and_refollow_reactivates() -> Result<()> {
        let pool = test_pool().await?;
        let repo = FollowRepository::new(pool.clone());
        let alice = create_user(&pool, "Alice").await?;
        let bob = create_user(&pool, "Bob").await?;

        let edge = repo.follow(alice, bob).await?.expect("edge created");
        assert!(repo.is_following(alice, bob).await?);

        // A second follow while the edge is active is a no-op
        assert!(repo.follow(alice, bob).await?.is_none());

        assert!(repo.unfollow(alice, bob).await?);
        assert!(!repo.is_following(alice, bob).await?);

        // The row survives the unfollow, flagged inactive
        let row = sqlx::query(
            "SELECT id, is_active FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(alice)
        .bind(bob)
        .fetch_one(&pool)
        .await?;
        assert_eq!(row.get::<Uuid, _>("id"), edge.id);
        assert!(!row.get::<bool, _>("is_active"));

        // Re-following reactivates the same row instead of inserting
        let revived = repo.follow(alice, bob).await?.expect("edge reactivated");
        assert_eq!(revived.id, edge.id);
        assert!(revived.is_active);
        assert!(repo.is_following(alice, bob).await?);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(alice)
                .bind(bob)
                .fetch_one(&pool)
                .await?;
        assert_eq!(count, 1);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_mutual_follow_is_symmetric() -> Result<()> {
        let pool = test_pool().await?;
        let repo = FollowRepository::new(pool.clone());
        let alice = create_user(&pool, "Alice").await?;
        let bob = create_user(&pool, "Bob").await?;
        let carol = create_user(&pool, "Carol").await?;

        repo.follow(alice, bob).await?;
        repo.follow(bob, alice).await?;
        repo.follow(alice, carol).await?;

        let alice_mutuals = repo.mutual(alice).await?;
        assert!(alice_mutuals.iter().any(|u| u.id == bob));
        assert!(!alice_mutuals.iter().any(|u| u.id == carol));

        let bob_mutuals = repo.mutual(bob).await?;
        assert!(bob_mutuals.iter().any(|u| u.id == alice));

        // Breaking one direction breaks it for both sides
        repo.unfollow(bob, alice).await?;
        assert!(!repo.mutual(alice).await?.iter().any(|u| u.id == bob));
        assert!(!repo.mutual(bob).await?.iter().any(|u| u.id == alice));

        Ok(())
    }
}
