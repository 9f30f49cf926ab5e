//! User repository for database operations

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::user::{NewUser, Profile, User, UserSummary};

const USER_COLUMNS: &str = "id, auth_id, email, password_hash, profile, friends, kyc, \
                            is_active, last_login_at, created_at, updated_at";

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (auth_id, email, password_hash, profile)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(&new_user.auth_id)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(serde_json::to_value(&new_user.profile)?)
        .fetch_one(&self.pool)
        .await?;

        map_user(&row)
    }

    /// Find a user by ID regardless of active state
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    /// Find an active user by ID
    pub async fn find_active_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1 AND is_active = TRUE
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    /// Find a user by email, active or not. Login distinguishes unknown
    /// emails from deactivated accounts.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1
            "#,
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    /// Check whether a username is taken by anyone else
    pub async fn username_taken(&self, username: &str, exclude_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE profile ->> 'username' = $1 AND id != $2
            "#,
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Replace a user's profile document
    pub async fn update_profile(&self, id: Uuid, profile: &Profile) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET profile = $2, updated_at = now()
            WHERE id = $1 AND is_active = TRUE
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(serde_json::to_value(profile)?)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    /// Record a successful login
    pub async fn record_login(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Soft-delete an account
    pub async fn deactivate(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE, updated_at = now()
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Public summaries for a batch of user IDs
    pub async fn summaries_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, profile
            FROM users
            WHERE id = ANY($1) AND is_active = TRUE
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_summary).collect()
    }

    /// Active users other than the caller and an exclusion list, capped.
    /// Candidate pool for interest-based recommendations; scoring happens
    /// in the caller.
    pub async fn recommendation_candidates(
        &self,
        user_id: Uuid,
        exclude: &[Uuid],
        limit: i64,
    ) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE is_active = TRUE AND id != $1 AND id != ALL($2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        ))
        .bind(user_id)
        .bind(exclude)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_user).collect()
    }
}

fn map_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        auth_id: row.get("auth_id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        profile: serde_json::from_value(row.get("profile"))?,
        friends: serde_json::from_value(row.get("friends"))?,
        kyc: serde_json::from_value(row.get("kyc"))?,
        is_active: row.get("is_active"),
        last_login_at: row.get("last_login_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub(crate) fn map_summary(row: &PgRow) -> Result<UserSummary> {
    Ok(UserSummary {
        id: row.get("id"),
        profile: serde_json::from_value(row.get("profile"))?,
    })
}
