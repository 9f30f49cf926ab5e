//! Savings goal repository for database operations
//!
//! Ledger mutations run in Rust (see `models::savings`); this layer
//! persists the resulting document state.

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::savings::{CreateGoalRequest, GoalCategory, GoalStatus, SavingsGoal};

const GOAL_COLUMNS: &str = "id, user_id, name, description, target_amount, current_amount, \
                            target_date, category, status, privacy, auto_deposit, deposits, \
                            withdrawals, milestones, is_active, created_at, updated_at";

/// Savings goal repository for database operations
#[derive(Clone)]
pub struct SavingsRepository {
    pool: PgPool,
}

impl SavingsRepository {
    /// Create a new savings repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a savings goal
    pub async fn create(&self, user_id: Uuid, request: &CreateGoalRequest) -> Result<SavingsGoal> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO savings_goals
                (user_id, name, description, target_amount, target_date, category, privacy,
                 auto_deposit)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {GOAL_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.target_amount)
        .bind(request.target_date)
        .bind(request.category.unwrap_or_default().as_str())
        .bind(request.privacy.unwrap_or_default().as_str())
        .bind(serde_json::to_value(request.auto_deposit.clone().unwrap_or_default())?)
        .fetch_one(&self.pool)
        .await?;

        map_goal(&row)
    }

    /// Find an active goal by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SavingsGoal>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {GOAL_COLUMNS}
            FROM savings_goals
            WHERE id = $1 AND is_active = TRUE
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_goal).transpose()
    }

    /// A user's active goals, optionally filtered, newest first
    pub async fn list(
        &self,
        user_id: Uuid,
        status: Option<GoalStatus>,
        category: Option<GoalCategory>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SavingsGoal>, i64)> {
        let status = status.map(|s| s.as_str());
        let category = category.map(|c| c.as_str());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {GOAL_COLUMNS}
            FROM savings_goals
            WHERE user_id = $1 AND is_active = TRUE
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR category = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        ))
        .bind(user_id)
        .bind(status)
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM savings_goals
            WHERE user_id = $1 AND is_active = TRUE
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR category = $3)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(category)
        .fetch_one(&self.pool)
        .await?;

        let goals = rows.iter().map(map_goal).collect::<Result<Vec<_>>>()?;
        Ok((goals, total))
    }

    /// Every active goal a user owns, for summary aggregation
    pub async fn all_for_user(&self, user_id: Uuid) -> Result<Vec<SavingsGoal>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {GOAL_COLUMNS}
            FROM savings_goals
            WHERE user_id = $1 AND is_active = TRUE
            ORDER BY created_at DESC
            "#,
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_goal).collect()
    }

    /// Persist the full mutable state of a goal
    pub async fn update(&self, goal: &SavingsGoal) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE savings_goals
            SET name = $2, description = $3, target_amount = $4, current_amount = $5,
                target_date = $6, category = $7, status = $8, privacy = $9,
                auto_deposit = $10, deposits = $11, withdrawals = $12, milestones = $13,
                is_active = $14, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(goal.id)
        .bind(&goal.name)
        .bind(&goal.description)
        .bind(goal.target_amount)
        .bind(goal.current_amount)
        .bind(goal.target_date)
        .bind(goal.category.as_str())
        .bind(goal.status.as_str())
        .bind(goal.privacy.as_str())
        .bind(serde_json::to_value(&goal.auto_deposit)?)
        .bind(serde_json::to_value(&goal.deposits)?)
        .bind(serde_json::to_value(&goal.withdrawals)?)
        .bind(serde_json::to_value(&goal.milestones)?)
        .bind(goal.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn map_goal(row: &PgRow) -> Result<SavingsGoal> {
    Ok(SavingsGoal {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        description: row.get("description"),
        target_amount: row.get("target_amount"),
        current_amount: row.get("current_amount"),
        target_date: row.get("target_date"),
        category: row
            .get::<String, _>("category")
            .parse()
            .map_err(anyhow::Error::msg)?,
        status: row
            .get::<String, _>("status")
            .parse()
            .map_err(anyhow::Error::msg)?,
        privacy: row
            .get::<String, _>("privacy")
            .parse()
            .map_err(anyhow::Error::msg)?,
        auto_deposit: serde_json::from_value(row.get("auto_deposit"))?,
        deposits: serde_json::from_value(row.get("deposits"))?,
        withdrawals: serde_json::from_value(row.get("withdrawals"))?,
        milestones: serde_json::from_value(row.get("milestones"))?,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
