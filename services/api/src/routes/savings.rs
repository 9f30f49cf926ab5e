//! Savings goal routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::savings::{
        CreateGoalRequest, DepositRequest, GoalCategory, GoalStatus, GoalView, SavingsGoal,
        UpdateGoalRequest, WithdrawalRequest,
    },
    models::user::User,
    models::{Pagination, page_bounds},
    state::AppState,
};

const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct GoalListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<GoalStatus>,
    pub category: Option<GoalCategory>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_goal).get(list_goals))
        .route("/summary/user", get(user_summary))
        .route("/:id", get(get_goal).put(update_goal).delete(delete_goal))
        .route("/:id/deposit", post(deposit))
        .route("/:id/withdraw", post(withdraw))
}

/// Create a savings goal
pub async fn create_goal(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateGoalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = payload.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let goal = state
        .savings_repository
        .create(user.id, &payload)
        .await
        .map_err(internal)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "goal": GoalView::new(goal)
        })),
    ))
}

/// The current user's goals with optional status/category filters
pub async fn list_goals(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<GoalListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit, offset) = page_bounds(query.page, query.limit, DEFAULT_PAGE_SIZE);

    let (goals, total) = state
        .savings_repository
        .list(user.id, query.status, query.category, limit as i64, offset)
        .await
        .map_err(internal)?;

    let views: Vec<GoalView> = goals.into_iter().map(GoalView::new).collect();
    Ok(Json(json!({
        "success": true,
        "goals": views,
        "pagination": Pagination::new(page, limit, total)
    })))
}

/// One goal with derived progress fields, owner-only
pub async fn get_goal(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(goal_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let goal = find_owned_goal(&state, goal_id, user.id).await?;

    Ok(Json(json!({
        "success": true,
        "goal": GoalView::new(goal)
    })))
}

/// Update mutable goal settings
pub async fn update_goal(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(goal_id): Path<Uuid>,
    Json(payload): Json<UpdateGoalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut goal = find_owned_goal(&state, goal_id, user.id).await?;

    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() || name.chars().count() > 100 {
            return Err(ApiError::Validation(vec![
                "Goal name must be between 1 and 100 characters".to_string(),
            ]));
        }
        goal.name = name;
    }
    if let Some(description) = payload.description {
        goal.description = Some(description);
    }
    if let Some(target_amount) = payload.target_amount {
        if target_amount <= 0.0 {
            return Err(ApiError::Validation(vec![
                "Target amount must be greater than zero".to_string(),
            ]));
        }
        goal.target_amount = target_amount;
    }
    if let Some(target_date) = payload.target_date {
        goal.target_date = Some(target_date);
    }
    if let Some(category) = payload.category {
        goal.category = category;
    }
    if let Some(status) = payload.status {
        goal.status = status;
    }
    if let Some(privacy) = payload.privacy {
        goal.privacy = privacy;
    }
    if let Some(auto_deposit) = payload.auto_deposit {
        goal.auto_deposit = auto_deposit;
    }

    state
        .savings_repository
        .update(&goal)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "goal": GoalView::new(goal)
    })))
}

/// Record a deposit into a goal
pub async fn deposit(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(goal_id): Path<Uuid>,
    Json(payload): Json<DepositRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut goal = find_owned_goal(&state, goal_id, user.id).await?;

    if goal.status == GoalStatus::Cancelled {
        return Err(ApiError::BadRequest(
            "Cannot deposit into a cancelled goal".to_string(),
        ));
    }

    goal.add_deposit(
        payload.amount,
        payload.method.unwrap_or_default(),
        payload.note,
        Utc::now(),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state
        .savings_repository
        .update(&goal)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "goal": GoalView::new(goal)
    })))
}

/// Record a withdrawal from a goal
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(goal_id): Path<Uuid>,
    Json(payload): Json<WithdrawalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut goal = find_owned_goal(&state, goal_id, user.id).await?;

    goal.add_withdrawal(payload.amount, payload.reason, Utc::now())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state
        .savings_repository
        .update(&goal)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "goal": GoalView::new(goal)
    })))
}

/// Aggregate savings summary across the user's goals
pub async fn user_summary(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let goals = state
        .savings_repository
        .all_for_user(user.id)
        .await
        .map_err(internal)?;

    let total_goals = goals.len();
    let active = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Active)
        .count();
    let completed = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Completed)
        .count();
    let total_saved: f64 = goals.iter().map(|g| g.current_amount).sum();
    let total_target: f64 = goals.iter().map(|g| g.target_amount).sum();
    let overall_progress = if total_target > 0.0 {
        ((total_saved / total_target * 100.0).min(100.0) * 100.0).round() / 100.0
    } else {
        0.0
    };

    Ok(Json(json!({
        "success": true,
        "summary": {
            "total_goals": total_goals,
            "active_goals": active,
            "completed_goals": completed,
            "total_saved": (total_saved * 100.0).round() / 100.0,
            "total_target": (total_target * 100.0).round() / 100.0,
            "overall_progress": overall_progress
        }
    })))
}

/// Cancel and soft-delete a goal
pub async fn delete_goal(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(goal_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut goal = find_owned_goal(&state, goal_id, user.id).await?;

    goal.status = GoalStatus::Cancelled;
    goal.is_active = false;
    state
        .savings_repository
        .update(&goal)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "message": "Savings goal deleted"
    })))
}

async fn find_owned_goal(
    state: &AppState,
    goal_id: Uuid,
    user_id: Uuid,
) -> Result<SavingsGoal, ApiError> {
    let goal = state
        .savings_repository
        .find_by_id(goal_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Savings goal not found".to_string()))?;

    if goal.user_id != user_id {
        return Err(ApiError::Forbidden(
            "You do not own this savings goal".to_string(),
        ));
    }

    Ok(goal)
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("Savings operation failed: {}", e);
    ApiError::InternalServerError
}
