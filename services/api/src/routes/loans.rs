//! Peer-to-peer lending routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::loan::{CreateLoanRequest, Loan, LoanView},
    models::user::User,
    models::{Pagination, page_bounds},
    routes::follow::PageQuery,
    state::AppState,
};

const DEFAULT_PAGE_SIZE: u32 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_loan).get(open_requests))
        .route("/me", get(my_loans))
        .route("/:id", get(get_loan).delete(cancel_loan))
        .route("/:id/fund", post(fund_loan))
        .route("/:id/repay", post(repay_loan))
}

/// Create a loan request
pub async fn create_loan(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateLoanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = payload.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let loan = state
        .loan_repository
        .create(user.id, &payload)
        .await
        .map_err(internal)?;

    let view = LoanView::new(loan, user.summary(), None);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "loan": view
        })),
    ))
}

/// Open loan requests from other borrowers
pub async fn open_requests(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit, offset) = page_bounds(query.page, query.limit, DEFAULT_PAGE_SIZE);

    let (loans, total) = state
        .loan_repository
        .open_requests(user.id, limit as i64, offset)
        .await
        .map_err(internal)?;

    let views = with_parties(&state, loans).await?;
    Ok(Json(json!({
        "success": true,
        "loans": views,
        "pagination": Pagination::new(page, limit, total)
    })))
}

/// The current user's loans, split into borrowed and lent
pub async fn my_loans(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let (borrowed, lent) = state
        .loan_repository
        .by_user(user.id)
        .await
        .map_err(internal)?;

    let borrowed = with_parties(&state, borrowed).await?;
    let lent = with_parties(&state, lent).await?;

    Ok(Json(json!({
        "success": true,
        "borrowed": borrowed,
        "lent": lent
    })))
}

/// A single loan with its parties and payment figures
pub async fn get_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let loan = find_loan(&state, loan_id).await?;
    let views = with_parties(&state, vec![loan]).await?;
    let view = views
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound("Loan not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "loan": view
    })))
}

/// Fund an open loan request
pub async fn fund_loan(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(loan_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut loan = find_loan(&state, loan_id).await?;

    if loan.borrower_id == user.id {
        return Err(ApiError::BadRequest(
            "You cannot fund your own loan".to_string(),
        ));
    }

    loan.fund(user.id, Utc::now())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.loan_repository.update(&loan).await.map_err(internal)?;
    info!("Loan {} funded by {}", loan.id, user.id);

    let views = with_parties(&state, vec![loan]).await?;
    Ok(Json(json!({
        "success": true,
        "loan": views.into_iter().next()
    })))
}

/// Mark a funded loan as repaid, borrower-only
pub async fn repay_loan(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(loan_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut loan = find_loan(&state, loan_id).await?;

    if loan.borrower_id != user.id {
        return Err(ApiError::Forbidden(
            "Only the borrower can repay this loan".to_string(),
        ));
    }

    loan.repay(Utc::now())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.loan_repository.update(&loan).await.map_err(internal)?;
    info!("Loan {} repaid", loan.id);

    let views = with_parties(&state, vec![loan]).await?;
    Ok(Json(json!({
        "success": true,
        "loan": views.into_iter().next()
    })))
}

/// Cancel an unfunded loan request, borrower-only
pub async fn cancel_loan(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(loan_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut loan = find_loan(&state, loan_id).await?;

    if loan.borrower_id != user.id {
        return Err(ApiError::Forbidden(
            "Only the borrower can cancel this loan".to_string(),
        ));
    }

    loan.cancel()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.loan_repository.update(&loan).await.map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "message": "Loan request cancelled"
    })))
}

async fn find_loan(state: &AppState, loan_id: Uuid) -> Result<Loan, ApiError> {
    state
        .loan_repository
        .find_by_id(loan_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Loan not found".to_string()))
}

/// Join loans with the public profiles of their parties
async fn with_parties(state: &AppState, loans: Vec<Loan>) -> Result<Vec<LoanView>, ApiError> {
    let mut ids: Vec<Uuid> = Vec::new();
    for loan in &loans {
        ids.push(loan.borrower_id);
        if let Some(lender_id) = loan.lender_id {
            ids.push(lender_id);
        }
    }
    ids.sort_unstable();
    ids.dedup();

    let summaries = state
        .user_repository
        .summaries_by_ids(&ids)
        .await
        .map_err(internal)?;

    let views = loans
        .into_iter()
        .filter_map(|loan| {
            let borrower = summaries.iter().find(|s| s.id == loan.borrower_id)?.clone();
            let lender = loan
                .lender_id
                .and_then(|id| summaries.iter().find(|s| s.id == id).cloned());
            Some(LoanView::new(loan, borrower, lender))
        })
        .collect();

    Ok(views)
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("Loan operation failed: {}", e);
    ApiError::InternalServerError
}
