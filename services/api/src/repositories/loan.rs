//! Loan repository for database operations

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::loan::{CreateLoanRequest, Loan, PaymentSchedule};

const LOAN_COLUMNS: &str = "id, borrower_id, lender_id, amount, interest_rate, status, \
                            term_months, purpose, description, payment_schedule, funded_at, \
                            due_date, repaid_at, is_active, created_at, updated_at";

/// Loan repository for database operations
#[derive(Clone)]
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    /// Create a new loan repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a loan request
    pub async fn create(&self, borrower_id: Uuid, request: &CreateLoanRequest) -> Result<Loan> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO loans
                (borrower_id, amount, interest_rate, term_months, purpose, description,
                 payment_schedule)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {LOAN_COLUMNS}
            "#,
        ))
        .bind(borrower_id)
        .bind(request.amount)
        .bind(request.interest_rate.unwrap_or(0.0))
        .bind(request.term_months)
        .bind(request.purpose.trim())
        .bind(&request.description)
        .bind(request.payment_schedule.unwrap_or_default().as_str())
        .fetch_one(&self.pool)
        .await?;

        map_loan(&row)
    }

    /// Find an active loan by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans
            WHERE id = $1 AND is_active = TRUE
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_loan).transpose()
    }

    /// Open loan requests from other borrowers, newest first
    pub async fn open_requests(
        &self,
        viewer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Loan>, i64)> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans
            WHERE status = 'requested' AND is_active = TRUE AND borrower_id != $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(viewer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM loans
            WHERE status = 'requested' AND is_active = TRUE AND borrower_id != $1
            "#,
        )
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;

        let loans = rows.iter().map(map_loan).collect::<Result<Vec<_>>>()?;
        Ok((loans, total))
    }

    /// A user's loans split into borrowed and lent
    pub async fn by_user(&self, user_id: Uuid) -> Result<(Vec<Loan>, Vec<Loan>)> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans
            WHERE is_active = TRUE AND (borrower_id = $1 OR lender_id = $1)
            ORDER BY created_at DESC
            "#,
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut borrowed = Vec::new();
        let mut lent = Vec::new();
        for row in &rows {
            let loan = map_loan(row)?;
            if loan.borrower_id == user_id {
                borrowed.push(loan);
            } else {
                lent.push(loan);
            }
        }

        Ok((borrowed, lent))
    }

    /// Persist the mutable state of a loan after a transition
    pub async fn update(&self, loan: &Loan) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE loans
            SET lender_id = $2, status = $3, funded_at = $4, due_date = $5,
                repaid_at = $6, is_active = $7, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(loan.id)
        .bind(loan.lender_id)
        .bind(loan.status.as_str())
        .bind(loan.funded_at)
        .bind(loan.due_date)
        .bind(loan.repaid_at)
        .bind(loan.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn map_loan(row: &PgRow) -> Result<Loan> {
    Ok(Loan {
        id: row.get("id"),
        borrower_id: row.get("borrower_id"),
        lender_id: row.get("lender_id"),
        amount: row.get("amount"),
        interest_rate: row.get("interest_rate"),
        status: row
            .get::<String, _>("status")
            .parse()
            .map_err(anyhow::Error::msg)?,
        term_months: row.get("term_months"),
        purpose: row.get("purpose"),
        description: row.get("description"),
        payment_schedule: row
            .get::<String, _>("payment_schedule")
            .parse::<PaymentSchedule>()
            .map_err(anyhow::Error::msg)?,
        funded_at: row.get("funded_at"),
        due_date: row.get("due_date"),
        repaid_at: row.get("repaid_at"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
