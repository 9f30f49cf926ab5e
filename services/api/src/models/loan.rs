//! Loan model and funding state machine

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::user::UserSummary;

pub const MIN_LOAN_AMOUNT: f64 = 1.0;
pub const MAX_LOAN_AMOUNT: f64 = 1_000_000.0;
pub const MAX_TERM_MONTHS: i32 = 360;

/// Peer-to-peer loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub borrower_id: Uuid,
    /// Absent until the loan is funded
    pub lender_id: Option<Uuid>,
    pub amount: f64,
    pub interest_rate: f64,
    pub status: LoanStatus,
    pub term_months: Option<i32>,
    pub purpose: Option<String>,
    pub description: Option<String>,
    pub payment_schedule: PaymentSchedule,
    pub funded_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub repaid_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loan lifecycle status. Forward-only: requested -> funded -> repaid,
/// with cancellation legal only from requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Requested,
    Funded,
    Repaid,
    Defaulted,
    Cancelled,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Requested => "requested",
            LoanStatus::Funded => "funded",
            LoanStatus::Repaid => "repaid",
            LoanStatus::Defaulted => "defaulted",
            LoanStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(LoanStatus::Requested),
            "funded" => Ok(LoanStatus::Funded),
            "repaid" => Ok(LoanStatus::Repaid),
            "defaulted" => Ok(LoanStatus::Defaulted),
            "cancelled" => Ok(LoanStatus::Cancelled),
            other => Err(format!("unknown loan status: {}", other)),
        }
    }
}

/// Repayment cadence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentSchedule {
    #[default]
    Monthly,
    Quarterly,
    Annually,
    LumpSum,
}

impl PaymentSchedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSchedule::Monthly => "monthly",
            PaymentSchedule::Quarterly => "quarterly",
            PaymentSchedule::Annually => "annually",
            PaymentSchedule::LumpSum => "lump-sum",
        }
    }
}

impl std::str::FromStr for PaymentSchedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(PaymentSchedule::Monthly),
            "quarterly" => Ok(PaymentSchedule::Quarterly),
            "annually" => Ok(PaymentSchedule::Annually),
            "lump-sum" => Ok(PaymentSchedule::LumpSum),
            other => Err(format!("unknown payment schedule: {}", other)),
        }
    }
}

/// Illegal loan state transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoanStateError {
    #[error("Loan is not available for funding")]
    NotFundable,
    #[error("Loan is not in funded status")]
    NotFunded,
    #[error("Cannot cancel loan that is already funded")]
    NotCancellable,
}

impl Loan {
    /// Amortized monthly payment, rounded to cents. Zero-rate loans fall
    /// back to straight-line amount/term.
    pub fn monthly_payment(&self) -> f64 {
        let Some(term) = self.term_months.filter(|t| *t > 0) else {
            return 0.0;
        };
        let term = term as f64;

        let monthly_rate = self.interest_rate / 100.0 / 12.0;
        let payment = if monthly_rate == 0.0 {
            self.amount / term
        } else {
            let factor = (1.0 + monthly_rate).powf(term);
            self.amount * (monthly_rate * factor) / (factor - 1.0)
        };

        round_cents(payment)
    }

    /// Total interest paid over the life of the loan, rounded to cents
    pub fn total_interest(&self) -> f64 {
        let Some(term) = self.term_months.filter(|t| *t > 0) else {
            return 0.0;
        };
        let payment = self.monthly_payment();
        if payment == 0.0 {
            return 0.0;
        }
        round_cents(payment * term as f64 - self.amount)
    }

    /// Transition requested -> funded, recording the lender and due date
    pub fn fund(&mut self, lender_id: Uuid, now: DateTime<Utc>) -> Result<(), LoanStateError> {
        if self.status != LoanStatus::Requested {
            return Err(LoanStateError::NotFundable);
        }

        self.lender_id = Some(lender_id);
        self.status = LoanStatus::Funded;
        self.funded_at = Some(now);
        if let Some(term) = self.term_months.filter(|t| *t > 0) {
            self.due_date = now.checked_add_months(Months::new(term as u32));
        }
        Ok(())
    }

    /// Transition funded -> repaid
    pub fn repay(&mut self, now: DateTime<Utc>) -> Result<(), LoanStateError> {
        if self.status != LoanStatus::Funded {
            return Err(LoanStateError::NotFunded);
        }

        self.status = LoanStatus::Repaid;
        self.repaid_at = Some(now);
        Ok(())
    }

    /// Cancel a requested loan; also archives the record
    pub fn cancel(&mut self) -> Result<(), LoanStateError> {
        if self.status != LoanStatus::Requested {
            return Err(LoanStateError::NotCancellable);
        }

        self.status = LoanStatus::Cancelled;
        self.is_active = false;
        Ok(())
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Request to create a loan
#[derive(Debug, Deserialize)]
pub struct CreateLoanRequest {
    pub amount: f64,
    #[serde(default)]
    pub interest_rate: Option<f64>,
    #[serde(default)]
    pub term_months: Option<i32>,
    pub purpose: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment_schedule: Option<PaymentSchedule>,
}

impl CreateLoanRequest {
    /// Field-level validation messages; empty when the request is valid
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.amount < MIN_LOAN_AMOUNT {
            errors.push("Loan amount must be at least $1".to_string());
        }
        if self.amount > MAX_LOAN_AMOUNT {
            errors.push("Loan amount cannot exceed $1,000,000".to_string());
        }
        if let Some(rate) = self.interest_rate {
            if !(0.0..=100.0).contains(&rate) {
                errors.push("Interest rate must be between 0 and 100".to_string());
            }
        }
        if let Some(term) = self.term_months {
            if term < 1 || term > MAX_TERM_MONTHS {
                errors.push("Loan term must be between 1 and 360 months".to_string());
            }
        }
        if self.purpose.trim().is_empty() {
            errors.push("Loan purpose is required".to_string());
        }
        if self.purpose.chars().count() > 500 {
            errors.push("Purpose cannot exceed 500 characters".to_string());
        }
        if self.description.as_ref().is_some_and(|d| d.chars().count() > 1000) {
            errors.push("Description cannot exceed 1000 characters".to_string());
        }

        errors
    }
}

/// Loan joined with the public profiles of its parties
#[derive(Debug, Clone, Serialize)]
pub struct LoanView {
    #[serde(flatten)]
    pub loan: Loan,
    pub borrower: UserSummary,
    pub lender: Option<UserSummary>,
    pub monthly_payment: f64,
    pub total_interest: f64,
}

impl LoanView {
    pub fn new(loan: Loan, borrower: UserSummary, lender: Option<UserSummary>) -> Self {
        let monthly_payment = loan.monthly_payment();
        let total_interest = loan.total_interest();
        Self {
            loan,
            borrower,
            lender,
            monthly_payment,
            total_interest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(amount: f64, rate: f64, term: i32) -> Loan {
        Loan {
            id: Uuid::new_v4(),
            borrower_id: Uuid::new_v4(),
            lender_id: None,
            amount,
            interest_rate: rate,
            status: LoanStatus::Requested,
            term_months: Some(term),
            purpose: Some("test".to_string()),
            description: None,
            payment_schedule: PaymentSchedule::Monthly,
            funded_at: None,
            due_date: None,
            repaid_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_monthly_payment_matches_reference_amortization() {
        // $1000 at 12% over 12 months
        let loan = loan(1000.0, 12.0, 12);
        assert!((loan.monthly_payment() - 88.85).abs() < 0.005);
        assert!((loan.total_interest() - 66.2).abs() < 0.01);
    }

    #[test]
    fn test_monthly_payment_zero_rate_is_straight_line() {
        let loan = loan(1200.0, 0.0, 12);
        assert_eq!(loan.monthly_payment(), 100.0);
        assert_eq!(loan.total_interest(), 0.0);
    }

    #[test]
    fn test_fund_only_from_requested() {
        let mut loan = loan(1000.0, 5.0, 12);
        let lender = Uuid::new_v4();
        let now = Utc::now();

        loan.fund(lender, now).unwrap();
        assert_eq!(loan.status, LoanStatus::Funded);
        assert_eq!(loan.lender_id, Some(lender));
        assert!(loan.due_date.is_some());

        // Funding again is illegal and leaves state unchanged
        let err = loan.fund(Uuid::new_v4(), now).unwrap_err();
        assert_eq!(err, LoanStateError::NotFundable);
        assert_eq!(loan.lender_id, Some(lender));
        assert_eq!(loan.status, LoanStatus::Funded);
    }

    #[test]
    fn test_repay_only_from_funded() {
        let mut loan = loan(1000.0, 5.0, 12);
        let now = Utc::now();

        let err = loan.repay(now).unwrap_err();
        assert_eq!(err, LoanStateError::NotFunded);
        assert_eq!(loan.status, LoanStatus::Requested);

        loan.fund(Uuid::new_v4(), now).unwrap();
        loan.repay(now).unwrap();
        assert_eq!(loan.status, LoanStatus::Repaid);
        assert!(loan.repaid_at.is_some());
    }

    #[test]
    fn test_cancel_only_from_requested_and_archives() {
        let mut loan0 = loan(1000.0, 5.0, 12);
        loan0.cancel().unwrap();
        assert_eq!(loan0.status, LoanStatus::Cancelled);
        assert!(!loan0.is_active);

        let mut loan1 = loan(1000.0, 5.0, 12);
        loan1.fund(Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(loan1.cancel().unwrap_err(), LoanStateError::NotCancellable);
        assert_eq!(loan1.status, LoanStatus::Funded);
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateLoanRequest {
            amount: 0.5,
            interest_rate: Some(150.0),
            term_months: Some(0),
            purpose: " ".to_string(),
            description: None,
            payment_schedule: None,
        };
        let errors = req.validate();
        assert_eq!(errors.len(), 4);

        let req = CreateLoanRequest {
            amount: 5000.0,
            interest_rate: Some(3.5),
            term_months: Some(24),
            purpose: "car repair".to_string(),
            description: None,
            payment_schedule: None,
        };
        assert!(req.validate().is_empty());
    }
}
