//! Savings goals, deposit/withdrawal ledger, and milestone tracking

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Progress thresholds recorded at most once per goal
pub const MILESTONE_PERCENTAGES: [u32; 4] = [25, 50, 75, 100];

/// User savings goal with an embedded transaction ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: f64,
    pub current_amount: f64,
    pub target_date: Option<NaiveDate>,
    pub category: GoalCategory,
    pub status: GoalStatus,
    pub privacy: GoalPrivacy,
    pub auto_deposit: AutoDeposit,
    pub deposits: Vec<Deposit>,
    pub withdrawals: Vec<Withdrawal>,
    pub milestones: Vec<Milestone>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    Emergency,
    Vacation,
    Education,
    Home,
    Vehicle,
    Retirement,
    Investment,
    #[default]
    Other,
}

impl GoalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalCategory::Emergency => "emergency",
            GoalCategory::Vacation => "vacation",
            GoalCategory::Education => "education",
            GoalCategory::Home => "home",
            GoalCategory::Vehicle => "vehicle",
            GoalCategory::Retirement => "retirement",
            GoalCategory::Investment => "investment",
            GoalCategory::Other => "other",
        }
    }
}

impl std::str::FromStr for GoalCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "emergency" => Ok(GoalCategory::Emergency),
            "vacation" => Ok(GoalCategory::Vacation),
            "education" => Ok(GoalCategory::Education),
            "home" => Ok(GoalCategory::Home),
            "vehicle" => Ok(GoalCategory::Vehicle),
            "retirement" => Ok(GoalCategory::Retirement),
            "investment" => Ok(GoalCategory::Investment),
            "other" => Ok(GoalCategory::Other),
            other => Err(format!("unknown goal category: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Paused => "paused",
            GoalStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(GoalStatus::Active),
            "completed" => Ok(GoalStatus::Completed),
            "paused" => Ok(GoalStatus::Paused),
            "cancelled" => Ok(GoalStatus::Cancelled),
            other => Err(format!("unknown goal status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPrivacy {
    #[default]
    Private,
    Friends,
    Public,
}

impl GoalPrivacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalPrivacy::Private => "private",
            GoalPrivacy::Friends => "friends",
            GoalPrivacy::Public => "public",
        }
    }
}

impl std::str::FromStr for GoalPrivacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(GoalPrivacy::Private),
            "friends" => Ok(GoalPrivacy::Friends),
            "public" => Ok(GoalPrivacy::Public),
            other => Err(format!("unknown goal privacy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositMethod {
    #[default]
    Manual,
    Auto,
    Bonus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    #[default]
    Weekly,
    Biweekly,
    Monthly,
}

/// Scheduled recurring deposit settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoDeposit {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub next_deposit_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub amount: f64,
    #[serde(default)]
    pub method: DepositMethod,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub amount: f64,
    #[serde(default)]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub percentage: u32,
    pub reached_at: DateTime<Utc>,
}

/// Ledger operation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SavingsError {
    #[error("Deposit amount must be greater than zero")]
    NonPositiveDeposit,
    #[error("Withdrawal amount must be greater than zero")]
    NonPositiveWithdrawal,
    #[error("Withdrawal amount cannot exceed current savings")]
    InsufficientFunds,
}

impl SavingsGoal {
    /// Percentage of target saved, clamped to 100 for display
    pub fn progress_percentage(&self) -> f64 {
        if self.target_amount <= 0.0 {
            return 0.0;
        }
        let pct = self.current_amount / self.target_amount * 100.0;
        round_cents(pct.min(100.0))
    }

    pub fn remaining_amount(&self) -> f64 {
        round_cents((self.target_amount - self.current_amount).max(0.0))
    }

    pub fn total_deposits(&self) -> f64 {
        round_cents(self.deposits.iter().map(|d| d.amount).sum())
    }

    pub fn total_withdrawals(&self) -> f64 {
        round_cents(self.withdrawals.iter().map(|w| w.amount).sum())
    }

    /// Days until the target date; None when no date is set
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.target_date
            .map(|date| (date - today).num_days().max(0))
    }

    /// Even monthly amount needed to hit the target by the target date
    pub fn suggested_monthly_savings(&self, today: NaiveDate) -> Option<f64> {
        let days = self.days_remaining(today)?;
        if days == 0 {
            return None;
        }
        let months = (days as f64 / 30.0).ceil().max(1.0);
        Some(round_cents(self.remaining_amount() / months))
    }

    /// Recompute current_amount from the ledger. The ledger is the source
    /// of truth; current_amount is derived.
    pub fn reconcile(&mut self) {
        let balance = self.total_deposits() - self.total_withdrawals();
        self.current_amount = round_cents(balance.max(0.0));
    }

    /// Append a deposit, reconcile, record newly crossed milestones, and
    /// complete the goal when the target is reached.
    pub fn add_deposit(
        &mut self,
        amount: f64,
        method: DepositMethod,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SavingsError> {
        if amount <= 0.0 {
            return Err(SavingsError::NonPositiveDeposit);
        }

        self.deposits.push(Deposit {
            amount,
            method,
            note,
            created_at: now,
        });
        self.reconcile();
        self.record_milestones(now);

        if self.status == GoalStatus::Active && self.current_amount >= self.target_amount {
            self.status = GoalStatus::Completed;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Append a withdrawal and reconcile. Overdrawing the goal is rejected
    /// before the ledger is touched. A completed goal that drops back below
    /// its target reverts to active.
    pub fn add_withdrawal(
        &mut self,
        amount: f64,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SavingsError> {
        if amount <= 0.0 {
            return Err(SavingsError::NonPositiveWithdrawal);
        }
        if amount > self.current_amount {
            return Err(SavingsError::InsufficientFunds);
        }

        self.withdrawals.push(Withdrawal {
            amount,
            reason,
            created_at: now,
        });
        self.reconcile();

        if self.status == GoalStatus::Completed && self.current_amount < self.target_amount {
            self.status = GoalStatus::Active;
        }
        self.updated_at = now;
        Ok(())
    }

    fn record_milestones(&mut self, now: DateTime<Utc>) {
        if self.target_amount <= 0.0 {
            return;
        }
        let raw_pct = self.current_amount / self.target_amount * 100.0;
        for threshold in MILESTONE_PERCENTAGES {
            let already = self.milestones.iter().any(|m| m.percentage == threshold);
            if !already && raw_pct >= threshold as f64 {
                self.milestones.push(Milestone {
                    percentage: threshold,
                    reached_at: now,
                });
            }
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Request to create a savings goal
#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub target_amount: f64,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<GoalCategory>,
    #[serde(default)]
    pub privacy: Option<GoalPrivacy>,
    #[serde(default)]
    pub auto_deposit: Option<AutoDeposit>,
}

impl CreateGoalRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Goal name is required".to_string());
        }
        if self.name.chars().count() > 100 {
            errors.push("Goal name cannot exceed 100 characters".to_string());
        }
        if self.target_amount <= 0.0 {
            errors.push("Target amount must be greater than zero".to_string());
        }
        if self.description.as_ref().is_some_and(|d| d.chars().count() > 500) {
            errors.push("Description cannot exceed 500 characters".to_string());
        }

        errors
    }
}

/// Request to update mutable goal settings
#[derive(Debug, Deserialize)]
pub struct UpdateGoalRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_amount: Option<f64>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<GoalCategory>,
    #[serde(default)]
    pub status: Option<GoalStatus>,
    #[serde(default)]
    pub privacy: Option<GoalPrivacy>,
    #[serde(default)]
    pub auto_deposit: Option<AutoDeposit>,
}

/// Deposit request body
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: f64,
    #[serde(default)]
    pub method: Option<DepositMethod>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Withdrawal request body
#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    pub amount: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Goal serialized with derived progress fields
#[derive(Debug, Serialize)]
pub struct GoalView {
    #[serde(flatten)]
    pub goal: SavingsGoal,
    pub progress_percentage: f64,
    pub remaining_amount: f64,
    pub days_remaining: Option<i64>,
    pub suggested_monthly_savings: Option<f64>,
}

impl GoalView {
    pub fn new(goal: SavingsGoal) -> Self {
        let today = Utc::now().date_naive();
        let progress_percentage = goal.progress_percentage();
        let remaining_amount = goal.remaining_amount();
        let days_remaining = goal.days_remaining(today);
        let suggested_monthly_savings = goal.suggested_monthly_savings(today);
        Self {
            goal,
            progress_percentage,
            remaining_amount,
            days_remaining,
            suggested_monthly_savings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(target: f64) -> SavingsGoal {
        SavingsGoal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Emergency fund".to_string(),
            description: None,
            target_amount: target,
            current_amount: 0.0,
            target_date: None,
            category: GoalCategory::Emergency,
            status: GoalStatus::Active,
            privacy: GoalPrivacy::Private,
            auto_deposit: AutoDeposit::default(),
            deposits: Vec::new(),
            withdrawals: Vec::new(),
            milestones: Vec::new(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_deposit_records_milestones_once() {
        let mut goal = goal(1000.0);
        let now = Utc::now();

        goal.add_deposit(500.0, DepositMethod::Manual, None, now)
            .unwrap();
        assert_eq!(goal.current_amount, 500.0);
        assert_eq!(goal.progress_percentage(), 50.0);
        let reached: Vec<u32> = goal.milestones.iter().map(|m| m.percentage).collect();
        assert_eq!(reached, vec![25, 50]);

        // Crossing 50% again must not duplicate the milestone
        goal.add_withdrawal(100.0, None, now).unwrap();
        goal.add_deposit(100.0, DepositMethod::Manual, None, now)
            .unwrap();
        let count = goal.milestones.iter().filter(|m| m.percentage == 50).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reaching_target_completes_goal() {
        let mut goal = goal(1000.0);
        let now = Utc::now();

        goal.add_deposit(500.0, DepositMethod::Manual, None, now)
            .unwrap();
        assert_eq!(goal.status, GoalStatus::Active);

        goal.add_deposit(600.0, DepositMethod::Manual, None, now)
            .unwrap();
        assert_eq!(goal.status, GoalStatus::Completed);
        assert_eq!(goal.current_amount, 1100.0);
        // Display percentage is clamped even when over-funded
        assert_eq!(goal.progress_percentage(), 100.0);
        let reached: Vec<u32> = goal.milestones.iter().map(|m| m.percentage).collect();
        assert_eq!(reached, vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_withdrawal_below_target_reactivates_goal() {
        let mut goal = goal(1000.0);
        let now = Utc::now();

        goal.add_deposit(1100.0, DepositMethod::Manual, None, now)
            .unwrap();
        assert_eq!(goal.status, GoalStatus::Completed);

        goal.add_withdrawal(200.0, Some("car repair".to_string()), now)
            .unwrap();
        assert_eq!(goal.current_amount, 900.0);
        assert_eq!(goal.status, GoalStatus::Active);
    }

    #[test]
    fn test_overdraw_is_rejected_before_ledger_changes() {
        let mut goal = goal(1000.0);
        let now = Utc::now();

        goal.add_deposit(100.0, DepositMethod::Manual, None, now)
            .unwrap();
        let err = goal.add_withdrawal(150.0, None, now).unwrap_err();
        assert_eq!(err, SavingsError::InsufficientFunds);
        assert_eq!(goal.current_amount, 100.0);
        assert!(goal.withdrawals.is_empty());
    }

    #[test]
    fn test_reconcile_derives_balance_from_ledger() {
        let mut goal = goal(1000.0);
        let now = Utc::now();
        goal.deposits.push(Deposit {
            amount: 300.0,
            method: DepositMethod::Auto,
            note: None,
            created_at: now,
        });
        goal.deposits.push(Deposit {
            amount: 200.0,
            method: DepositMethod::Manual,
            note: None,
            created_at: now,
        });
        goal.withdrawals.push(Withdrawal {
            amount: 50.0,
            reason: None,
            created_at: now,
        });
        // Stale cached value gets overwritten
        goal.current_amount = 999.0;

        goal.reconcile();
        assert_eq!(goal.current_amount, 450.0);
    }

    #[test]
    fn test_suggested_monthly_savings() {
        let mut goal = goal(1200.0);
        goal.target_date = Some(NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();

        // 183 days -> 7 months
        let suggested = goal.suggested_monthly_savings(today).unwrap();
        assert!((suggested - 1200.0 / 7.0).abs() < 0.01);

        goal.target_date = None;
        assert!(goal.suggested_monthly_savings(today).is_none());
    }
}
