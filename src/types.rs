use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a scheduled repayment
pub type RepaymentId = Uuid;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// created, awaiting operator review
    Pending,
    /// cleared for servicing by an operator
    Approved,
    /// declined by an operator, terminal
    Rejected,
    /// every scheduled repayment settled
    Paid,
}

/// scheduled repayment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepaymentStatus {
    Pending,
    Paid,
}

/// a principal amount repaid over a fixed number of weekly periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: LoanId,
    pub amount: Money,
    pub term: u32,
    pub status: LoanStatus,
    pub remaining_amount: Money,
}

impl Loan {
    /// new loan awaiting review, owing its full principal
    pub fn new(amount: Money, term: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            term,
            status: LoanStatus::Pending,
            remaining_amount: amount,
        }
    }
}

/// one scheduled installment of a loan's repayment plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repayment {
    pub id: RepaymentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub date: NaiveDate,
    pub status: RepaymentStatus,
}

/// loan together with its full repayment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDetails {
    pub loan: Loan,
    pub repayments: Vec<Repayment>,
}
