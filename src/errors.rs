use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::LoanId;

#[derive(Error, Debug)]
pub enum ServicingError {
    #[error("invalid schedule input: amount {amount}, term {term}")]
    InvalidScheduleInput {
        amount: Money,
        term: u32,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("repayment not found or already paid: loan {loan_id}, date {date}")]
    RepaymentNotFound {
        loan_id: LoanId,
        date: NaiveDate,
    },

    #[error("repayment amount is insufficient: due {due}, provided {provided}")]
    InsufficientAmount {
        due: Money,
        provided: Money,
    },

    #[error("amount is greater than scheduled repayment: due {due}, provided {provided}")]
    AmountTooHigh {
        due: Money,
        provided: Money,
    },

    #[error("caller is not permitted to review loans")]
    Forbidden,

    #[error("storage failure: {message}")]
    Storage {
        message: String,
    },
}

impl ServicingError {
    /// true for caller mistakes reported with a 4xx outcome
    pub fn is_validation(&self) -> bool {
        !matches!(self, ServicingError::Storage { .. })
    }
}

pub type Result<T> = std::result::Result<T, ServicingError>;
