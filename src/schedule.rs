use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{Result, ServicingError};
use crate::store::LoanStore;
use crate::types::{LoanId, Repayment, RepaymentStatus};

/// per-period amounts for a loan's repayment plan
///
/// every period except the last owes `base`, the whole-unit floor of
/// `amount / term`; the accumulated rounding remainder is folded into
/// `last` so the plan sums back to the principal exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentPlan {
    pub base: Money,
    pub last: Money,
}

impl InstallmentPlan {
    /// amount due for a given period index; the final period (and any
    /// index at or beyond it, including a zero term) owes `last`
    pub fn amount_for(&self, period: u32, term: u32) -> Money {
        if period < term.saturating_sub(1) {
            self.base
        } else {
            self.last
        }
    }
}

/// split a principal into `term` per-period amounts
///
/// pure calculation, no I/O; rejects non-positive amounts and zero terms
pub fn plan_installments(amount: Money, term: u32) -> Result<InstallmentPlan> {
    if term == 0 || !amount.is_positive() {
        return Err(ServicingError::InvalidScheduleInput { amount, term });
    }

    let base = (amount / Decimal::from(term)).floor();
    // remainder accumulated over term periods lands in the final one
    let last = amount - base * Decimal::from(term - 1);

    Ok(InstallmentPlan { base, last })
}

/// due date for a period index, on a fixed weekly cadence
pub fn repayment_date(start_date: NaiveDate, period: u32) -> NaiveDate {
    start_date + Duration::days(7 * period as i64)
}

/// create the full pending schedule for a newly created loan
///
/// persists one repayment per period, in period order; a failure partway
/// leaves the already-written periods in place (no rollback)
pub fn generate_schedule(
    store: &dyn LoanStore,
    loan_id: LoanId,
    amount: Money,
    term: u32,
    start_date: NaiveDate,
) -> Result<Vec<Repayment>> {
    let plan = plan_installments(amount, term)?;

    let mut repayments = Vec::with_capacity(term as usize);
    for period in 0..term {
        let repayment = Repayment {
            id: Uuid::new_v4(),
            loan_id,
            amount: plan.amount_for(period, term),
            date: repayment_date(start_date, period),
            status: RepaymentStatus::Pending,
        };
        repayments.push(store.create_repayment(repayment)?);
    }

    Ok(repayments)
}
