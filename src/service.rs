use std::sync::Arc;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use log::debug;

use crate::decimal::Money;
use crate::errors::{Result, ServicingError};
use crate::lifecycle::{authorize_review, Caller, ReviewPolicy};
use crate::schedule;
use crate::store::LoanStore;
use crate::types::{Loan, LoanDetails, LoanId, LoanStatus};

/// function-level servicing operations the web layer invokes per request
///
/// request-scoped and stateless between invocations; every operation runs
/// to completion against the store
pub struct LoanService {
    store: Arc<dyn LoanStore>,
    policy: Arc<dyn ReviewPolicy>,
}

impl LoanService {
    pub fn new(store: Arc<dyn LoanStore>, policy: Arc<dyn ReviewPolicy>) -> Self {
        Self { store, policy }
    }

    /// create a loan and its full pending repayment schedule
    ///
    /// the schedule starts at the injected clock's current date; repayments
    /// are written one at a time after the loan, with no rollback if a
    /// later write fails
    pub fn create_loan(
        &self,
        amount: Money,
        term: u32,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        // reject bad input before anything is written
        schedule::plan_installments(amount, term)?;

        let loan = self.store.create_loan(Loan::new(amount, term))?;

        let start_date = time.now().date_naive();
        schedule::generate_schedule(self.store.as_ref(), loan.id, amount, term, start_date)?;

        debug!("created loan {} for {} over {} periods", loan.id, amount, term);
        Ok(loan)
    }

    pub fn list_loans(&self) -> Result<Vec<Loan>> {
        self.store.list_loans()
    }

    /// loan together with its date-ordered repayment schedule
    pub fn loan_details(&self, loan_id: LoanId) -> Result<LoanDetails> {
        let loan = self.require_loan(loan_id)?;
        let repayments = self.store.repayments_for_loan(loan_id)?;
        Ok(LoanDetails { loan, repayments })
    }

    pub fn delete_loan(&self, loan_id: LoanId) -> Result<()> {
        if !self.store.delete_loan(loan_id)? {
            return Err(ServicingError::LoanNotFound { id: loan_id });
        }
        debug!("deleted loan {}", loan_id);
        Ok(())
    }

    /// operator approval; overwrites the status whatever it currently is
    pub fn approve(&self, loan_id: LoanId, caller: &Caller) -> Result<Loan> {
        self.review(loan_id, caller, true)
    }

    /// operator rejection; overwrites the status whatever it currently is
    pub fn reject(&self, loan_id: LoanId, caller: &Caller) -> Result<Loan> {
        self.review(loan_id, caller, false)
    }

    fn review(&self, loan_id: LoanId, caller: &Caller, approved: bool) -> Result<Loan> {
        let mut loan = self.require_loan(loan_id)?;
        authorize_review(self.policy.as_ref(), caller)?;

        loan.status = LoanStatus::reviewed(approved);
        self.store.update_loan(&loan)?;
        debug!("loan {} reviewed by {}: {:?}", loan.id, caller.name, loan.status);
        Ok(loan)
    }

    /// record payment of one scheduled installment
    ///
    /// exact-match policy: the paid amount must equal the scheduled amount;
    /// under- and overpayments are rejected without touching any state.
    /// the PENDING->PAID flip is a compare-and-swap, so a concurrent
    /// settlement of the same repayment cannot double-credit the loan.
    /// the loan balance decrement itself is a read-modify-write outside
    /// the store lock: concurrent settlements of two different repayments
    /// of one loan can lose a decrement, and remaining_amount is then
    /// reconciled from repayment statuses, which stay authoritative
    pub fn settle_repayment(
        &self,
        loan_id: LoanId,
        amount: Money,
        date: NaiveDate,
    ) -> Result<()> {
        let scheduled = self
            .store
            .find_pending_repayment(loan_id, date)?
            .ok_or(ServicingError::RepaymentNotFound { loan_id, date })?;

        if amount < scheduled.amount {
            return Err(ServicingError::InsufficientAmount {
                due: scheduled.amount,
                provided: amount,
            });
        }
        if amount > scheduled.amount {
            return Err(ServicingError::AmountTooHigh {
                due: scheduled.amount,
                provided: amount,
            });
        }

        if !self.store.mark_paid_if_pending(scheduled.id)? {
            // another settlement won the race since the lookup above
            return Err(ServicingError::RepaymentNotFound { loan_id, date });
        }

        // completeness is re-derived from repayment statuses, never cached
        let all_paid = self.store.count_pending_repayments(loan_id)? == 0;

        let mut loan = self.require_loan(loan_id)?;
        loan.remaining_amount -= amount;
        self.store.update_loan(&loan)?;

        if all_paid {
            self.complete_if_settled(&mut loan)?;
        }

        debug!(
            "settled repayment {} on loan {}: remaining {}",
            scheduled.id, loan_id, loan.remaining_amount
        );
        Ok(())
    }

    /// final lifecycle transition once no repayment remains pending
    fn complete_if_settled(&self, loan: &mut Loan) -> Result<()> {
        loan.status = LoanStatus::Paid;
        self.store.update_loan(loan)?;
        debug!("loan {} fully repaid", loan.id);
        Ok(())
    }

    fn require_loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store
            .find_loan(loan_id)?
            .ok_or(ServicingError::LoanNotFound { id: loan_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::AdminOnly;
    use crate::store::MemoryStore;
    use crate::types::RepaymentStatus;
    use chrono::TimeZone;
    use chrono::Utc;
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn service() -> LoanService {
        LoanService::new(Arc::new(MemoryStore::new()), Arc::new(AdminOnly))
    }

    fn settle_all(svc: &LoanService, loan: &Loan) {
        let details = svc.loan_details(loan.id).unwrap();
        for repayment in details.repayments {
            svc.settle_repayment(loan.id, repayment.amount, repayment.date)
                .unwrap();
        }
    }

    #[test]
    fn test_create_loan_generates_schedule() {
        let svc = service();
        let time = test_time();

        let loan = svc.create_loan(Money::from_major(100), 3, &time).unwrap();
        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.remaining_amount, Money::from_major(100));

        let details = svc.loan_details(loan.id).unwrap();
        assert_eq!(details.repayments.len(), 3);

        let amounts: Vec<Money> = details.repayments.iter().map(|r| r.amount).collect();
        assert_eq!(
            amounts,
            vec![
                Money::from_major(33),
                Money::from_major(33),
                Money::from_major(34)
            ]
        );
        assert!(details
            .repayments
            .iter()
            .all(|r| r.status == RepaymentStatus::Pending));
    }

    #[test]
    fn test_create_loan_rejects_bad_input() {
        let svc = service();
        let time = test_time();

        assert!(matches!(
            svc.create_loan(Money::ZERO, 3, &time),
            Err(ServicingError::InvalidScheduleInput { .. })
        ));
        assert!(matches!(
            svc.create_loan(Money::from_major(100), 0, &time),
            Err(ServicingError::InvalidScheduleInput { .. })
        ));
        // nothing written
        assert!(svc.list_loans().unwrap().is_empty());
    }

    #[test]
    fn test_settlement_requires_exact_amount() {
        let svc = service();
        let time = test_time();
        let loan = svc.create_loan(Money::from_major(100), 3, &time).unwrap();
        let first = svc.loan_details(loan.id).unwrap().repayments[0].clone();

        assert!(matches!(
            svc.settle_repayment(loan.id, first.amount - Money::ONE, first.date),
            Err(ServicingError::InsufficientAmount { .. })
        ));
        assert!(matches!(
            svc.settle_repayment(loan.id, first.amount + Money::ONE, first.date),
            Err(ServicingError::AmountTooHigh { .. })
        ));

        // nothing mutated by the failed attempts
        let details = svc.loan_details(loan.id).unwrap();
        assert_eq!(details.loan.remaining_amount, Money::from_major(100));
        assert_eq!(details.repayments[0].status, RepaymentStatus::Pending);
    }

    #[test]
    fn test_settlement_decrements_remaining() {
        let svc = service();
        let time = test_time();
        let loan = svc.create_loan(Money::from_major(100), 3, &time).unwrap();
        let first = svc.loan_details(loan.id).unwrap().repayments[0].clone();

        svc.settle_repayment(loan.id, first.amount, first.date).unwrap();

        let details = svc.loan_details(loan.id).unwrap();
        assert_eq!(details.loan.remaining_amount, Money::from_major(67));
        assert_eq!(details.repayments[0].status, RepaymentStatus::Paid);
        // not yet fully repaid
        assert_eq!(details.loan.status, LoanStatus::Pending);
    }

    #[test]
    fn test_settling_last_repayment_completes_loan() {
        let svc = service();
        let time = test_time();
        let loan = svc
            .create_loan(Money::from_decimal(dec!(100.50)), 4, &time)
            .unwrap();

        settle_all(&svc, &loan);

        let details = svc.loan_details(loan.id).unwrap();
        assert_eq!(details.loan.status, LoanStatus::Paid);
        assert!(details.loan.remaining_amount.is_zero());
    }

    #[test]
    fn test_settling_paid_repayment_rejected() {
        let svc = service();
        let time = test_time();
        let loan = svc.create_loan(Money::from_major(100), 3, &time).unwrap();
        let first = svc.loan_details(loan.id).unwrap().repayments[0].clone();

        svc.settle_repayment(loan.id, first.amount, first.date).unwrap();
        let remaining_after = svc.loan_details(loan.id).unwrap().loan.remaining_amount;

        assert!(matches!(
            svc.settle_repayment(loan.id, first.amount, first.date),
            Err(ServicingError::RepaymentNotFound { .. })
        ));
        // no double decrement
        assert_eq!(
            svc.loan_details(loan.id).unwrap().loan.remaining_amount,
            remaining_after
        );
    }

    #[test]
    fn test_settlement_unknown_date_rejected() {
        let svc = service();
        let time = test_time();
        let loan = svc.create_loan(Money::from_major(100), 3, &time).unwrap();

        assert!(matches!(
            svc.settle_repayment(
                loan.id,
                Money::from_major(33),
                NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
            ),
            Err(ServicingError::RepaymentNotFound { .. })
        ));
    }

    #[test]
    fn test_approve_and_reject() {
        let svc = service();
        let time = test_time();
        let ops = Caller::admin("ops");
        let loan = svc.create_loan(Money::from_major(100), 3, &time).unwrap();

        let approved = svc.approve(loan.id, &ops).unwrap();
        assert_eq!(approved.status, LoanStatus::Approved);

        // no transition guard: the latest decision wins
        let rejected = svc.reject(loan.id, &ops).unwrap();
        assert_eq!(rejected.status, LoanStatus::Rejected);

        let approved_again = svc.approve(loan.id, &ops).unwrap();
        assert_eq!(approved_again.status, LoanStatus::Approved);
    }

    #[test]
    fn test_review_forbidden_for_non_admin() {
        let svc = service();
        let time = test_time();
        let loan = svc.create_loan(Money::from_major(100), 3, &time).unwrap();

        assert!(matches!(
            svc.approve(loan.id, &Caller::user("borrower")),
            Err(ServicingError::Forbidden)
        ));
        assert_eq!(
            svc.loan_details(loan.id).unwrap().loan.status,
            LoanStatus::Pending
        );
    }

    #[test]
    fn test_review_missing_loan() {
        let svc = service();
        assert!(matches!(
            svc.approve(Uuid::new_v4(), &Caller::admin("ops")),
            Err(ServicingError::LoanNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_loan() {
        let svc = service();
        let time = test_time();
        let loan = svc.create_loan(Money::from_major(100), 3, &time).unwrap();

        svc.delete_loan(loan.id).unwrap();
        assert!(matches!(
            svc.loan_details(loan.id),
            Err(ServicingError::LoanNotFound { .. })
        ));
        assert!(matches!(
            svc.delete_loan(loan.id),
            Err(ServicingError::LoanNotFound { .. })
        ));
    }

    #[test]
    fn test_weekly_due_dates_from_injected_clock() {
        let svc = service();
        let time = test_time();
        let loan = svc.create_loan(Money::from_major(100), 3, &time).unwrap();

        let dates: Vec<NaiveDate> = svc
            .loan_details(loan.id)
            .unwrap()
            .repayments
            .iter()
            .map(|r| r.date)
            .collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            ]
        );
    }
}
