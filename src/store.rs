use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use crate::errors::{Result, ServicingError};
use crate::types::{Loan, LoanId, Repayment, RepaymentId, RepaymentStatus};

/// persistence gateway for loans and their scheduled repayments
///
/// the service layer talks only to this trait, so the servicing logic is
/// testable without a live backing store
pub trait LoanStore: Send + Sync {
    fn create_loan(&self, loan: Loan) -> Result<Loan>;
    fn find_loan(&self, id: LoanId) -> Result<Option<Loan>>;
    fn list_loans(&self) -> Result<Vec<Loan>>;
    fn update_loan(&self, loan: &Loan) -> Result<()>;
    /// remove the loan record; returns false when no such loan exists
    fn delete_loan(&self, id: LoanId) -> Result<bool>;

    fn create_repayment(&self, repayment: Repayment) -> Result<Repayment>;
    /// all repayments for a loan, ordered by due date ascending
    fn repayments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Repayment>>;
    /// the still-pending repayment scheduled for a loan on a given date
    fn find_pending_repayment(
        &self,
        loan_id: LoanId,
        date: NaiveDate,
    ) -> Result<Option<Repayment>>;
    fn count_pending_repayments(&self, loan_id: LoanId) -> Result<u64>;
    /// flip a repayment to PAID only if it is still PENDING
    ///
    /// the check and the write happen atomically, so two concurrent
    /// settlements of the same repayment cannot both succeed; returns
    /// false when the transition was lost
    fn mark_paid_if_pending(&self, id: RepaymentId) -> Result<bool>;
}

#[derive(Default)]
struct Records {
    loans: HashMap<LoanId, Loan>,
    repayments: HashMap<RepaymentId, Repayment>,
}

/// in-memory loan store guarded by a single mutex
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>> {
        self.records.lock().map_err(|_| ServicingError::Storage {
            message: "store lock poisoned".to_string(),
        })
    }
}

impl LoanStore for MemoryStore {
    fn create_loan(&self, loan: Loan) -> Result<Loan> {
        let mut records = self.lock()?;
        records.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    fn find_loan(&self, id: LoanId) -> Result<Option<Loan>> {
        let records = self.lock()?;
        Ok(records.loans.get(&id).cloned())
    }

    fn list_loans(&self) -> Result<Vec<Loan>> {
        let records = self.lock()?;
        Ok(records.loans.values().cloned().collect())
    }

    fn update_loan(&self, loan: &Loan) -> Result<()> {
        let mut records = self.lock()?;
        if !records.loans.contains_key(&loan.id) {
            return Err(ServicingError::LoanNotFound { id: loan.id });
        }
        records.loans.insert(loan.id, loan.clone());
        Ok(())
    }

    fn delete_loan(&self, id: LoanId) -> Result<bool> {
        // repayments are left behind, mirroring the single-record delete
        // of the backing store this stands in for
        let mut records = self.lock()?;
        Ok(records.loans.remove(&id).is_some())
    }

    fn create_repayment(&self, repayment: Repayment) -> Result<Repayment> {
        let mut records = self.lock()?;
        records.repayments.insert(repayment.id, repayment.clone());
        Ok(repayment)
    }

    fn repayments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Repayment>> {
        let records = self.lock()?;
        let mut repayments: Vec<Repayment> = records
            .repayments
            .values()
            .filter(|r| r.loan_id == loan_id)
            .cloned()
            .collect();
        repayments.sort_by_key(|r| r.date);
        Ok(repayments)
    }

    fn find_pending_repayment(
        &self,
        loan_id: LoanId,
        date: NaiveDate,
    ) -> Result<Option<Repayment>> {
        let records = self.lock()?;
        Ok(records
            .repayments
            .values()
            .find(|r| {
                r.loan_id == loan_id && r.date == date && r.status == RepaymentStatus::Pending
            })
            .cloned())
    }

    fn count_pending_repayments(&self, loan_id: LoanId) -> Result<u64> {
        let records = self.lock()?;
        Ok(records
            .repayments
            .values()
            .filter(|r| r.loan_id == loan_id && r.status == RepaymentStatus::Pending)
            .count() as u64)
    }

    fn mark_paid_if_pending(&self, id: RepaymentId) -> Result<bool> {
        let mut records = self.lock()?;
        match records.repayments.get_mut(&id) {
            Some(repayment) if repayment.status == RepaymentStatus::Pending => {
                repayment.status = RepaymentStatus::Paid;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
