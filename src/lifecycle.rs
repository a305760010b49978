use crate::errors::{Result, ServicingError};
use crate::types::LoanStatus;

/// identity of the caller asking for a loan review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub name: String,
    pub admin: bool,
}

impl Caller {
    pub fn admin(name: impl Into<String>) -> Self {
        Self { name: name.into(), admin: true }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self { name: name.into(), admin: false }
    }
}

/// authorization capability for approve/reject decisions
///
/// injected so the servicing operations stay independent of how callers
/// are actually authenticated
pub trait ReviewPolicy: Send + Sync {
    fn can_review(&self, caller: &Caller) -> bool;
}

/// only admin callers may approve or reject loans
pub struct AdminOnly;

impl ReviewPolicy for AdminOnly {
    fn can_review(&self, caller: &Caller) -> bool {
        caller.admin
    }
}

/// check a review request against the policy
pub fn authorize_review(policy: &dyn ReviewPolicy, caller: &Caller) -> Result<()> {
    if policy.can_review(caller) {
        Ok(())
    } else {
        Err(ServicingError::Forbidden)
    }
}

impl LoanStatus {
    /// no further operator transition is expected from this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Rejected | LoanStatus::Paid)
    }

    /// operator review outcome
    ///
    /// intentionally applies regardless of the current status: re-reviewing
    /// an approved, rejected, or even paid loan overwrites the status with
    /// the latest decision
    pub fn reviewed(approved: bool) -> LoanStatus {
        if approved {
            LoanStatus::Approved
        } else {
            LoanStatus::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_only_policy() {
        let policy = AdminOnly;
        assert!(policy.can_review(&Caller::admin("ops")));
        assert!(!policy.can_review(&Caller::user("borrower")));
    }

    #[test]
    fn test_authorize_review() {
        assert!(authorize_review(&AdminOnly, &Caller::admin("ops")).is_ok());
        assert!(matches!(
            authorize_review(&AdminOnly, &Caller::user("borrower")),
            Err(ServicingError::Forbidden)
        ));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(LoanStatus::Rejected.is_terminal());
        assert!(LoanStatus::Paid.is_terminal());
        assert!(!LoanStatus::Pending.is_terminal());
        assert!(!LoanStatus::Approved.is_terminal());
    }

    #[test]
    fn test_review_outcome() {
        assert_eq!(LoanStatus::reviewed(true), LoanStatus::Approved);
        assert_eq!(LoanStatus::reviewed(false), LoanStatus::Rejected);
    }
}
