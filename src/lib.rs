pub mod api;
pub mod decimal;
pub mod errors;
pub mod lifecycle;
pub mod schedule;
pub mod service;
pub mod store;
pub mod types;

// re-export key types
pub use decimal::Money;
pub use errors::{Result, ServicingError};
pub use lifecycle::{AdminOnly, Caller, ReviewPolicy};
pub use schedule::{generate_schedule, plan_installments, InstallmentPlan};
pub use service::LoanService;
pub use store::{LoanStore, MemoryStore};
pub use types::{
    Loan, LoanDetails, LoanId, LoanStatus, Repayment, RepaymentId, RepaymentStatus,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
