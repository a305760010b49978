use std::convert::Infallible;
use std::sync::Arc;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use log::error;
use serde::Deserialize;
use serde_json::json;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::decimal::Money;
use crate::errors::ServicingError;
use crate::lifecycle::Caller;
use crate::service::LoanService;
use crate::types::LoanId;

/// shared per-request context for the handlers
#[derive(Clone)]
pub struct Context {
    pub service: Arc<LoanService>,
    pub time: Arc<SafeTimeProvider>,
}

#[derive(Debug, Deserialize)]
struct CreateLoanRequest {
    amount: Money,
    term: u32,
}

#[derive(Debug, Deserialize)]
struct SettleRequest {
    amount: Money,
    date: NaiveDate,
}

/// the full /api/loans route tree
pub fn routes(
    context: Context,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list = warp::path!("api" / "loans")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(list_loans);

    let create = warp::path!("api" / "loans")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(context.clone()))
        .and_then(create_loan);

    let details = warp::path!("api" / "loans" / LoanId)
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(loan_details);

    let delete = warp::path!("api" / "loans" / LoanId)
        .and(warp::delete())
        .and(with_context(context.clone()))
        .and_then(delete_loan);

    let settle = warp::path!("api" / "loans" / LoanId / "repayments")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(context.clone()))
        .and_then(settle_repayment);

    let approve = warp::path!("api" / "loans" / LoanId / "approve")
        .and(warp::put())
        .and(caller())
        .and(with_context(context.clone()))
        .and_then(approve_loan);

    let reject = warp::path!("api" / "loans" / LoanId / "reject")
        .and(warp::put())
        .and(caller())
        .and(with_context(context))
        .and_then(reject_loan);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "x-admin"])
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"]);

    list.or(create)
        .or(details)
        .or(delete)
        .or(settle)
        .or(approve)
        .or(reject)
        .with(cors)
}

fn with_context(
    context: Context,
) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

/// caller identity from the x-admin header; absent means admin, so a
/// bare deployment behaves as a single trusted operator while the 403
/// path stays reachable
fn caller() -> impl Filter<Extract = (Caller,), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-admin").map(|value: Option<String>| {
        match value.as_deref() {
            Some("false") => Caller::user("api"),
            _ => Caller::admin("api"),
        }
    })
}

async fn list_loans(context: Context) -> Result<impl Reply, Infallible> {
    Ok(match context.service.list_loans() {
        Ok(loans) => json_reply(StatusCode::OK, &loans),
        Err(e) => error_reply(e),
    })
}

async fn create_loan(
    request: CreateLoanRequest,
    context: Context,
) -> Result<impl Reply, Infallible> {
    Ok(
        match context
            .service
            .create_loan(request.amount, request.term, context.time.as_ref())
        {
            Ok(loan) => json_reply(StatusCode::CREATED, &loan),
            Err(e) => error_reply(e),
        },
    )
}

async fn loan_details(loan_id: LoanId, context: Context) -> Result<impl Reply, Infallible> {
    Ok(match context.service.loan_details(loan_id) {
        Ok(details) => json_reply(StatusCode::OK, &details),
        Err(e) => error_reply(e),
    })
}

async fn delete_loan(loan_id: LoanId, context: Context) -> Result<impl Reply, Infallible> {
    Ok(match context.service.delete_loan(loan_id) {
        Ok(()) => message_reply(StatusCode::OK, "Loan deleted successfully"),
        Err(e) => error_reply(e),
    })
}

async fn settle_repayment(
    loan_id: LoanId,
    request: SettleRequest,
    context: Context,
) -> Result<impl Reply, Infallible> {
    Ok(
        match context
            .service
            .settle_repayment(loan_id, request.amount, request.date)
        {
            Ok(()) => message_reply(StatusCode::OK, "Repayment processed successfully"),
            Err(e) => error_reply(e),
        },
    )
}

async fn approve_loan(
    loan_id: LoanId,
    caller: Caller,
    context: Context,
) -> Result<impl Reply, Infallible> {
    Ok(match context.service.approve(loan_id, &caller) {
        Ok(_) => message_reply(StatusCode::OK, "Loan approved successfully"),
        Err(e) => error_reply(e),
    })
}

async fn reject_loan(
    loan_id: LoanId,
    caller: Caller,
    context: Context,
) -> Result<impl Reply, Infallible> {
    Ok(match context.service.reject(loan_id, &caller) {
        Ok(_) => message_reply(StatusCode::OK, "Loan rejected"),
        Err(e) => error_reply(e),
    })
}

fn json_reply<T: serde::Serialize>(
    status: StatusCode,
    body: &T,
) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(body), status)
}

fn message_reply(
    status: StatusCode,
    message: &str,
) -> warp::reply::WithStatus<warp::reply::Json> {
    json_reply(status, &json!({ "message": message }))
}

/// map a servicing error onto the wire
///
/// validation errors carry their own message with a 4xx status; storage
/// failures are logged for operators and reported with a generic body
fn error_reply(error: ServicingError) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = match &error {
        ServicingError::InvalidScheduleInput { .. }
        | ServicingError::RepaymentNotFound { .. }
        | ServicingError::InsufficientAmount { .. }
        | ServicingError::AmountTooHigh { .. } => StatusCode::BAD_REQUEST,
        ServicingError::LoanNotFound { .. } => StatusCode::NOT_FOUND,
        ServicingError::Forbidden => StatusCode::FORBIDDEN,
        ServicingError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if error.is_validation() {
        json_reply(status, &json!({ "error": error.to_string() }))
    } else {
        error!(target: "loan::api", "storage failure: {}", error);
        json_reply(status, &json!({ "error": "internal server error" }))
    }
}
