//! Payment routes. `POST /api/payments` records a payment the caller already
//! made and trusts its transaction hash as-is; `POST /api/payments/process`
//! marks a submission paid and approved. Neither touches a chain.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;

use crate::api::{bad_request, db_error, ApiError, AppState};
use crate::database::NewPayment;
use crate::models::{
    parse_finite_amount, Payment, ProcessPaymentRequest, RecordPaymentRequest, SubmissionStatus,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    #[serde(flatten)]
    pub payment: Payment,
    pub builder: Option<PaymentBuilder>,
}

#[derive(Debug, Serialize)]
pub struct PaymentBuilder {
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentResponse {
    pub success: bool,
    pub transaction_hash: String,
    pub message: String,
}

/// List all recorded payments, newest first
pub async fn list_payments(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let rows = state
        .db
        .list_payments()
        .await
        .map_err(|e| db_error(e, "Payment not found", "fetch payments"))?;

    let payments = rows
        .into_iter()
        .map(|row| {
            let builder = row.builder_email.clone().map(|email| PaymentBuilder {
                name: row.builder_name.clone(),
                email,
            });
            PaymentResponse {
                payment: Payment {
                    id: row.id,
                    stream_id: row.stream_id,
                    amount: row.amount,
                    token: row.token,
                    from_address: row.from_address,
                    to_address: row.to_address,
                    tx_hash: row.tx_hash,
                    builder_id: row.builder_id,
                    created_at: row.created_at,
                },
                builder,
            }
        })
        .collect();

    Ok(Json(payments))
}

/// Record a payment made outside the service
pub async fn record_payment(
    State(state): State<AppState>,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let amount = match req.amount.as_ref() {
        Some(value) => parse_finite_amount(value)
            .ok_or_else(|| bad_request("Amount must be a finite number"))?,
        None => return Err(bad_request("Amount is required")),
    };

    // An unknown builder email does not fail the record; the row just
    // stays unlinked.
    let builder_id = match req.builder_email.as_deref() {
        Some(email) => state
            .db
            .find_user_by_email(email)
            .await
            .map_err(|e| db_error(e, "Builder not found", "record payment"))?
            .map(|builder| builder.id),
        None => None,
    };

    let payment = NewPayment {
        stream_id: req.stream_id.as_deref(),
        amount,
        token: req.token.as_deref(),
        from_address: req.from.as_deref(),
        to_address: req.to.as_deref(),
        tx_hash: req.tx_hash.as_deref(),
        builder_id,
    };
    let payment_id = state
        .db
        .create_payment(&payment)
        .await
        .map_err(|e| db_error(e, "Payment not found", "record payment"))?;

    info!(payment_id, amount, "Payment recorded");

    let row = state
        .db
        .get_payment(payment_id)
        .await
        .map_err(|e| db_error(e, "Payment not found", "record payment"))?;

    Ok((StatusCode::CREATED, Json(Payment::from(row))))
}

/// Mark a submission paid: sets its amount and notes, flips it to Approved
/// and echoes the caller's transaction hash back. Refuses to proceed when
/// the builder has no wallet address on file.
pub async fn process_payment(
    State(state): State<AppState>,
    Json(req): Json<ProcessPaymentRequest>,
) -> Result<Json<ProcessPaymentResponse>, ApiError> {
    let mut missing = Vec::new();
    if req.submission_id.is_none() {
        missing.push("submissionId");
    }
    if req.amount.is_none() {
        missing.push("amount");
    }
    if req.transaction_hash.is_none() {
        missing.push("transactionHash");
    }
    if !missing.is_empty() {
        return Err(bad_request(&format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let submission_id = req.submission_id.unwrap_or_default();
    let transaction_hash = req.transaction_hash.unwrap_or_default();
    let amount = req
        .amount
        .as_ref()
        .and_then(parse_finite_amount)
        .ok_or_else(|| bad_request("Amount must be a finite number"))?;

    let submission = state
        .db
        .get_submission(submission_id)
        .await
        .map_err(|e| db_error(e, "Submission not found", "process payment"))?;

    let builder = state
        .db
        .get_user_by_id(submission.builder_id)
        .await
        .map_err(|e| db_error(e, "Builder not found", "process payment"))?;
    let wallet = builder
        .wallet_address
        .filter(|w| !w.trim().is_empty())
        .ok_or_else(|| bad_request("Builder has no wallet address"))?;

    state
        .db
        .update_submission(
            submission_id,
            Some(SubmissionStatus::Approved.as_str()),
            req.review_notes.as_deref(),
            Some(amount),
        )
        .await
        .map_err(|e| db_error(e, "Submission not found", "process payment"))?;

    info!(
        submission_id,
        amount,
        tx_hash = transaction_hash,
        "Payment processed"
    );

    Ok(Json(ProcessPaymentResponse {
        success: true,
        transaction_hash,
        message: format!("Payment of {} XLM sent to {}", amount, wallet),
    }))
}
