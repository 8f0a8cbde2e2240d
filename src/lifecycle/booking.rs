//! Booking outcomes: the two ways out of BOOKING, plus later edits to the
//! attachments of a completed booking.

use chrono::{DateTime, Utc};

use super::machine::{ensure_transition, record};
use super::{Actor, LifecycleError};
use crate::db::models::travel_request::{
    AuditAction, BookingFailure, BookingReceipt, BookingResult, RequestStatus, TravelRequest,
};

pub fn complete(
    request: &mut TravelRequest,
    actor: &Actor,
    receipt: BookingReceipt,
    at: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    ensure_transition(request.status, RequestStatus::Success)?;

    request.status = RequestStatus::Success;
    request.booking_result = Some(BookingResult::Completed(receipt));
    record(request, AuditAction::BookingCompleted, actor, None, at);
    Ok(())
}

pub fn fail(
    request: &mut TravelRequest,
    actor: &Actor,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    ensure_transition(request.status, RequestStatus::Failed)?;

    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LifecycleError::Validation(
            "a failure reason is required".to_string(),
        ));
    }

    request.status = RequestStatus::Failed;
    request.booking_result = Some(BookingResult::Failed(BookingFailure {
        failure_reason: reason.to_string(),
    }));
    record(request, AuditAction::BookingFailed, actor, Some(reason.to_string()), at);
    Ok(())
}

/// Replaces the attachment list wholesale. Status is left alone.
pub fn replace_files(
    request: &mut TravelRequest,
    actor: &Actor,
    files: Vec<String>,
    at: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    let count = files.len();
    match request.booking_result.as_mut() {
        None => return Err(LifecycleError::NoBookingResult),
        Some(BookingResult::Failed(_)) => {
            return Err(LifecycleError::InvalidState {
                status: request.status,
                operation: "attach files to a failed booking",
            })
        }
        Some(BookingResult::Completed(receipt)) => receipt.files = files,
    }

    record(
        request,
        AuditAction::FilesUpdated,
        actor,
        Some(format!("booking attachments replaced ({count} file(s))")),
        at,
    );
    Ok(())
}
