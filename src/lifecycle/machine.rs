use chrono::{DateTime, SubsecRound, Utc};

use super::{Actor, LifecycleError};
use crate::db::models::travel_request::{AuditAction, AuditLogEntry, RequestStatus, TravelRequest};
use crate::utils::ids::{generate_id, HISTORY_PREFIX};

/// Current time at the precision Postgres keeps, so a returned entity and a
/// later read of it agree.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Directed graph of legal status changes. Terminal statuses have no exits.
pub fn legal_targets(from: RequestStatus) -> &'static [RequestStatus] {
    use RequestStatus::*;
    match from {
        Submitted => &[Accepted, Cancelled, Closed],
        Accepted => &[InfoNeeded, Booking, Cancelled, Closed],
        InfoNeeded => &[Accepted, Cancelled, Closed],
        Booking => &[Success, Failed, Cancelled, Closed],
        Success | Failed | Cancelled | Closed => &[],
    }
}

pub fn ensure_transition(from: RequestStatus, to: RequestStatus) -> Result<(), LifecycleError> {
    if legal_targets(from).contains(&to) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition { from, to })
    }
}

/// Appends one audit entry and refreshes `updated_at`.
pub fn record(
    request: &mut TravelRequest,
    action: AuditAction,
    actor: &Actor,
    details: Option<String>,
    at: DateTime<Utc>,
) {
    request.history.push(AuditLogEntry {
        id: generate_id(HISTORY_PREFIX),
        action,
        actor: actor.name.clone(),
        timestamp: at,
        details,
    });
    request.updated_at = at;
}

/// Outcomes that only the booking operations may set, since they carry a result.
pub fn is_booking_outcome(status: RequestStatus) -> bool {
    matches!(status, RequestStatus::Success | RequestStatus::Failed)
}

/// Moves the request to `target`. The first acceptance assigns the request to the
/// accepting actor; later acceptances keep the existing assignee.
pub fn apply_transition(
    request: &mut TravelRequest,
    actor: &Actor,
    target: RequestStatus,
    details: Option<String>,
    at: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    ensure_transition(request.status, target)?;
    if is_booking_outcome(target) {
        return Err(LifecycleError::InvalidTransition {
            from: request.status,
            to: target,
        });
    }

    request.status = target;
    if target == RequestStatus::Accepted && request.assigned_to.is_none() {
        request.assigned_to = Some(actor.id.clone());
    }

    let details = details
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());
    record(request, AuditAction::StatusChange(target), actor, details, at);
    Ok(())
}
