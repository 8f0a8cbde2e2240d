use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::machine::record;
use super::{Actor, LifecycleError};
use crate::db::models::travel_request::{AuditAction, RequestDetails, RequestType, TravelRequest};

/// Checks shared by creation and edits.
pub fn validate_details(details: &RequestDetails) -> Result<(), LifecycleError> {
    if details.base().purpose.trim().is_empty() {
        return Err(LifecycleError::Validation("purpose must not be empty".to_string()));
    }
    Ok(())
}

/// Overlays the top-level keys of `patch` onto the stored payload. Arrays such as
/// `travelers` are therefore replaced wholesale. The result must still decode as
/// the same scenario, and every non-null key must be a field of that scenario.
pub fn merge_patch(
    details: &RequestDetails,
    patch: &Map<String, Value>,
) -> Result<RequestDetails, LifecycleError> {
    let kind = details.kind();
    let mut merged = details
        .to_value()
        .map_err(|e| LifecycleError::Validation(e.to_string()))?;
    let Value::Object(fields) = &mut merged else {
        return Err(LifecycleError::Validation(format!("stored {kind} payload is not an object")));
    };
    for (key, value) in patch {
        fields.insert(key.clone(), value.clone());
    }

    let merged = RequestDetails::from_value(kind, merged)
        .map_err(|e| LifecycleError::Validation(format!("invalid {kind} payload: {e}")))?;
    validate_details(&merged)?;
    reject_unknown_keys(kind, &merged, patch)?;
    Ok(merged)
}

/// Decoding drops keys the scenario does not know, so a non-null key missing from
/// the re-encoded payload was never a field.
fn reject_unknown_keys(
    kind: RequestType,
    merged: &RequestDetails,
    patch: &Map<String, Value>,
) -> Result<(), LifecycleError> {
    let encoded = merged
        .to_value()
        .map_err(|e| LifecycleError::Validation(e.to_string()))?;
    let mut unknown: Vec<&str> = patch
        .iter()
        .filter(|(key, value)| !value.is_null() && encoded.get(key.as_str()).is_none())
        .map(|(key, _)| key.as_str())
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(LifecycleError::Validation(format!(
        "unknown {kind} fields: {}",
        unknown.join(", ")
    )))
}

/// Applies an owner edit. Callers authorize first. An edit that leaves the
/// payload as it was is accepted without an audit entry.
pub fn apply_update(
    request: &mut TravelRequest,
    actor: &Actor,
    patch: &Map<String, Value>,
    at: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    let merged = merge_patch(&request.details, patch)?;
    if merged == request.details {
        return Ok(());
    }
    request.details = merged;
    record(request, AuditAction::Updated, actor, None, at);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::travel_request::{RequestDetails, Urgency};
    use crate::db::models::user::Role;
    use crate::lifecycle::machine::now;
    use crate::lifecycle::test_support::sample_request;
    use serde_json::json;

    fn patch(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("patch must be an object"),
        }
    }

    #[test]
    fn scalars_overwrite_and_travelers_are_replaced() {
        let request = sample_request();
        let merged = merge_patch(
            &request.details,
            &patch(json!({
                "urgency": "URGENT",
                "arrivalCity": "Guangzhou",
                "travelers": [
                    { "name": "Zhang San", "idType": "护照", "idNumber": "E1234", "phone": "139" },
                    { "name": "Li Si", "idType": "护照", "idNumber": "E5678", "phone": "137" }
                ]
            })),
        )
        .unwrap();

        let RequestDetails::Flight(flight) = merged else {
            panic!("type must not change");
        };
        assert_eq!(flight.base.urgency, Urgency::Urgent);
        assert_eq!(flight.arrival_city, "Guangzhou");
        assert_eq!(flight.departure_city, "Beijing");
        assert_eq!(flight.base.purpose, "conference");
        let names: Vec<&str> = flight.base.travelers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Zhang San", "Li Si"]);
    }

    #[test]
    fn null_clears_optional_fields() {
        let request = sample_request();
        let with_notes = merge_patch(&request.details, &patch(json!({ "notes": "window seat" }))).unwrap();
        assert_eq!(with_notes.base().notes.as_deref(), Some("window seat"));

        let cleared = merge_patch(&with_notes, &patch(json!({ "notes": null }))).unwrap();
        assert!(cleared.base().notes.is_none());
    }

    #[test]
    fn patches_that_break_the_payload_are_rejected() {
        let request = sample_request();
        for bad in [
            json!({ "departureDate": "next tuesday" }),
            json!({ "departureCity": null }),
            json!({ "purpose": "   " }),
        ] {
            assert!(matches!(
                merge_patch(&request.details, &patch(bad)),
                Err(LifecycleError::Validation(_))
            ));
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let request = sample_request();
        for bad in [
            json!({ "type": "HOTEL" }),
            json!({ "foo": 1 }),
            json!({ "arivalCity": "Guangzhou", "notes": "typo" }),
        ] {
            let err = merge_patch(&request.details, &patch(bad)).unwrap_err();
            let LifecycleError::Validation(message) = err else {
                panic!("expected a validation error");
            };
            assert!(message.starts_with("unknown FLIGHT fields"), "{message}");
        }
    }

    #[test]
    fn unchanged_payload_adds_no_history() {
        let mut request = sample_request();
        let owner = Actor::new("u1", "Wang", Role::User);
        let before = request.clone();

        apply_update(&mut request, &owner, &patch(json!({ "departureCity": "Beijing" })), now())
            .unwrap();
        apply_update(&mut request, &owner, &Map::new(), now()).unwrap();

        assert_eq!(request, before);
    }

    #[test]
    fn update_logs_once_without_touching_status() {
        let mut request = sample_request();
        let owner = Actor::new("u1", "Wang", Role::User);
        let before = request.clone();

        apply_update(&mut request, &owner, &patch(json!({ "notes": "aisle" })), now()).unwrap();

        assert_eq!(request.status, before.status);
        assert_eq!(request.history.len(), before.history.len() + 1);
        assert_eq!(request.history.last().unwrap().action, AuditAction::Updated);
    }
}
