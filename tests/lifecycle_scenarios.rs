use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio_test::{assert_err, assert_ok};

use travel_desk::db::models::travel_request::{
    AuditAction, BookingReceipt, BookingResult, NewTravelRequest, RequestFilter, RequestStatus,
    RequestType, TravelRequest,
};
use travel_desk::db::models::user::Role;
use travel_desk::db::store::{InMemoryRequestStore, RequestStore};
use travel_desk::lifecycle::{Actor, LifecycleError, RequestLifecycle};

fn lifecycle() -> RequestLifecycle {
    RequestLifecycle::new(Arc::new(InMemoryRequestStore::default()))
}

fn owner() -> Actor {
    Actor::new("u1", "Wang", Role::User)
}

fn admin() -> Actor {
    Actor::new("admin1", "Admin One", Role::Admin)
}

fn other_admin() -> Actor {
    Actor::new("admin2", "Admin Two", Role::Admin)
}

fn stranger() -> Actor {
    Actor::new("u2", "Zhao", Role::User)
}

fn flight_request() -> NewTravelRequest {
    NewTravelRequest {
        request_type: RequestType::Flight,
        data: json!({
            "purpose": "conference",
            "urgency": "NORMAL",
            "travelers": [{
                "name": "Li Wei",
                "idType": "身份证",
                "idNumber": "110101199001011234",
                "phone": "13800000000"
            }],
            "departureCity": "Beijing",
            "arrivalCity": "Shanghai",
            "departureDate": "2024-06-01"
        }),
    }
}

fn patch(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("patch must be an object, got {other}"),
    }
}

async fn created(lifecycle: &RequestLifecycle) -> TravelRequest {
    lifecycle.create(&owner(), flight_request()).await.unwrap()
}

async fn in_booking(lifecycle: &RequestLifecycle) -> TravelRequest {
    let request = created(lifecycle).await;
    lifecycle
        .transition(&admin(), &request.id, RequestStatus::Accepted, None)
        .await
        .unwrap();
    lifecycle
        .transition(&admin(), &request.id, RequestStatus::Booking, None)
        .await
        .unwrap()
}

#[tokio::test]
async fn creation_starts_submitted_with_one_entry() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;

    assert!(request.id.starts_with("REQ-"));
    assert_eq!(request.status, RequestStatus::Submitted);
    assert_eq!(request.owner_id, "u1");
    assert_eq!(request.owner_name, "Wang");
    assert_eq!(request.history.len(), 1);
    assert_eq!(request.history[0].action, AuditAction::Created);
    assert_eq!(request.history[0].actor, "Wang");
    assert!(request.assigned_to.is_none());
}

#[tokio::test]
async fn creation_rejects_payloads_of_the_wrong_shape() {
    let lifecycle = lifecycle();
    let mut new = flight_request();
    new.request_type = RequestType::Hotel;
    assert!(matches!(
        lifecycle.create(&owner(), new).await,
        Err(LifecycleError::Validation(_))
    ));

    let mut blank = flight_request();
    blank.data["purpose"] = json!("  ");
    assert!(matches!(
        lifecycle.create(&owner(), blank).await,
        Err(LifecycleError::Validation(_))
    ));
}

#[tokio::test]
async fn acceptance_assigns_the_admin() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;

    let accepted = lifecycle
        .transition(&admin(), &request.id, RequestStatus::Accepted, None)
        .await
        .unwrap();

    assert_eq!(accepted.status, RequestStatus::Accepted);
    assert_eq!(accepted.assigned_to.as_deref(), Some("admin1"));
    assert_eq!(accepted.history.len(), 2);
    assert_eq!(
        accepted.history[1].action,
        AuditAction::StatusChange(RequestStatus::Accepted)
    );
}

#[tokio::test]
async fn owner_cannot_edit_after_acceptance() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;
    lifecycle
        .transition(&admin(), &request.id, RequestStatus::Accepted, None)
        .await
        .unwrap();
    let before = lifecycle.get(&owner(), &request.id).await.unwrap();

    let result = lifecycle
        .update_request_data(&owner(), &request.id, patch(json!({ "purpose": "holiday" })))
        .await;

    assert!(matches!(result, Err(LifecycleError::InvalidState { .. })));
    assert_eq!(lifecycle.get(&owner(), &request.id).await.unwrap(), before);
}

#[tokio::test]
async fn owner_edits_while_info_is_needed() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;
    lifecycle
        .transition(&admin(), &request.id, RequestStatus::Accepted, None)
        .await
        .unwrap();
    lifecycle
        .transition(
            &admin(),
            &request.id,
            RequestStatus::InfoNeeded,
            Some("passport expiry date missing".into()),
        )
        .await
        .unwrap();

    let updated = lifecycle
        .update_request_data(
            &owner(),
            &request.id,
            patch(json!({
                "travelers": [{
                    "name": "Li Wei",
                    "idType": "护照",
                    "idNumber": "E12345678",
                    "idExpiryDate": "2030-01-01",
                    "phone": "13800000000"
                }]
            })),
        )
        .await
        .unwrap();

    assert_eq!(updated.status, RequestStatus::InfoNeeded);
    assert_eq!(updated.details.base().travelers[0].id_type, "护照");
    assert_eq!(updated.history.last().unwrap().action, AuditAction::Updated);
    assert_eq!(updated.history.len(), 4);
}

#[tokio::test]
async fn booking_completion_then_file_replacement() {
    let lifecycle = lifecycle();
    let request = in_booking(&lifecycle).await;
    let entries = request.history.len();

    let completed = lifecycle
        .complete_booking(
            &admin(),
            &request.id,
            BookingReceipt {
                files: vec!["url1".into()],
                ..BookingReceipt::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(completed.status, RequestStatus::Success);
    let Some(BookingResult::Completed(receipt)) = &completed.booking_result else {
        panic!("expected a completed booking");
    };
    assert_eq!(receipt.files, vec!["url1".to_string()]);
    assert_eq!(completed.history.len(), entries + 1);
    assert_eq!(completed.history.last().unwrap().action, AuditAction::BookingCompleted);

    let replaced = lifecycle
        .update_booking_files(&admin(), &request.id, vec!["url2".into()])
        .await
        .unwrap();

    let Some(BookingResult::Completed(receipt)) = &replaced.booking_result else {
        panic!("expected a completed booking");
    };
    assert_eq!(receipt.files, vec!["url2".to_string()]);
    assert_eq!(replaced.history.len(), entries + 2);
    assert_eq!(replaced.history.last().unwrap().action, AuditAction::FilesUpdated);
}

#[tokio::test]
async fn only_the_assigned_admin_books() {
    let lifecycle = lifecycle();
    let request = in_booking(&lifecycle).await;

    assert!(matches!(
        lifecycle
            .complete_booking(&other_admin(), &request.id, BookingReceipt::default())
            .await,
        Err(LifecycleError::Forbidden { .. })
    ));
    assert!(matches!(
        lifecycle
            .fail_booking(&other_admin(), &request.id, "sold out".into())
            .await,
        Err(LifecycleError::Forbidden { .. })
    ));
    assert!(matches!(
        lifecycle
            .transition(&other_admin(), &request.id, RequestStatus::Closed, None)
            .await,
        Err(LifecycleError::Forbidden { .. })
    ));

    let failed = lifecycle
        .fail_booking(&admin(), &request.id, "sold out".into())
        .await
        .unwrap();
    assert_eq!(failed.status, RequestStatus::Failed);
}

#[tokio::test]
async fn files_need_a_booking_result() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;
    assert!(matches!(
        lifecycle
            .update_booking_files(&admin(), &request.id, vec!["url".into()])
            .await,
        Err(LifecycleError::NoBookingResult)
    ));
}

#[tokio::test]
async fn owner_may_cancel_until_booking_starts() {
    let lifecycle = lifecycle();

    let early = created(&lifecycle).await;
    let cancelled = lifecycle
        .transition(&owner(), &early.id, RequestStatus::Cancelled, Some("plans changed".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert_eq!(cancelled.history.last().unwrap().details.as_deref(), Some("plans changed"));

    let late = in_booking(&lifecycle).await;
    assert!(matches!(
        lifecycle
            .transition(&owner(), &late.id, RequestStatus::Cancelled, None)
            .await,
        Err(LifecycleError::InvalidState { .. })
    ));
    assert!(matches!(
        lifecycle
            .transition(&owner(), &late.id, RequestStatus::Success, None)
            .await,
        Err(LifecycleError::Forbidden { .. })
    ));
}

#[tokio::test]
async fn terminal_requests_do_not_move() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;
    lifecycle
        .transition(&admin(), &request.id, RequestStatus::Closed, None)
        .await
        .unwrap();

    for target in RequestStatus::ALL {
        assert!(matches!(
            lifecycle.transition(&admin(), &request.id, target, None).await,
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }
}

#[tokio::test]
async fn strangers_are_forbidden_in_every_status() {
    let lifecycle = lifecycle();
    let submitted = created(&lifecycle).await;
    let booking = in_booking(&lifecycle).await;

    for id in [&submitted.id, &booking.id] {
        assert!(matches!(
            lifecycle
                .update_request_data(&stranger(), id, patch(json!({ "notes": "mine now" })))
                .await,
            Err(LifecycleError::Forbidden { .. })
        ));
        assert!(matches!(
            lifecycle.delete_request(&stranger(), id).await,
            Err(LifecycleError::Forbidden { .. })
        ));
        assert!(matches!(
            lifecycle.get(&stranger(), id).await,
            Err(LifecycleError::Forbidden { .. })
        ));
        assert!(matches!(
            lifecycle.add_comment(&stranger(), id, "hello").await,
            Err(LifecycleError::Forbidden { .. })
        ));
    }
}

#[tokio::test]
async fn blank_comments_report_missing_and_forbidden_first() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;

    assert!(matches!(
        lifecycle.add_comment(&stranger(), "REQ-missing", "   ").await,
        Err(LifecycleError::NotFound { .. })
    ));
    assert!(matches!(
        lifecycle.add_comment(&stranger(), &request.id, "").await,
        Err(LifecycleError::Forbidden { .. })
    ));
    assert!(matches!(
        lifecycle.add_comment(&owner(), &request.id, "").await,
        Err(LifecycleError::Validation(_))
    ));
    assert!(lifecycle.get(&owner(), &request.id).await.unwrap().comments.is_empty());
}

#[tokio::test]
async fn booking_outcomes_are_not_reachable_by_plain_transition() {
    let lifecycle = lifecycle();
    let request = in_booking(&lifecycle).await;

    for target in [RequestStatus::Success, RequestStatus::Failed] {
        assert!(matches!(
            lifecycle.transition(&admin(), &request.id, target, None).await,
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }
    let stored = lifecycle.get(&admin(), &request.id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Booking);
    assert!(stored.booking_result.is_none());
    assert_eq!(stored.history, request.history);

    let failed = lifecycle
        .fail_booking(&admin(), &request.id, "no seats left".into())
        .await
        .unwrap();
    assert_eq!(failed.status, RequestStatus::Failed);
    assert_eq!(failed.history.last().unwrap().action, AuditAction::BookingFailed);
}

#[tokio::test]
async fn delete_is_hard_and_gated() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;

    assert_ok!(lifecycle.delete_request(&owner(), &request.id).await);
    assert!(matches!(
        lifecycle.get(&owner(), &request.id).await,
        Err(LifecycleError::NotFound { .. })
    ));
    assert!(matches!(
        lifecycle.delete_request(&owner(), &request.id).await,
        Err(LifecycleError::NotFound { .. })
    ));

    let booking = in_booking(&lifecycle).await;
    assert!(matches!(
        lifecycle.delete_request(&owner(), &booking.id).await,
        Err(LifecycleError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn comments_leave_everything_else_alone() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;
    lifecycle
        .transition(&admin(), &request.id, RequestStatus::Accepted, None)
        .await
        .unwrap();
    let before = lifecycle.get(&admin(), &request.id).await.unwrap();

    let comment = lifecycle
        .add_comment(&admin(), &request.id, "Please confirm the seat")
        .await
        .unwrap();
    assert_eq!(comment.author, "Admin One");
    assert_eq!(comment.role, Role::Admin);

    let after = lifecycle.get(&owner(), &request.id).await.unwrap();
    assert_eq!(after.status, before.status);
    assert_eq!(after.details, before.details);
    assert_eq!(after.assigned_to, before.assigned_to);
    assert_eq!(after.history, before.history);
    assert_eq!(after.comments, vec![comment]);

    assert_err!(lifecycle.add_comment(&owner(), &request.id, "   ").await);
}

#[tokio::test]
async fn history_only_grows() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;
    let mut previous = request.history.clone();

    let steps = [
        RequestStatus::Accepted,
        RequestStatus::InfoNeeded,
        RequestStatus::Accepted,
        RequestStatus::Booking,
    ];
    for target in steps {
        let next = lifecycle
            .transition(&admin(), &request.id, target, None)
            .await
            .unwrap();
        assert_eq!(next.history.len(), previous.len() + 1);
        assert_eq!(next.history[..previous.len()], previous[..]);
        previous = next.history;
    }

    // Refused operations add nothing.
    assert_err!(
        lifecycle
            .transition(&admin(), &request.id, RequestStatus::Submitted, None)
            .await
    );
    let stored = lifecycle.get(&admin(), &request.id).await.unwrap();
    assert_eq!(stored.history, previous);
}

#[tokio::test]
async fn get_is_idempotent() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;

    let first = serde_json::to_vec(&lifecycle.get(&owner(), &request.id).await.unwrap()).unwrap();
    let second = serde_json::to_vec(&lifecycle.get(&owner(), &request.id).await.unwrap()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn listings_are_scoped() {
    let lifecycle = lifecycle();
    let mine = created(&lifecycle).await;
    let theirs = lifecycle.create(&stranger(), flight_request()).await.unwrap();

    let own = lifecycle.list(&owner(), RequestFilter::default()).await.unwrap();
    assert_eq!(own.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), [mine.id.as_str()]);

    let everything = lifecycle.list(&admin(), RequestFilter::default()).await.unwrap();
    assert_eq!(everything.len(), 2);

    let filtered = lifecycle
        .list(&admin(), RequestFilter { owner_id: Some("u2".into()) })
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, theirs.id);

    assert!(matches!(
        lifecycle
            .list(&owner(), RequestFilter { owner_id: Some("u2".into()) })
            .await,
        Err(LifecycleError::Forbidden { .. })
    ));
}

#[tokio::test]
async fn purge_is_admin_only_and_skips_unknown_ids() {
    let lifecycle = lifecycle();
    let first = created(&lifecycle).await;
    let second = created(&lifecycle).await;
    let ids = vec![first.id.clone(), second.id.clone(), "REQ-missing".to_string()];

    assert!(matches!(
        lifecycle.purge(&owner(), &ids).await,
        Err(LifecycleError::Forbidden { .. })
    ));
    assert_eq!(lifecycle.purge(&admin(), &ids).await.unwrap(), 2);
    assert!(lifecycle.list(&admin(), RequestFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_comments_are_all_kept() {
    let store: Arc<dyn RequestStore> = Arc::new(InMemoryRequestStore::default());
    let lifecycle = RequestLifecycle::new(store);
    let request = created(&lifecycle).await;

    let mut handles = Vec::new();
    for n in 0..32 {
        let lifecycle = lifecycle.clone();
        let id = request.id.clone();
        let author = if n % 2 == 0 { owner() } else { admin() };
        handles.push(tokio::spawn(async move {
            lifecycle.add_comment(&author, &id, &format!("note {n}")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = lifecycle.get(&admin(), &request.id).await.unwrap();
    assert_eq!(stored.comments.len(), 32);
    assert_eq!(stored.history.len(), 1);
}

#[tokio::test]
async fn racing_acceptances_assign_exactly_one_admin() {
    let lifecycle = lifecycle();
    let request = created(&lifecycle).await;

    let a = {
        let lifecycle = lifecycle.clone();
        let id = request.id.clone();
        tokio::spawn(async move {
            lifecycle
                .transition(&admin(), &id, RequestStatus::Accepted, None)
                .await
        })
    };
    let b = {
        let lifecycle = lifecycle.clone();
        let id = request.id.clone();
        tokio::spawn(async move {
            lifecycle
                .transition(&other_admin(), &id, RequestStatus::Accepted, None)
                .await
        })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let stored = lifecycle.get(&admin(), &request.id).await.unwrap();
    assert_eq!(stored.history.len(), 2);
    let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
    assert_eq!(stored.assigned_to, winner.assigned_to);
}
