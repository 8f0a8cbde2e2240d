use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use utoipa::{OpenApi, ToSchema};

use crate::app_state::AppState;
use crate::db::models::travel_request::{
    AuditLogEntry, BookingFailure, BookingReceipt, BookingResult, Comment, NewTravelRequest,
    RequestFilter, RequestStatus, RequestType, Traveler, TravelRequest, TravelRequestDocument,
};
use crate::lifecycle::Actor;
use crate::utils::api_response::ApiResponse;

/// Top-level keys of the request's `data` to overwrite.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct DataPatch(pub Map<String, Value>);

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdate {
    pub status: RequestStatus,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewComment {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FilesUpdate {
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FailBooking {
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PurgeRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurgeResult {
    pub deleted: u64,
}

/// ✅ **List travel requests.** Non-admin callers only ever see their own.
#[utoipa::path(
    get,
    path = "/api/requests",
    params(("ownerId" = Option<String>, Query, description = "Only requests filed by this user")),
    responses(
        (status = 200, description = "Requests, newest first", body = [TravelRequestDocument]),
        (status = 403, description = "Listing another user's requests")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(filter): Query<RequestFilter>,
) -> Result<ApiResponse<Vec<TravelRequest>>, ApiResponse<()>> {
    let requests = state.lifecycle.list(&actor, filter).await?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Requests retrieved",
        requests,
    ))
}

/// ✅ **File a new travel request** owned by the caller.
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = NewTravelRequest,
    responses(
        (status = 201, description = "Request created", body = TravelRequestDocument),
        (status = 400, description = "Payload does not match the request type")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn create_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewTravelRequest>,
) -> Result<ApiResponse<TravelRequest>, ApiResponse<()>> {
    let request = state.lifecycle.create(&actor, payload).await?;
    info!(request_id = %request.id, owner = %actor.id, kind = %request.request_type(), "📝 Request created");
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Request created",
        request,
    ))
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request found", body = TravelRequestDocument),
        (status = 403, description = "Not the owner or an administrator"),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<ApiResponse<TravelRequest>, ApiResponse<()>> {
    let request = state.lifecycle.get(&actor, &id).await?;
    Ok(ApiResponse::success(StatusCode::OK, "Request retrieved", request))
}

/// ✅ **Owner edit.** Only while SUBMITTED or INFO_NEEDED.
#[utoipa::path(
    put,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request id")),
    request_body = DataPatch,
    responses(
        (status = 200, description = "Request updated", body = TravelRequestDocument),
        (status = 400, description = "Invalid state or payload"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn update_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(DataPatch(patch)): Json<DataPatch>,
) -> Result<ApiResponse<TravelRequest>, ApiResponse<()>> {
    let request = state.lifecycle.update_request_data(&actor, &id, patch).await?;
    info!(request_id = %id, actor = %actor.id, "✏️ Request data updated");
    Ok(ApiResponse::success(StatusCode::OK, "Request updated", request))
}

#[utoipa::path(
    delete,
    path = "/api/requests/{id}",
    params(("id" = String, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request deleted"),
        (status = 400, description = "Request is past the editable stage"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn delete_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    state.lifecycle.delete_request(&actor, &id).await?;
    info!(request_id = %id, actor = %actor.id, "🗑️ Request deleted");
    Ok(ApiResponse::success(StatusCode::OK, "Request deleted", ()))
}

/// ✅ **Move a request along its lifecycle**
#[utoipa::path(
    put,
    path = "/api/requests/{id}/status",
    params(("id" = String, Path, description = "Request id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = TravelRequestDocument),
        (status = 400, description = "Transition not allowed from the current status"),
        (status = 403, description = "Not allowed to make this change"),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> Result<ApiResponse<TravelRequest>, ApiResponse<()>> {
    let request = state
        .lifecycle
        .transition(&actor, &id, payload.status, payload.details)
        .await?;
    info!(request_id = %id, actor = %actor.id, status = %request.status, "🔁 Status changed");
    Ok(ApiResponse::success(StatusCode::OK, "Status updated", request))
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/comments",
    params(("id" = String, Path, description = "Request id")),
    request_body = NewComment,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 400, description = "Empty comment"),
        (status = 403, description = "Not the owner or an administrator"),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(payload): Json<NewComment>,
) -> Result<ApiResponse<Comment>, ApiResponse<()>> {
    let comment = state.lifecycle.add_comment(&actor, &id, &payload.content).await?;
    info!(request_id = %id, actor = %actor.id, comment_id = %comment.id, "💬 Comment added");
    Ok(ApiResponse::success(StatusCode::CREATED, "Comment added", comment))
}

/// ✅ **Record a completed booking** (assigned administrator only)
#[utoipa::path(
    post,
    path = "/api/requests/{id}/booking",
    params(("id" = String, Path, description = "Request id")),
    request_body = BookingReceipt,
    responses(
        (status = 200, description = "Booking completed", body = TravelRequestDocument),
        (status = 400, description = "Request is not in BOOKING"),
        (status = 403, description = "Not the assigned administrator"),
        (status = 404, description = "Request not found")
    ),
    tag = "Booking",
    security(("bearerAuth" = []))
)]
pub async fn complete_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(receipt): Json<BookingReceipt>,
) -> Result<ApiResponse<TravelRequest>, ApiResponse<()>> {
    let request = state.lifecycle.complete_booking(&actor, &id, receipt).await?;
    info!(request_id = %id, actor = %actor.id, "✅ Booking completed");
    Ok(ApiResponse::success(StatusCode::OK, "Booking completed", request))
}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/booking/files",
    params(("id" = String, Path, description = "Request id")),
    request_body = FilesUpdate,
    responses(
        (status = 200, description = "Attachments replaced", body = TravelRequestDocument),
        (status = 400, description = "No completed booking to attach to"),
        (status = 403, description = "Not the assigned administrator"),
        (status = 404, description = "Request not found")
    ),
    tag = "Booking",
    security(("bearerAuth" = []))
)]
pub async fn update_booking_files(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(payload): Json<FilesUpdate>,
) -> Result<ApiResponse<TravelRequest>, ApiResponse<()>> {
    let request = state
        .lifecycle
        .update_booking_files(&actor, &id, payload.files)
        .await?;
    info!(request_id = %id, actor = %actor.id, "📎 Booking files replaced");
    Ok(ApiResponse::success(StatusCode::OK, "Booking files updated", request))
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/fail",
    params(("id" = String, Path, description = "Request id")),
    request_body = FailBooking,
    responses(
        (status = 200, description = "Booking marked as failed", body = TravelRequestDocument),
        (status = 400, description = "Request is not in BOOKING or reason is empty"),
        (status = 403, description = "Not the assigned administrator"),
        (status = 404, description = "Request not found")
    ),
    tag = "Booking",
    security(("bearerAuth" = []))
)]
pub async fn fail_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(payload): Json<FailBooking>,
) -> Result<ApiResponse<TravelRequest>, ApiResponse<()>> {
    let request = state.lifecycle.fail_booking(&actor, &id, payload.reason).await?;
    info!(request_id = %id, actor = %actor.id, "⚠️ Booking failed");
    Ok(ApiResponse::success(StatusCode::OK, "Booking marked as failed", request))
}

/// ✅ **Bulk delete** (administrators only). Unknown ids are ignored.
#[utoipa::path(
    post,
    path = "/api/requests/delete",
    request_body = PurgeRequest,
    responses(
        (status = 200, description = "Requests deleted", body = PurgeResult),
        (status = 400, description = "No ids given"),
        (status = 403, description = "Not an administrator")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn purge_requests(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<PurgeRequest>,
) -> Result<ApiResponse<PurgeResult>, ApiResponse<()>> {
    let deleted = state.lifecycle.purge(&actor, &payload.ids).await?;
    info!(actor = %actor.id, requested = payload.ids.len(), deleted, "🗑️ Requests purged");
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Requests deleted",
        PurgeResult { deleted },
    ))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list_requests,
        create_request,
        get_request,
        update_request,
        delete_request,
        update_status,
        add_comment,
        complete_booking,
        update_booking_files,
        fail_booking,
        purge_requests
    ),
    components(schemas(
        TravelRequestDocument,
        NewTravelRequest,
        RequestType,
        RequestStatus,
        Traveler,
        Comment,
        AuditLogEntry,
        BookingReceipt,
        BookingFailure,
        BookingResult,
        DataPatch,
        StatusUpdate,
        NewComment,
        FilesUpdate,
        FailBooking,
        PurgeRequest,
        PurgeResult
    )),
    tags(
        (name = "Requests", description = "Travel request lifecycle"),
        (name = "Booking", description = "Booking outcomes recorded by the assigned administrator")
    )
)]
pub struct RequestDoc;
