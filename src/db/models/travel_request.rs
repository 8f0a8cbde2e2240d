// src/db/models/travel_request.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::user::Role;
use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    Flight,
    Hotel,
    CarRental,
    Charter,
    Other,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Flight => "FLIGHT",
            RequestType::Hotel => "HOTEL",
            RequestType::CarRental => "CAR_RENTAL",
            RequestType::Charter => "CHARTER",
            RequestType::Other => "OTHER",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FLIGHT" => Ok(RequestType::Flight),
            "HOTEL" => Ok(RequestType::Hotel),
            "CAR_RENTAL" => Ok(RequestType::CarRental),
            "CHARTER" => Ok(RequestType::Charter),
            "OTHER" => Ok(RequestType::Other),
            other => Err(ParseEnumError::new("request type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Submitted,
    Accepted,
    InfoNeeded,
    Booking,
    Success,
    Failed,
    Cancelled,
    Closed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 8] = [
        RequestStatus::Submitted,
        RequestStatus::Accepted,
        RequestStatus::InfoNeeded,
        RequestStatus::Booking,
        RequestStatus::Success,
        RequestStatus::Failed,
        RequestStatus::Cancelled,
        RequestStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Submitted => "SUBMITTED",
            RequestStatus::Accepted => "ACCEPTED",
            RequestStatus::InfoNeeded => "INFO_NEEDED",
            RequestStatus::Booking => "BOOKING",
            RequestStatus::Success => "SUCCESS",
            RequestStatus::Failed => "FAILED",
            RequestStatus::Cancelled => "CANCELLED",
            RequestStatus::Closed => "CLOSED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Success
                | RequestStatus::Failed
                | RequestStatus::Cancelled
                | RequestStatus::Closed
        )
    }

    /// The owner may still edit or withdraw the request.
    pub fn is_owner_editable(&self) -> bool {
        matches!(self, RequestStatus::Submitted | RequestStatus::InfoNeeded)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("request status", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Normal,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    OneWay,
    RoundTrip,
    MultiCity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CabinClass {
    Economy,
    Business,
    First,
}

/// A person travelling under the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
    pub name: String,
    pub id_type: String,
    pub id_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_expiry_date: Option<NaiveDate>,
    pub phone: String,
}

/// ✅ **Fields shared by every request scenario**
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BaseRequestData {
    pub purpose: String,
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub travelers: Vec<Traveler>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlightRequestData {
    #[serde(flatten)]
    pub base: BaseRequestData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_type: Option<TripType>,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cabin_class: Option<CabinClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HotelRequestData {
    #[serde(flatten)]
    pub base: BaseRequestData,
    pub city: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub room_count: u32,
    pub guest_count: u32,
    pub room_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_preference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarRentalRequestData {
    #[serde(flatten)]
    pub base: BaseRequestData,
    pub pickup_city: String,
    pub pickup_date: NaiveDate,
    pub return_date: NaiveDate,
    pub car_type: String,
    pub driving_license: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CharterRequestData {
    #[serde(flatten)]
    pub base: BaseRequestData,
    pub city: String,
    pub usage_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub passenger_count: u32,
    pub route_description: String,
    pub car_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtherRequestData {
    #[serde(flatten)]
    pub base: BaseRequestData,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
}

/// Scenario payload of a request. The variant always agrees with the request type.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestDetails {
    Flight(FlightRequestData),
    Hotel(HotelRequestData),
    CarRental(CarRentalRequestData),
    Charter(CharterRequestData),
    Other(OtherRequestData),
}

impl RequestDetails {
    pub fn kind(&self) -> RequestType {
        match self {
            RequestDetails::Flight(_) => RequestType::Flight,
            RequestDetails::Hotel(_) => RequestType::Hotel,
            RequestDetails::CarRental(_) => RequestType::CarRental,
            RequestDetails::Charter(_) => RequestType::Charter,
            RequestDetails::Other(_) => RequestType::Other,
        }
    }

    pub fn base(&self) -> &BaseRequestData {
        match self {
            RequestDetails::Flight(data) => &data.base,
            RequestDetails::Hotel(data) => &data.base,
            RequestDetails::CarRental(data) => &data.base,
            RequestDetails::Charter(data) => &data.base,
            RequestDetails::Other(data) => &data.base,
        }
    }

    /// Decode a raw `data` object using the shape selected by `kind`.
    pub fn from_value(kind: RequestType, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            RequestType::Flight => RequestDetails::Flight(serde_json::from_value(value)?),
            RequestType::Hotel => RequestDetails::Hotel(serde_json::from_value(value)?),
            RequestType::CarRental => RequestDetails::CarRental(serde_json::from_value(value)?),
            RequestType::Charter => RequestDetails::Charter(serde_json::from_value(value)?),
            RequestType::Other => RequestDetails::Other(serde_json::from_value(value)?),
        })
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            RequestDetails::Flight(data) => serde_json::to_value(data),
            RequestDetails::Hotel(data) => serde_json::to_value(data),
            RequestDetails::CarRental(data) => serde_json::to_value(data),
            RequestDetails::Charter(data) => serde_json::to_value(data),
            RequestDetails::Other(data) => serde_json::to_value(data),
        }
    }
}

/// Successful booking outcome attached by an administrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingFailure {
    pub failure_reason: String,
}

/// Outcome of the booking step. `Failed` is tried first when decoding since
/// every receipt field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum BookingResult {
    Failed(BookingFailure),
    Completed(BookingReceipt),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// What an audit entry records. Persisted as its plain label, e.g. `STATUS_CHANGE_TO_ACCEPTED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AuditAction {
    Created,
    Updated,
    StatusChange(RequestStatus),
    BookingCompleted,
    BookingFailed,
    FilesUpdated,
}

const STATUS_CHANGE_PREFIX: &str = "STATUS_CHANGE_TO_";

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::Created => f.write_str("CREATED"),
            AuditAction::Updated => f.write_str("UPDATED"),
            AuditAction::StatusChange(status) => write!(f, "{STATUS_CHANGE_PREFIX}{status}"),
            AuditAction::BookingCompleted => f.write_str("BOOKING_COMPLETED"),
            AuditAction::BookingFailed => f.write_str("BOOKING_FAILED"),
            AuditAction::FilesUpdated => f.write_str("FILES_UPDATED"),
        }
    }
}

impl FromStr for AuditAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(AuditAction::Created),
            "UPDATED" => Ok(AuditAction::Updated),
            "BOOKING_COMPLETED" => Ok(AuditAction::BookingCompleted),
            "BOOKING_FAILED" => Ok(AuditAction::BookingFailed),
            "FILES_UPDATED" => Ok(AuditAction::FilesUpdated),
            other => other
                .strip_prefix(STATUS_CHANGE_PREFIX)
                .and_then(|status| status.parse().ok())
                .map(AuditAction::StatusChange)
                .ok_or_else(|| ParseEnumError::new("audit action", other)),
        }
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        action.to_string()
    }
}

impl TryFrom<String> for AuditAction {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One row of the request's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    #[schema(value_type = String, example = "STATUS_CHANGE_TO_ACCEPTED")]
    pub action: AuditAction,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// ✅ **The central entity.** Serialized through [`TravelRequestDocument`] so the
/// wire and storage shape keeps `type` and `data` side by side.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "TravelRequestDocument")]
pub struct TravelRequest {
    pub id: String,
    pub owner_id: String,
    pub owner_name: String,
    pub status: RequestStatus,
    pub details: RequestDetails,
    pub assigned_to: Option<String>,
    pub booking_result: Option<BookingResult>,
    pub comments: Vec<Comment>,
    pub history: Vec<AuditLogEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TravelRequest {
    pub fn request_type(&self) -> RequestType {
        self.details.kind()
    }
}

/// Interchange form of [`TravelRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TravelRequestDocument {
    pub id: String,
    #[serde(alias = "userId")]
    pub owner_id: String,
    #[serde(alias = "userName")]
    pub owner_name: String,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub status: RequestStatus,
    #[schema(value_type = Object)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_result: Option<BookingResult>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub history: Vec<AuditLogEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TravelRequestDocument> for TravelRequest {
    type Error = serde_json::Error;

    fn try_from(doc: TravelRequestDocument) -> Result<Self, Self::Error> {
        Ok(TravelRequest {
            details: RequestDetails::from_value(doc.request_type, doc.data)?,
            id: doc.id,
            owner_id: doc.owner_id,
            owner_name: doc.owner_name,
            status: doc.status,
            assigned_to: doc.assigned_to,
            booking_result: doc.booking_result,
            comments: doc.comments,
            history: doc.history,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

impl TryFrom<&TravelRequest> for TravelRequestDocument {
    type Error = serde_json::Error;

    fn try_from(request: &TravelRequest) -> Result<Self, Self::Error> {
        Ok(TravelRequestDocument {
            request_type: request.request_type(),
            data: request.details.to_value()?,
            id: request.id.clone(),
            owner_id: request.owner_id.clone(),
            owner_name: request.owner_name.clone(),
            status: request.status,
            assigned_to: request.assigned_to.clone(),
            booking_result: request.booking_result.clone(),
            comments: request.comments.clone(),
            history: request.history.clone(),
            created_at: request.created_at,
            updated_at: request.updated_at,
        })
    }
}

impl Serialize for TravelRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TravelRequestDocument::try_from(self)
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

/// ✅ **New Travel Request (Frontend Sends This)**
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewTravelRequest {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    #[schema(value_type = Object)]
    pub data: Value,
}

/// Listing filter. Non-admin callers are always narrowed to their own requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub owner_id: Option<String>,
}
