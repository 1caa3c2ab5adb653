use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Identity carried by bearer tokens. Tokens are minted by the account
/// service; this server only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Requests --

#[derive(Debug, Default, Deserialize)]
pub struct RequestListQuery {
    pub author: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestRequest {
    #[serde(default)]
    pub contact: String,
    pub description: String,
    pub color: String,
    pub size: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequestRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct AddImageRequest {
    #[serde(rename = "imageURL")]
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub id: String,
    /// Author username.
    pub author: String,
    pub contact: String,
    pub description: String,
    pub color: String,
    pub size: String,
    pub date_created: String,
    pub images: Vec<String>,
}

// -- Events --

#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub coordinator: Option<String>,
    pub location: Option<String>,
    pub startrange: Option<String>,
    pub endrange: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub description: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    /// Coordinator username.
    pub coordinator: String,
    pub description: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub date_created: String,
}

// -- Event responses --

#[derive(Debug, Deserialize)]
pub struct CreateEventResponseRequest {
    #[serde(default)]
    pub contact: String,
    pub description: String,
    /// Accepted for client compatibility, not stored.
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponseRecord {
    pub id: String,
    /// Author username.
    pub author: String,
    pub event_id: String,
    pub contact: String,
    pub description: String,
    pub date_created: String,
}

// -- Deletes --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}
