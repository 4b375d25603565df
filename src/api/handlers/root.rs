use axum::response::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Root {
    message: String,
    /// UTC, RFC 3339 with millisecond precision
    timestamp: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Server is running", body = Root)
    ),
    tag = "passgate"
)]
pub async fn root() -> Json<Root> {
    Json(Root {
        message: "Server running".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
