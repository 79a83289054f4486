// Error types shared by the workflow modules and the JS boundary
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    Network,
    Unauthorized,
    NotFound,
    Validation,
    Server,
    Decode,
    Storage,
    Device,
    Http,
}

impl ApiErrorKind {
    // Classify a non-success HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ApiErrorKind::Unauthorized,
            404 => ApiErrorKind::NotFound,
            400 | 409 | 422 => ApiErrorKind::Validation,
            500..=599 => ApiErrorKind::Server,
            _ => ApiErrorKind::Http,
        }
    }
}

/// Normalized failure of any backend or host call.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        ApiError::new(ApiErrorKind::Network, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        ApiError::new(ApiErrorKind::Decode, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ApiError::new(ApiErrorKind::Storage, message)
    }

    pub fn device(message: impl Into<String>) -> Self {
        ApiError::new(ApiErrorKind::Device, message)
    }

    /// Build an error from a failed response, preferring the server's message.
    pub fn from_response(status: u16, body: &str, fallback: &str) -> Self {
        let message = server_message(body).unwrap_or_else(|| fallback.to_string());
        ApiError::new(ApiErrorKind::from_status(status), message)
    }
}

// Pull a human-readable message out of an error body.
// Handles {"detail": "..."}, FastAPI's {"detail": [{"msg": "..."}]} and {"msg": "..."}.
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = match value.get("detail") {
        Some(serde_json::Value::String(detail)) => Some(detail.clone()),
        Some(serde_json::Value::Array(items)) => items
            .first()
            .and_then(|item| item.get("msg"))
            .and_then(|msg| msg.as_str())
            .map(str::to_string),
        _ => value.get("msg").and_then(|msg| msg.as_str()).map(str::to_string),
    };
    message.filter(|m| !m.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("At least 3 points are needed to form a polygon ({count} drawn)")]
    NotEnoughVertices { count: usize },
    #[error("Finish drawing before saving the parcel")]
    StillDrawing,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("A polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("Could not compute the polygon center of mass")]
    NoCentroid,
    #[error("Could not serialize polygon: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("The parcel name is required")]
    NameRequired,
    #[error("Soil pH must be a number between 0 and 14")]
    InvalidSoilPh,
    #[error("The planting date cannot be in the future")]
    PlantingDateInFuture,
    #[error("Already on the {0} step")]
    NoFurtherStep(&'static str),
    #[error("The parcel is already being saved")]
    SubmissionInFlight,
    #[error("The parcel was already created")]
    AlreadySubmitted,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl FormError {
    fn kind(&self) -> &'static str {
        match self {
            FormError::Api(_) => "api",
            FormError::SubmissionInFlight | FormError::AlreadySubmitted => "state",
            _ => "validation",
        }
    }
}

impl CaptureError {
    fn kind(&self) -> &'static str {
        match self {
            CaptureError::Geometry(_) => "geometry",
            _ => "validation",
        }
    }
}

// JS receives every error as a plain {kind, message} object
#[derive(Serialize)]
struct JsErrorPayload<'a> {
    kind: &'a str,
    message: &'a str,
}

fn js_error(kind: &str, message: &str) -> JsValue {
    serde_wasm_bindgen::to_value(&JsErrorPayload { kind, message })
        .unwrap_or_else(|_| JsValue::from_str(message))
}

impl From<ApiError> for JsValue {
    fn from(err: ApiError) -> JsValue {
        let kind = serde_json::to_value(err.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string());
        js_error(&kind, &err.message)
    }
}

impl From<CaptureError> for JsValue {
    fn from(err: CaptureError) -> JsValue {
        js_error(err.kind(), &err.to_string())
    }
}

impl From<FormError> for JsValue {
    fn from(err: FormError) -> JsValue {
        match err {
            FormError::Api(api) => api.into(),
            other => js_error(other.kind(), &other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_is_surfaced() {
        let err = ApiError::from_response(400, r#"{"detail":"Email already registered"}"#, "fallback");
        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert_eq!(err.message, "Email already registered");
    }

    #[test]
    fn fastapi_validation_list_uses_first_message() {
        let body = r#"{"detail":[{"loc":["body","soil_ph"],"msg":"Input should be less than or equal to 14"}]}"#;
        let err = ApiError::from_response(422, body, "fallback");
        assert_eq!(err.message, "Input should be less than or equal to 14");
    }

    #[test]
    fn missing_detail_falls_back() {
        let err = ApiError::from_response(500, "Internal Server Error", "Could not create the parcel");
        assert_eq!(err.kind, ApiErrorKind::Server);
        assert_eq!(err.message, "Could not create the parcel");

        let err = ApiError::from_response(503, "{}", "generic");
        assert_eq!(err.message, "generic");
    }

    #[test]
    fn status_classification() {
        assert_eq!(ApiErrorKind::from_status(401), ApiErrorKind::Unauthorized);
        assert_eq!(ApiErrorKind::from_status(404), ApiErrorKind::NotFound);
        assert_eq!(ApiErrorKind::from_status(418), ApiErrorKind::Http);
    }
}
