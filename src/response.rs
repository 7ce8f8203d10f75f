use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Fixed wire envelope. Every successful response carries a status code, a
/// human-readable message and a data payload; every error response carries an
/// error code and null data.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn of(data: T) -> Self {
        Self {
            status_code: 200,
            message: "OK".into(),
            data: Some(data),
            error_code: None,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status_code: 201,
            message: "CREATED".into(),
            data: Some(data),
            error_code: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            message: "OK".into(),
            data: None,
            error_code: None,
        }
    }

    pub fn exception(status_code: u16, error_code: &'static str, message: String) -> Self {
        Self {
            status_code,
            message,
            data: None,
            error_code: Some(error_code),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::of(serde_json::json!({"x": 1}))).unwrap();
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["message"], "OK");
        assert_eq!(body["data"]["x"], 1);
        assert!(body.get("errorCode").is_none());
    }

    #[test]
    fn error_envelope_carries_code_and_null_data() {
        let body = serde_json::to_value(ApiResponse::exception(
            403,
            "FORBIDDEN",
            "forbidden".into(),
        ))
        .unwrap();
        assert_eq!(body["statusCode"], 403);
        assert_eq!(body["errorCode"], "FORBIDDEN");
        assert!(body["data"].is_null());
    }

    #[test]
    fn empty_ok_serializes_null_data() {
        let body = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert_eq!(body["statusCode"], 200);
        assert!(body["data"].is_null());
    }
}
