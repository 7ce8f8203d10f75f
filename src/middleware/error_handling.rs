use crate::error::AppError;
use crate::response::ApiResponse;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Map domain errors to the wire envelope. Internal failures never leak
/// driver detail into the message field.
pub fn map_error(err: &AppError) -> (StatusCode, ApiResponse<()>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let code = match err {
        AppError::Validation(_) => "VALIDATION_FAILED",
        AppError::Unauthenticated => "UNAUTHENTICATED",
        AppError::Unauthorized => "UNAUTHORIZED",
        AppError::Forbidden => "FORBIDDEN",
        AppError::NotFound => "NOT_FOUND",
        AppError::Conflict(_) => "CONFLICT",
        AppError::Config(_)
        | AppError::StartServer(_)
        | AppError::Database(_)
        | AppError::Internal => "INTERNAL_SERVER_ERROR",
    };

    let message = if status.is_server_error() {
        "internal server error".to_string()
    } else {
        err.to_string()
    };

    (status, ApiResponse::exception(status.as_u16(), code, message))
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    if err.status_code() >= 500 {
        tracing::error!(error = %err, "request failed");
    }
    let (_status, body) = map_error(&err);
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_unauthorized_to_403() {
        let (status, body) = map_error(&AppError::Unauthorized);
        assert_eq!(status.as_u16(), 403);
        assert_eq!(body.error_code, Some("UNAUTHORIZED"));
        assert!(body.data.is_none());
    }

    #[test]
    fn maps_validation_to_400_with_detail() {
        let (status, body) = map_error(&AppError::Validation("group id required".into()));
        assert_eq!(status.as_u16(), 400);
        assert_eq!(body.error_code, Some("VALIDATION_FAILED"));
        assert!(body.message.contains("group id required"));
    }

    #[test]
    fn maps_conflict_to_409() {
        let (status, body) = map_error(&AppError::Conflict("message already deleted".into()));
        assert_eq!(status.as_u16(), 409);
        assert_eq!(body.error_code, Some("CONFLICT"));
    }

    #[test]
    fn internal_errors_hide_driver_detail() {
        let (status, body) = map_error(&AppError::Database(sqlx::Error::PoolClosed));
        assert_eq!(status.as_u16(), 500);
        assert_eq!(body.message, "internal server error");
        assert_eq!(body.error_code, Some("INTERNAL_SERVER_ERROR"));
    }
}
