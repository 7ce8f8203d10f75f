use chat_service::error::AppError;
use chat_service::middleware::error_handling::map_error;
use chat_service::response::ApiResponse;

#[test]
fn success_and_error_envelopes_share_one_shape() {
    let ok = serde_json::to_value(ApiResponse::of(vec![1, 2, 3])).unwrap();
    assert_eq!(ok["statusCode"], 200);
    assert_eq!(ok["message"], "OK");
    assert_eq!(ok["data"], serde_json::json!([1, 2, 3]));

    let (_status, err) = map_error(&AppError::NotFound);
    let err = serde_json::to_value(err).unwrap();
    assert_eq!(err["statusCode"], 404);
    assert_eq!(err["errorCode"], "NOT_FOUND");
    assert!(err["data"].is_null());
}

#[test]
fn created_envelope_uses_201() {
    let body = serde_json::to_value(ApiResponse::created(serde_json::json!({"id": "x"}))).unwrap();
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["message"], "CREATED");
}

#[test]
fn taxonomy_maps_to_expected_status_codes() {
    assert_eq!(AppError::Unauthenticated.status_code(), 401);
    assert_eq!(AppError::Unauthorized.status_code(), 403);
    assert_eq!(AppError::Forbidden.status_code(), 403);
    assert_eq!(AppError::NotFound.status_code(), 404);
    assert_eq!(AppError::Validation("x".into()).status_code(), 400);
    assert_eq!(AppError::Conflict("x".into()).status_code(), 409);
    assert_eq!(AppError::Internal.status_code(), 500);
}

#[test]
fn database_failures_never_leak_driver_detail() {
    let (status, body) = map_error(&AppError::Database(sqlx::Error::PoolTimedOut));
    assert_eq!(status.as_u16(), 500);
    assert!(!body.message.contains("pool"));
    assert_eq!(body.message, "internal server error");
}
