use crate::error::AppError;
use crate::state::AppState;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String, // subject - the user id
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64, // expiration time (unix timestamp)
}

/// Verified identity placed into request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Option<String>,
}

/// Validate the bearer credential and extract claims (HS256).
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthenticated)
}

/// Bearer token from the Authorization header, falling back to a `token`
/// query parameter (browser WebSocket clients cannot set headers).
pub fn extract_token(req: &axum::extract::Request) -> Option<String> {
    let from_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|value| value.to_string());

    from_header.or_else(|| {
        req.uri().query().and_then(|query| {
            query
                .split('&')
                .find_map(|pair| pair.strip_prefix("token="))
                .map(|value| value.to_string())
        })
    })
}

/// Middleware to verify the credential and add the identity to extensions.
pub async fn auth_middleware(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, AppError> {
    let token = extract_token(&req).ok_or(AppError::Unauthenticated)?;

    let claims = verify_jwt(&token, &state.config.jwt_secret)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthenticated)?;

    req.extensions_mut().insert(AuthContext {
        user_id,
        role: claims.role,
    });

    Ok(next.run(req).await)
}
