use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::response::ServerError;
use crate::util::app_state::AppState;

/// Proof that the request carried the configured admin bearer key.
///
/// Stands in for the dashboard's session provider, which lives outside this
/// service.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_api_key.as_deref() else {
            return Err(ServerError::unauthorized("admin API disabled"));
        };

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ServerError::unauthorized("missing token"))?;

        if !keys_match(bearer.token(), expected, &state.config.token_secret) {
            return Err(ServerError::unauthorized("invalid token"));
        }
        Ok(AdminAccess)
    }
}

/// Compares HMAC digests of both keys so the check takes the same time
/// wherever the first differing byte is.
fn keys_match(presented: &str, expected: &str, secret: &str) -> bool {
    let digest = |value: &str| {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(value.as_bytes());
        Some(mac)
    };
    match (digest(presented), digest(expected)) {
        (Some(presented), Some(expected)) => presented
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}
