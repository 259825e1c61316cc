use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use signage_shared::screen::ScreenId;

use crate::response::{ServerError, ServerResult};

type HmacSha256 = Hmac<Sha256>;

/// Mints the auth token bound to `screen_id`.
///
/// Layout before encoding: `screen_id|nonce|signature`, base64url without
/// padding. The nonce keeps two pairings of the same screen from producing
/// the same token. Tokens carry no expiry.
pub fn issue_screen_token(screen_id: &ScreenId, secret: &str) -> ServerResult<String> {
    let nonce = hex::encode(rand::random::<[u8; 16]>());
    let payload = format!("{}|{}", screen_id, nonce);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServerError::internal_error("Invalid HMAC secret"))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let token_raw = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(token_raw))
}

/// Returns the screen the token was issued for.
pub fn verify_screen_token(token_b64: &str, secret: &str) -> ServerResult<ScreenId> {
    let invalid = || ServerError::unauthorized("invalid screen token");

    let decoded = URL_SAFE_NO_PAD.decode(token_b64).map_err(|_| invalid())?;
    let decoded_str = String::from_utf8(decoded).map_err(|_| invalid())?;

    // screen ids are opaque and may themselves contain '|'
    let mut parts = decoded_str.rsplitn(3, '|');
    let (Some(sig_hex), Some(nonce), Some(screen_id)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    if screen_id.is_empty() || nonce.is_empty() {
        return Err(invalid());
    }

    let payload = format!("{}|{}", screen_id, nonce);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| invalid())?;
    mac.update(payload.as_bytes());
    let signature = hex::decode(sig_hex).map_err(|_| invalid())?;
    mac.verify_slice(&signature).map_err(|_| invalid())?;

    Ok(ScreenId::from(screen_id))
}
