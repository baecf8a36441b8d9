//! Shared access signature (SAS) tokens for symmetric-key device auth.
//!
//! The token is sent as the MQTT password:
//! `SharedAccessSignature sr={uri}&sig={signature}&se={expiry}` where the
//! signature is `base64(HMAC-SHA256(base64decode(key), "{uri}\n{expiry}"))`.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ProtocolError, ProtocolResult};
use crate::topics::percent_encode;

type HmacSha256 = Hmac<Sha256>;

/// Key decoder tolerant of missing padding and stray trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Default token lifetime when signing at connect time.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

/// Resource URI a device token is scoped to.
pub fn device_resource_uri(host_name: &str, device_id: &str) -> String {
    format!("{host_name}/devices/{device_id}")
}

/// Sign a SAS token for `resource_uri` expiring at `expiry` (unix seconds).
pub fn sign(resource_uri: &str, key: &str, expiry: i64) -> ProtocolResult<String> {
    let key = decode_key(key)?;
    let encoded_uri = percent_encode(resource_uri);
    let to_sign = format!("{encoded_uri}\n{expiry}");

    let mut mac =
        HmacSha256::new_from_slice(&key).map_err(|e| ProtocolError::InvalidKey(e.to_string()))?;
    mac.update(to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!(
        "SharedAccessSignature sr={encoded_uri}&sig={}&se={expiry}",
        percent_encode(&signature)
    ))
}

/// Decode a base64 shared access key.
///
/// Padding is optional and a dangling final symbol (which cannot encode a
/// whole byte) is dropped; characters outside the alphabet are rejected.
pub fn decode_key(key: &str) -> ProtocolResult<Vec<u8>> {
    let mut symbols = key.trim().trim_end_matches('=');
    if symbols.len() % 4 == 1 {
        if let Some((last, _)) = symbols.char_indices().last() {
            symbols = &symbols[..last];
        }
    }
    LENIENT
        .decode(symbols)
        .map_err(|e| ProtocolError::InvalidKey(e.to_string()))
}

/// Sign a device token valid for `ttl_secs` from `now`.
pub fn device_token(
    host_name: &str,
    device_id: &str,
    key: &str,
    now: DateTime<Utc>,
    ttl_secs: i64,
) -> ProtocolResult<String> {
    let uri = device_resource_uri(host_name, device_id);
    sign(&uri, key, now.timestamp() + ttl_secs)
}
