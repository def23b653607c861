use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// The broker credential, split into the two halves the presence webhook's
/// signature protocol needs separately: `key_name` to match against the
/// `X-Ably-Key` header, `key_secret` to key the HMAC.
pub struct ApiKey<'a> {
    pub key_name: &'a str,
    pub key_secret: &'a str,
}

impl<'a> ApiKey<'a> {
    /// Splits a `keyName:keySecret` credential as issued by Ably. Both
    /// halves must be non-empty.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let (key_name, key_secret) = raw.split_once(':')?;
        if key_name.is_empty() || key_secret.is_empty() {
            return None;
        }
        Some(Self { key_name, key_secret })
    }

    /// `keyName` is itself `appId.keyId`; the header may carry the full
    /// name or just the `keyId` suffix after the last `.`.
    fn matches_header(&self, header_key_name: &str) -> bool {
        if header_key_name == self.key_name {
            return true;
        }
        match self.key_name.rsplit_once('.') {
            Some((_, key_id)) => header_key_name == key_id,
            None => false,
        }
    }
}

/// Verifies the `X-Ably-Key` / `X-Ably-Signature` pair against the raw
/// request body: key name match (full or `keyId` suffix), then
/// constant-time comparison of the base64-encoded HMAC-SHA256 of the body.
pub fn verify(
    api_key: &ApiKey<'_>,
    header_key_name: Option<&str>,
    header_signature: Option<&str>,
    raw_body: &[u8],
) -> Result<(), WebhookError> {
    let header_key_name = header_key_name.ok_or(WebhookError::MissingKeyName)?;
    let header_signature = header_signature.ok_or(WebhookError::MissingSignature)?;

    if !api_key.matches_header(header_key_name) {
        return Err(WebhookError::UnknownKeyName);
    }

    let mut mac = HmacSha256::new_from_slice(api_key.key_secret.as_bytes())
        .expect("HMAC accepts a key of any length");
    mac.update(raw_body);
    let expected = STANDARD.encode(mac.finalize().into_bytes());

    if expected.as_bytes().ct_eq(header_signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}
