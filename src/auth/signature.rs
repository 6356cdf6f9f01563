//! RSA request signing for app authentication.
//!
//! Apps authenticate without a password by proving possession of the private
//! key registered with AppNexus:
//! ```text
//! base64(RSA_private_encrypt("{unix_epoch_seconds}|{app_user_id}"))
//! ```
//!
//! The encryption uses PKCS#1 v1.5 type-1 padding over the raw payload, so
//! the server can recover the payload with the registered public key.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};

use crate::error::AppNexusError;

/// Load an RSA private key from PEM.
///
/// Both PKCS#1 (`BEGIN RSA PRIVATE KEY`) and PKCS#8 (`BEGIN PRIVATE KEY`)
/// encodings are accepted.
pub fn load_private_key(pem: &str) -> Result<RsaPrivateKey, AppNexusError> {
    let pem = pem.trim();
    if pem.contains("BEGIN RSA PRIVATE KEY") {
        RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| AppNexusError::Auth(format!("Invalid PKCS#1 private key: {e}")))
    } else {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| AppNexusError::Auth(format!("Invalid PKCS#8 private key: {e}")))
    }
}

/// Build the plaintext that gets signed.
pub fn signature_payload(unix_seconds: i64, app_user_id: &str) -> String {
    format!("{unix_seconds}|{app_user_id}")
}

/// Sign an app authentication request.
///
/// # Arguments
///
/// * `key` - The app's RSA private key
/// * `unix_seconds` - Current time in seconds since the UNIX epoch
/// * `app_user_id` - The member user the app acts for
///
/// # Returns
///
/// Base64-encoded signature for the `signature` query parameter.
pub fn sign_app_request(
    key: &RsaPrivateKey,
    unix_seconds: i64,
    app_user_id: &str,
) -> Result<String, AppNexusError> {
    let payload = signature_payload(unix_seconds, app_user_id);
    let encrypted = key
        .sign(Pkcs1v15Sign::new_unprefixed(), payload.as_bytes())
        .map_err(|e| AppNexusError::Auth(format!("Failed to sign auth payload: {e}")))?;

    Ok(BASE64.encode(encrypted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPublicKey;
    use rsa::traits::PublicKeyParts;

    const PKCS1_PEM: &str = include_str!("../../tests/fixtures/app_key.pem");
    const PKCS8_PEM: &str = include_str!("../../tests/fixtures/app_key_pkcs8.pem");

    #[test]
    fn test_load_both_encodings() {
        let pkcs1 = load_private_key(PKCS1_PEM).unwrap();
        let pkcs8 = load_private_key(PKCS8_PEM).unwrap();
        assert_eq!(pkcs1.n(), pkcs8.n());
    }

    #[test]
    fn test_load_garbage_fails() {
        let err = load_private_key("not a key").unwrap_err();
        assert!(matches!(err, AppNexusError::Auth(_)));
    }

    #[test]
    fn test_payload_format() {
        assert_eq!(signature_payload(1_700_000_000, "1001"), "1700000000|1001");
    }

    #[test]
    fn test_signature_verifies_with_public_key() {
        let key = load_private_key(PKCS1_PEM).unwrap();
        let signature = sign_app_request(&key, 1_700_000_000, "1001").unwrap();
        let raw = BASE64.decode(&signature).unwrap();
        assert_eq!(raw.len(), key.size());

        let public = RsaPublicKey::from(&key);
        public
            .verify(Pkcs1v15Sign::new_unprefixed(), b"1700000000|1001", &raw)
            .unwrap();
    }

    #[test]
    fn test_signature_changes_with_time() {
        let key = load_private_key(PKCS1_PEM).unwrap();
        let sig1 = sign_app_request(&key, 1_700_000_000, "1001").unwrap();
        let sig2 = sign_app_request(&key, 1_700_000_001, "1001").unwrap();
        assert_ne!(sig1, sig2);
    }
}
