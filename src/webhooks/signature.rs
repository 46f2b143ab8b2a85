use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies the hex HMAC-SHA256 that the payment provider sends over the raw
/// request body. The key is held pre-initialised and never printed.
#[derive(Clone)]
pub struct PaymentSignatureVerifier {
    keyed: HmacSha256,
}

impl fmt::Debug for PaymentSignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentSignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl PaymentSignatureVerifier {
    pub fn new(secret: &str) -> Result<Self, ServiceError> {
        if secret.is_empty() {
            return Err(ServiceError::Internal(
                "payment webhook secret is empty".to_string(),
            ));
        }
        let keyed = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ServiceError::Internal(format!("invalid webhook secret: {}", e)))?;
        Ok(Self { keyed })
    }

    /// Lower-case hex signature of `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.keyed.clone();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Checks `signature` against `body` in constant time. A missing header,
    /// a non-hex value and a wrong digest all yield `InvalidSignature`.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), ServiceError> {
        let provided = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ServiceError::InvalidSignature)?;
        let provided = hex::decode(provided).map_err(|_| ServiceError::InvalidSignature)?;

        let mut mac = self.keyed.clone();
        mac.update(body);
        mac.verify_slice(&provided)
            .map_err(|_| ServiceError::InvalidSignature)
    }
}
