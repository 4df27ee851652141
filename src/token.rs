//! Session token issuance and verification.
//!
//! Tokens are HMAC-SHA256-signed claim sets, hex-encoded for transport:
//! `hex(claims_json) . hex(hmac(secret, claims_json))`. Verification is
//! stateless; it never consults the credential store, so a token stays
//! cryptographically valid even after the account is blocked or deleted.
//! Callers doing authorization must re-check current account state.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::account::{current_unix_timestamp_ms, AccountId};

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime: 7 days.
pub const DEFAULT_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Claim set bound into every issued token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub account_id: AccountId,
    pub email: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    secret: Vec<u8>,
    default_ttl_ms: u64,
}

impl TokenIssuer {
    pub fn new(secret: Vec<u8>, default_ttl_ms: u64) -> Self {
        Self {
            secret,
            default_ttl_ms,
        }
    }

    /// Mint a signed token for `account_id`, valid for `ttl_ms`
    /// (the issuer default when `None`) from now.
    pub fn issue(
        &self,
        account_id: AccountId,
        email: &str,
        ttl_ms: Option<u64>,
    ) -> Result<String, TokenError> {
        let issued_at = current_unix_timestamp_ms();
        let claims = Claims {
            account_id,
            email: email.to_string(),
            issued_at,
            expires_at: issued_at + ttl_ms.unwrap_or(self.default_ttl_ms),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Invalid)?;
        let signature = self.sign(&payload)?;
        Ok(format!("{}.{}", hex::encode(&payload), hex::encode(signature)))
    }

    /// Decode and verify a token. Signature is checked before expiry so
    /// a tampered `expires_at` can never pass.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload_hex, signature_hex) = token.split_once('.').ok_or(TokenError::Invalid)?;
        let payload = hex::decode(payload_hex).map_err(|_| TokenError::Invalid)?;
        let signature = hex::decode(signature_hex).map_err(|_| TokenError::Invalid)?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::Invalid)?;
        mac.update(&payload);
        // Constant-time comparison
        mac.verify_slice(&signature).map_err(|_| TokenError::Invalid)?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Invalid)?;
        if current_unix_timestamp_ms() >= claims.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::Invalid)?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
