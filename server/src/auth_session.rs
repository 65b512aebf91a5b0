//! Signed session tokens, identifying the logged-in user of a client.
//!
//! A token consists of a base64url encoded JSON payload and its HMAC-SHA256 signature (base64url
//! as well), separated by a dot. The application secret is used as HMAC key.

use crate::data_store::UserId;
use base64::Engine;
use ring::hmac;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Maximum age of session tokens, accepted by the web server
pub const SESSION_TOKEN_MAX_AGE: std::time::Duration =
    std::time::Duration::from_secs(86400 * 365);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    #[serde(rename = "u")]
    user_id: UserId,
    /// Issuing time as unix timestamp (seconds)
    #[serde(rename = "t")]
    issued_at: i64,
}

impl SessionToken {
    pub fn new_for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            issued_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Parse and verify a session token string, as created by [Self::as_string].
    ///
    /// Fails if the string is malformed, the signature does not match the `secret`, or the token
    /// has been issued longer than `max_age` ago.
    pub fn from_string(
        data: &str,
        secret: &str,
        max_age: std::time::Duration,
    ) -> Result<Self, SessionError> {
        let (payload, signature) = data
            .trim()
            .split_once('.')
            .ok_or(SessionError::InvalidTokenFormat)?;
        let signature = BASE64
            .decode(signature)
            .map_err(|_| SessionError::InvalidTokenFormat)?;
        hmac::verify(&signing_key(secret), payload.as_bytes(), &signature)
            .map_err(|_| SessionError::SignatureVerificationFailed)?;

        let payload = BASE64
            .decode(payload)
            .map_err(|_| SessionError::InvalidTokenFormat)?;
        let token: SessionToken =
            serde_json::from_slice(&payload).map_err(|_| SessionError::InvalidTokenFormat)?;

        let age = chrono::Utc::now().timestamp() - token.issued_at;
        if age > max_age.as_secs() as i64 {
            return Err(SessionError::ExpiredToken);
        }
        Ok(token)
    }

    /// Serialize and sign the session token with the given `secret`
    pub fn as_string(&self, secret: &str) -> String {
        // Serializing a struct of a uuid and an integer cannot fail
        let payload = BASE64.encode(serde_json::to_vec(self).unwrap_or_default());
        let signature = hmac::sign(&signing_key(secret), payload.as_bytes());
        format!("{}.{}", payload, BASE64.encode(signature.as_ref()))
    }
}

fn signing_key(secret: &str) -> hmac::Key {
    hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    InvalidTokenFormat,
    SignatureVerificationFailed,
    ExpiredToken,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidTokenFormat => f.write_str("Session token is malformed"),
            SessionError::SignatureVerificationFailed => {
                f.write_str("Session token signature is not valid")
            }
            SessionError::ExpiredToken => f.write_str("Session token has expired"),
        }
    }
}

impl std::error::Error for SessionError {}
