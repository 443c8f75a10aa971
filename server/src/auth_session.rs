//! Login sessions and password handling
//!
//! A [SessionToken] identifies a logged-in user. It is stored in a cookie on the client side,
//! serialized as `{payload}.{signature}` with a base64-encoded payload and an HMAC-SHA256
//! signature with the application secret. Thus, the server does not need to store sessions.

use crate::data_store::UserId;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use ring::hmac;
use std::fmt::{Display, Formatter};

/// Maximum age of a session token, before the user needs to log in again
pub const SESSION_MAX_AGE: TimeDelta = TimeDelta::days(365);

const TOKEN_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    user_id: UserId,
    created: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            created: Utc::now(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Parse and verify a session token from its string representation, as generated by
    /// [SessionToken::as_string] with the same `secret`.
    pub fn from_string(
        data: &str,
        secret: &str,
        max_age: TimeDelta,
    ) -> Result<Self, SessionError> {
        let (payload, signature) = data
            .split_once('.')
            .ok_or(SessionError::InvalidTokenFormat)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::InvalidTokenFormat)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::InvalidTokenFormat)?;
        hmac::verify(&signing_key(secret), &payload, &signature)
            .map_err(|_| SessionError::SignatureVerificationFailed)?;

        let payload = String::from_utf8(payload).map_err(|_| SessionError::InvalidTokenFormat)?;
        let mut fields = payload.split(':');
        let (Some(TOKEN_VERSION), Some(user_id), Some(created), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(SessionError::InvalidTokenFormat);
        };
        let user_id = user_id
            .parse()
            .map_err(|_| SessionError::InvalidTokenFormat)?;
        let created = created
            .parse::<i64>()
            .ok()
            .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0))
            .ok_or(SessionError::InvalidTokenFormat)?;
        if Utc::now() - created > max_age {
            return Err(SessionError::ExpiredToken);
        }
        Ok(Self { user_id, created })
    }

    /// Serialize and sign the session token for storing it in a cookie
    pub fn as_string(&self, secret: &str) -> String {
        let payload = format!(
            "{}:{}:{}",
            TOKEN_VERSION,
            self.user_id,
            self.created.timestamp()
        );
        let signature = hmac::sign(&signing_key(secret), payload.as_bytes());
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature.as_ref())
        )
    }
}

fn signing_key(secret: &str) -> hmac::Key {
    hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes())
}

#[derive(Debug, PartialEq, Eq)]
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
                f.write_str("Session token signature is invalid")
            }
            SessionError::ExpiredToken => f.write_str("Session token is expired"),
        }
    }
}

/// Create a salted argon2 hash of the password for storing it in the database
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check the password against a hash created by [hash_password]. A malformed hash never matches.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}

/// Generate a random token for an organizer invitation link
pub fn generate_invitation_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
