//! Session issuing and the signed session cookie.
//!
//! The cookie carries the claim `{ user: { role } }` as an HS256 token. Anything
//! that does not verify against the configured secret is treated exactly like a
//! missing cookie.

use axum::http::{HeaderMap, header};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AppConfig, error::AppError};

pub const SESSION_COOKIE: &str = "session";
pub const ADMIN_ROLE: &str = "admin";

/// `Set-Cookie` value that removes the session.
pub const CLEARED_SESSION_COOKIE: &str = "session=; Path=/; Max-Age=0";

const INVALID_CREDENTIALS: &str = "invalid username or password";

/// SessionUser
///
/// The user part of the claim. `id` is only present when an admin user id is
/// configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

/// SessionClaims
///
/// Payload of the session token. There is no `exp`: a session lives until the
/// cookie is cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user: SessionUser,
    pub iat: i64,
}

impl SessionClaims {
    pub fn admin(id: Option<Uuid>) -> Self {
        Self {
            user: SessionUser {
                role: ADMIN_ROLE.to_string(),
                id,
            },
            iat: Utc::now().timestamp(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == ADMIN_ROLE
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user.id
    }
}

/// authenticate
///
/// Accepts exactly the configured credential pair. Any other input fails with the
/// same generic message.
pub fn authenticate(
    config: &AppConfig,
    username: &str,
    password: &str,
) -> Result<SessionClaims, AppError> {
    if username == config.admin_username && password == config.admin_password {
        Ok(SessionClaims::admin(config.admin_user_id))
    } else {
        Err(AppError::Auth(INVALID_CREDENTIALS.to_string()))
    }
}

pub fn issue_token(claims: &SessionClaims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign session: {e}")))
}

/// decode_token
///
/// Verifies the signature and decodes the claim. Malformed, tampered or foreign
/// tokens all yield `None`.
pub fn decode_token(token: &str, secret: &str) -> Option<SessionClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.set_required_spec_claims::<&str>(&[]);

    decode::<SessionClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .ok()
}

/// Site-wide session cookie with no expiry and no extra attributes.
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/")
}

/// cookie_value
///
/// Finds a cookie by name across every `Cookie` header of the request.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

/// Decodes the session cookie of a request, if any.
pub fn from_headers(headers: &HeaderMap, secret: &str) -> Option<SessionClaims> {
    cookie_value(headers, SESSION_COOKIE).and_then(|token| decode_token(token, secret))
}
