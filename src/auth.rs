use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{config::AppConfig, error::AppError, session::{self, SessionClaims}};

/// AdminSession
///
/// The verified admin claim of a back-office request. The route guard already
/// redirects anonymous traffic away from `/admin`; this extractor repeats the
/// check so an admin handler can never run without a session, whatever router it
/// is mounted on.
///
/// Rejection: `AppError::Auth` (401).
#[derive(Debug, Clone)]
pub struct AdminSession(pub SessionClaims);

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let claims = session::from_headers(&parts.headers, &config.session_secret)
            .ok_or_else(|| AppError::Auth("missing or invalid session".to_string()))?;

        if !claims.is_admin() {
            return Err(AppError::Auth("admin role required".to_string()));
        }

        Ok(AdminSession(claims))
    }
}

/// CurrentSession
///
/// The caller's session when one verifies, otherwise `None`. Never rejects; used
/// by public endpoints that only need the caller's identity opportunistically.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<SessionClaims>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        Ok(CurrentSession(session::from_headers(
            &parts.headers,
            &config.session_secret,
        )))
    }
}
