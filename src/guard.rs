//! Route guard for the back office.
//!
//! Every request under the administrative prefix must carry a session cookie that
//! verifies and claims the admin role; anything else is redirected to the login
//! page. Requests outside the prefix pass untouched.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    config::AppConfig,
    session::{self, SESSION_COOKIE},
};

pub const ADMIN_PREFIX: &str = "/admin";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

/// Matches `/admin` and `/admin/...`, not `/administrator`.
pub fn is_admin_path(path: &str) -> bool {
    match path.strip_prefix(ADMIN_PREFIX) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// evaluate
///
/// Pure decision over the request path and the raw session cookie value.
pub fn evaluate(path: &str, session_cookie: Option<&str>, secret: &str) -> GuardDecision {
    if !is_admin_path(path) {
        return GuardDecision::Allow;
    }

    let Some(token) = session_cookie else {
        return GuardDecision::Redirect(LOGIN_PATH);
    };

    match session::decode_token(token, secret) {
        Some(claims) if claims.is_admin() => GuardDecision::Allow,
        _ => GuardDecision::Redirect(LOGIN_PATH),
    }
}

/// route_guard
///
/// Middleware form of `evaluate`, layered around the whole router.
pub async fn route_guard(
    State(config): State<AppConfig>,
    request: Request,
    next: Next,
) -> Response {
    let cookie = session::cookie_value(request.headers(), SESSION_COOKIE);
    match evaluate(request.uri().path(), cookie, &config.session_secret) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect(target) => Redirect::temporary(target).into_response(),
    }
}
