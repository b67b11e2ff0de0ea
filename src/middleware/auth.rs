use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use axum_extra::extract::cookie::CookieJar;
use headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::debug;

use crate::db::DbUser;
use crate::error::RakError;
use crate::router::RakState;

/// Pull the session token from the auth cookie, falling back to
/// `Authorization: Bearer <token>`.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    // 1) cookie set by the auth provider
    let jar = CookieJar::from_headers(headers);
    if let Some(c) = jar.get(cookie_name)
        && !c.value().is_empty()
    {
        return Some(c.value().to_string());
    }

    // 2) header: Authorization: Bearer <token>
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve the request's session to a stored user, if any.
pub async fn resolve_user(state: &RakState, headers: &HeaderMap) -> Result<Option<DbUser>, RakError> {
    let Some(token) = session_token(headers, &state.settings.session_cookie) else {
        return Ok(None);
    };
    let Some(email) = state.storage.find_session_email(&token).await? else {
        debug!("no live session for presented token");
        return Ok(None);
    };
    let user = state.storage.find_user_by_email(&email).await?;
    if user.is_none() {
        debug!(email = %email, "session user not found");
    }
    Ok(user)
}

/// Extractor for routes that require a signed-in user.
#[derive(Debug, Clone)]
pub struct SessionUser(pub DbUser);

impl FromRequestParts<RakState> for SessionUser {
    type Rejection = RakError;

    async fn from_request_parts(parts: &mut Parts, state: &RakState) -> Result<Self, Self::Rejection> {
        resolve_user(state, &parts.headers)
            .await?
            .map(SessionUser)
            .ok_or(RakError::Unauthorized)
    }
}

/// Extractor for pages that render differently for guests.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<DbUser>);

impl FromRequestParts<RakState> for MaybeSession {
    type Rejection = RakError;

    async fn from_request_parts(parts: &mut Parts, state: &RakState) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(resolve_user(state, &parts.headers).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; authjs.session-token=abc123"),
        );
        headers.insert("authorization", HeaderValue::from_static("Bearer other"));
        assert_eq!(
            session_token(&headers, "authjs.session-token").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn bearer_is_a_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer tok"));
        assert_eq!(
            session_token(&headers, "authjs.session-token").as_deref(),
            Some("tok")
        );
    }

    #[test]
    fn nothing_presented() {
        assert_eq!(session_token(&HeaderMap::new(), "authjs.session-token"), None);
    }
}
