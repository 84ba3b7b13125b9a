use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// The authenticated identity resolved by the access-control layer.
/// Handlers that take this extractor require a valid access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub session_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(parts).ok_or(AppError::Unauthorized)?;
        let claims = state.tokens.verify_access(&token)?;

        Ok(AuthUser {
            user_id: claims.user_id,
            session_id: claims.session_id,
        })
    }
}

/// Optional identity extractor — yields None instead of 401 when the request
/// carries no valid token. Used on routes that allow anonymous reads.
pub struct MaybeUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}

/// Token lookup order: accessToken cookie first, then Authorization: Bearer.
/// The cookie wins when both are present.
fn extract_access_token(parts: &Parts) -> Option<String> {
    if let Some(token) = get_cookie_value(parts, "accessToken") {
        return Some(token.to_string());
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
}

pub fn get_cookie_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_headers(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn cookie_token_is_extracted() {
        let parts = parts_with_headers(&[("cookie", "accessToken=abc123; other=x")]);
        assert_eq!(extract_access_token(&parts).as_deref(), Some("abc123"));
    }

    #[test]
    fn bearer_token_is_extracted() {
        let parts = parts_with_headers(&[("authorization", "Bearer tok-456")]);
        assert_eq!(extract_access_token(&parts).as_deref(), Some("tok-456"));
    }

    #[test]
    fn cookie_takes_precedence_over_bearer() {
        let parts = parts_with_headers(&[
            ("cookie", "accessToken=from-cookie"),
            ("authorization", "Bearer from-header"),
        ]);
        assert_eq!(extract_access_token(&parts).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn missing_token_yields_none() {
        let parts = parts_with_headers(&[("cookie", "unrelated=1")]);
        assert_eq!(extract_access_token(&parts), None);
    }
}
