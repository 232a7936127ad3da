//! Bearer token extraction.
//!
//! The token identifies the member: it keys per-member state such as the
//! watch flag. Tokens are not verified here; deployments put a gateway in
//! front that does.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use crate::AppState;

/// Member name used when no token is sent and `AUTH_SECRET` is unset.
pub const ANONYMOUS: &str = "anonymous";

/// The member making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
}

impl Member {
    /// Resolve the member from an `Authorization` header value.
    pub fn from_header(header: Option<&str>, require_token: bool) -> Result<Self, &'static str> {
        match header {
            Some(header) if header.starts_with("Bearer ") => {
                let token = header.trim_start_matches("Bearer ").trim();
                if token.is_empty() {
                    return Err("Empty bearer token");
                }
                Ok(Member {
                    id: token.to_string(),
                })
            }
            Some(_) => Err("Invalid authorization header format"),
            None if require_token => Err("Missing authorization header"),
            None => Ok(Member {
                id: ANONYMOUS.to_string(),
            }),
        }
    }
}

impl FromRequestParts<AppState> for Member {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        Member::from_header(header, state.config.auth_secret.is_some())
            .map_err(|reason| (StatusCode::UNAUTHORIZED, reason))
    }
}
