/// Caller identification
///
/// Authentication happens in the reverse proxy in front of the server. The proxy
/// forwards the authenticated username in [`USER_HEADER`]; handlers that act on
/// behalf of a user take [`RemoteUser`] as an extractor.
use crate::{error::ServerError, state::AppState};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use juicebox_core::User;

/// Header carrying the authenticated username
pub const USER_HEADER: &str = "x-juicebox-user";

/// The library user making the request
#[derive(Debug, Clone)]
pub struct RemoteUser(pub User);

impl RemoteUser {
    pub fn user(&self) -> &User {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RemoteUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(USER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ServerError::Unauthorized(format!("Missing {} header", USER_HEADER)))?;

        let user = juicebox_storage::users::get_by_username(state.pool(), username)
            .await?
            .ok_or_else(|| {
                tracing::warn!(username, "Request for unknown user");
                ServerError::Unauthorized(format!("Unknown user: {}", username))
            })?;

        Ok(RemoteUser(user))
    }
}
