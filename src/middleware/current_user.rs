use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::{error::AppError, models::User, routes::AppState};

/// Header set by the upstream gateway once it has authenticated the caller
pub const USERNAME_HEADER: &str = "x-username";

/// The requesting user, if the request is authenticated
///
/// A missing header or an unknown username both mean anonymous. Only a store
/// failure rejects the request.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(username) = parts
            .headers
            .get(USERNAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|username| !username.is_empty())
        else {
            return Ok(Self(None));
        };

        let user = state.store.find_user(username).await?;
        if user.is_none() {
            tracing::debug!(username = %username, "Unknown user, serving anonymously");
        }

        Ok(Self(user))
    }
}
