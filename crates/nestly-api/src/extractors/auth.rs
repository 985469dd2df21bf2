//! `AuthenticatedUser` extractor: reads the identity an upstream layer
//! attached to the request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use nestly_core::types::id::UserId;

use crate::error::ApiError;

/// Identity inserted as a request extension by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// The user.
    pub user_id: UserId,
    /// Display name, when the auth layer knows it.
    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    /// Identity without a display name.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Missing authenticated user".to_string()))
    }
}
