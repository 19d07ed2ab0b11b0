//! HTTP handlers - thin projections over the domain services
//!
//! Handlers extract, delegate and serialize; every rule lives in the
//! services. Authentication is an external collaborator: the caller's
//! identity arrives pre-verified in the `X-User-Id` header.

mod item;
mod notification;
mod trade;
mod wallet;

pub use item::*;
pub use notification::*;
pub use trade::*;
pub use wallet::*;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Identity of the calling user, as established upstream
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::PermissionDenied("Missing X-User-Id header".to_string()))?;

        let user_id = Uuid::parse_str(value)
            .map_err(|_| ApiError::PermissionDenied("Invalid X-User-Id header".to_string()))?;

        Ok(AuthenticatedUser { user_id })
    }
}

/// Common pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

impl PageQuery {
    pub fn page(&self) -> i32 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> i32 {
        self.limit.unwrap_or(20)
    }
}
