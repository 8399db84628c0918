//! Request extractors.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use tally_core::error::DomainError;
use tally_core::models::{CursorCodec, Identifier};

use crate::error::ApiError;

/// Header carrying the authenticated owner, set by the upstream auth layer.
pub const OWNER_HEADER: &str = "x-owner-id";

/// The owner every query is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub Identifier);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", OWNER_HEADER)))?;

        let raw = value.to_str().map_err(|_| {
            ApiError::Unauthorized(format!("{} header is not valid text", OWNER_HEADER))
        })?;

        CursorCodec::parse(raw).map(Owner).map_err(|_| {
            ApiError::Unauthorized(format!("{} header is not a valid identifier", OWNER_HEADER))
        })
    }
}

/// Query string parameters, rejected as `invalid_query` instead of axum's
/// plain-text rejection.
#[derive(Debug, Clone)]
pub struct Params<T>(pub T);

impl<T, S> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::try_from_uri(&parts.uri)
            .map(|Query(params)| Params(params))
            .map_err(|rejection| DomainError::InvalidQuery(rejection.body_text()).into())
    }
}
