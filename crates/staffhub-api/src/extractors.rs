//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use staffhub_auth::jwt::verifier::AuthenticatedUser;
use staffhub_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, extracted from a `Bearer` credential.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("Expected a Bearer credential"))?;

        let user = state.verifier.verify(token)?;
        Ok(Self(user))
    }
}
