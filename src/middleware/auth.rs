use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::{error::AppError, models::Principal, state::AppState};

/// Extracts the identity-provider subject from `Authorization: Bearer <subject>`
pub fn bearer_subject(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves the request's principal, rejecting with 401 when there is none
#[async_trait]
impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let subject = bearer_subject(&parts.headers).ok_or(AppError::Unauthorized)?;

        let user = state
            .store
            .find_user_by_external_id(subject)
            .await?
            .ok_or_else(|| {
                tracing::debug!("Bearer subject did not resolve to a user");
                AppError::Unauthorized
            })?;

        Ok(Principal { user })
    }
}
