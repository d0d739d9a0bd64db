use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{cookie::extract_token, jwt::JwtKeys};
use crate::error::ApiError;

/// Resolves the `token` cookie to the id of the signed-in user. Handlers that
/// take this extractor are not run when the cookie is missing or invalid.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or(ApiError::Auth("Unauthorized"))?;

        let keys = JwtKeys::from_ref(state);
        match keys.verify(&token) {
            Ok(claims) => Ok(AuthUser(claims.user)),
            Err(e) => {
                warn!(error = %e, "invalid session token");
                Err(ApiError::Auth("Unauthorized"))
            }
        }
    }
}
