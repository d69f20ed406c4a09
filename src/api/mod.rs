//! HTTP surface: error envelope and the bearer-token extractor.

use crate::core::security::CurrentUser;
use crate::core::traits::TokenAuthenticator;
use async_trait::async_trait;
use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use di_axum::Inject;
use serde_json::json;

pub mod auth;
pub mod chat;
pub mod todos;

/// Error response carrying the uniform `{detail, success: false}` envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> ApiError {
        ApiError {
            status,
            detail: detail.into(),
        }
    }

    /// Every authentication failure renders identically, whatever the cause.
    pub fn unauthorized() -> ApiError {
        ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn internal(detail: impl Into<String>) -> ApiError {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "detail": self.detail, "success": false })),
        )
            .into_response()
    }
}

/// Resolves the caller identity from `Authorization: Bearer <token>`.
#[derive(Debug)]
pub struct ExtractUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for ExtractUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        let Inject(authenticator) =
            Inject::<dyn TokenAuthenticator>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::internal("Internal server error"))?;

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(ApiError::unauthorized)?
            .to_str()
            .map_err(|_| ApiError::unauthorized())?;

        let token = header
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
            .ok_or_else(ApiError::unauthorized)?;

        let user = authenticator
            .authenticate(token)
            .map_err(|_| ApiError::unauthorized())?;

        Ok(ExtractUser(user))
    }
}
