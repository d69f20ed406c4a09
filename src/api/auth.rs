//! Signup/signin endpoints

use crate::api::ApiError;
use crate::core::error::ServiceError;
use crate::core::traits::AuthService;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
}

async fn signup(
    Inject(auth_service): Inject<dyn AuthService>,
    Json(request): Json<schemas::SignUpRequest>,
) -> Result<Json<schemas::AuthResponse>, ApiError> {
    let session = auth_service
        .signup(&request.email, &request.password)
        .await
        .map_err(|e| match e {
            ServiceError::Invalid(detail) => ApiError::new(StatusCode::BAD_REQUEST, detail),
            _ => ApiError::internal("Internal server error"),
        })?;

    Ok(Json(session.into()))
}

async fn signin(
    Inject(auth_service): Inject<dyn AuthService>,
    Json(request): Json<schemas::SignInRequest>,
) -> Result<Json<schemas::AuthResponse>, ApiError> {
    // Unknown email and wrong password collapse into one response so the
    // endpoint cannot be used to enumerate accounts.
    let session = auth_service
        .signin(&request.email, &request.password)
        .await
        .map_err(|e| match e {
            ServiceError::Unauthenticated => {
                ApiError::new(StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            _ => ApiError::internal("Internal server error"),
        })?;

    Ok(Json(session.into()))
}

pub mod schemas {
    use crate::core::security::{AuthSession, CurrentUser};
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug)]
    pub struct SignUpRequest {
        pub email: String,
        pub password: String,
    }

    #[derive(Deserialize, Debug)]
    pub struct SignInRequest {
        pub email: String,
        pub password: String,
    }

    #[derive(Serialize, Debug)]
    pub struct AuthResponse {
        pub access_token: String,
        pub token_type: String,
        pub user: CurrentUser,
    }

    impl From<AuthSession> for AuthResponse {
        fn from(session: AuthSession) -> Self {
            AuthResponse {
                access_token: session.access_token,
                token_type: "bearer".to_owned(),
                user: session.user,
            }
        }
    }
}
