use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use linkletter_core::AppError;
use serde::Serialize;

use crate::dto::now_iso;

/// API error payload. Every error body carries the server time alongside the
/// message, matching the success envelopes.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
    now: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Flow errors are client-visible 400s; only collaborator faults
        // surface as 500.
        let status = match self.0 {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadData
            | AppError::InvalidOptIns(_)
            | AppError::Unauthorized(_)
            | AppError::TokenNotVerified
            | AppError::TokenExpired
            | AppError::EmailFailed
            | AppError::LoginFailed(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
        };

        let payload = Json(ErrorResponse {
            error: self.0.to_string(),
            now: now_iso(),
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body extractor whose rejection is the standard error envelope.
///
/// Axum's built-in rejection answers a missing or malformed body with a
/// plain-text 415/422; these are client faults and must come back as the
/// same `Bad data` envelope every other client fault uses.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|_| ApiError(AppError::BadData))?;

        Ok(Self(value))
    }
}
