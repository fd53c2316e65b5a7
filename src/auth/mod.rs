//! PSK-based authentication and operator identity.
//!
//! Implements constant-time comparison to mitigate timing attacks.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the numeric id of the acting operator.
pub const OPERATOR_HEADER: &str = "x-operator-id";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match provided {
        Some(provided_key) => {
            if constant_time_compare(&provided_key, &expected) {
                next.run(request).await
            } else {
                unauthorized_response("Invalid API key")
            }
        }
        None => {
            // Also accept the key as a bearer token
            let bearer = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(|s| s.to_string());

            match bearer {
                Some(bearer_key) if constant_time_compare(&bearer_key, &expected) => {
                    next.run(request).await
                }
                _ => unauthorized_response("Missing or invalid API key"),
            }
        }
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    tracing::warn!("Rejected request: {}", message);
    AppError::Unauthorized(message.to_string()).into_response()
}

/// The authenticated operator acting on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator(pub i64);

impl Operator {
    pub fn id(&self) -> i64 {
        self.0
    }
}

fn parse_operator(value: Option<&str>) -> Result<Operator, AppError> {
    let Some(raw) = value else {
        return Err(AppError::Unauthorized(format!(
            "Missing {} header",
            OPERATOR_HEADER
        )));
    };
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(Operator(id)),
        _ => Err(AppError::Unauthorized(format!(
            "Invalid {} header",
            OPERATOR_HEADER
        ))),
    }
}

impl<S> FromRequestParts<S> for Operator
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OPERATOR_HEADER)
            .and_then(|v| v.to_str().ok());
        parse_operator(value)
    }
}
