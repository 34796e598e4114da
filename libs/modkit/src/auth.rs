//! Bearer-token gate.
//!
//! Token issuance lives elsewhere; this side only turns a bearer credential into
//! verified [`Claims`] through a [`ClaimsVerifier`] and rejects the request otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::api::ApiError;

/// Verified principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

#[async_trait]
pub trait ClaimsVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// HS256 JWT verification with a shared secret.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn hs256(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

#[async_trait]
impl ClaimsVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            })
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware: verify the bearer token and expose [`Claims`] as a request extension.
///
/// ```rust,ignore
/// router.layer(axum::middleware::from_fn_with_state(verifier, require_bearer))
/// ```
pub async fn require_bearer(
    State(verifier): State<Arc<dyn ClaimsVerifier>>,
    mut req: Request,
    next: Next,
) -> Response {
    let result = match bearer_token(&req) {
        Some(token) => verifier.verify(token).await,
        None => Err(AuthError::MissingToken),
    };

    match result {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            warn!(path = %req.uri().path(), error = %e, "bearer authentication failed");
            ApiError::Unauthorized.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Extension, Router};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tower::ServiceExt;

    const SECRET: &[u8] = b"test-secret";

    fn token(sub: &str, exp: i64) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: sub.into(),
                exp,
            },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn app() -> Router {
        let verifier: Arc<dyn ClaimsVerifier> = Arc::new(JwtVerifier::hs256(SECRET));
        Router::new()
            .route(
                "/whoami",
                get(|Extension(claims): Extension<Claims>| async move { claims.sub }),
            )
            .layer(axum::middleware::from_fn_with_state(verifier, require_bearer))
    }

    async fn call(auth: Option<String>) -> Response {
        let mut req = axum::http::Request::builder().uri("/whoami");
        if let Some(value) = auth {
            req = req.header(header::AUTHORIZATION, value);
        }
        app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn valid_token_passes_claims_through() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let resp = call(Some(format!("Bearer {}", token("user-1", exp)))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"user-1");
    }

    #[tokio::test]
    async fn missing_or_bad_tokens_are_rejected() {
        assert_eq!(call(None).await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            call(Some("Bearer not-a-jwt".into())).await.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            call(Some("Basic dXNlcjpwYXNz".into())).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let verifier = JwtVerifier::hs256(SECRET);
        let stale = token("user-1", chrono::Utc::now().timestamp() - 3600);
        assert!(matches!(verifier.verify(&stale).await, Err(AuthError::Expired)));
    }
}
