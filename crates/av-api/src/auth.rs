//! # Bearer-Token Authentication
//!
//! Single shared-secret bearer token with actor attribution. Tokens take
//! the form `{actor}:{secret}` — the actor segment names the human behind
//! the request and is attached to every mutation and audit event — or the
//! legacy bare `{secret}` form, which attributes to `system`.
//!
//! ## Security Invariant
//!
//! Secret comparison is constant-time (`subtle::ConstantTimeEq`), with a
//! dummy comparison on length mismatch so timing does not leak the
//! expected secret's length.

use axum::extract::{FromRequestParts, Request};
use axum::http::{header, request::Parts, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Auth configuration injected into request extensions.
///
/// `token: None` disables authentication (development mode); every request
/// is then attributed to `system`.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// The authenticated caller, available to handlers via the
/// [`FromRequestParts`] extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Actor name recorded on mutations and audit events.
    pub actor: String,
}

impl CallerIdentity {
    /// Identity used when authentication is disabled or the legacy bare
    /// token form is presented.
    pub fn system() -> Self {
        Self {
            actor: "system".to_string(),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity attached".to_string()))
    }
}

/// Constant-time equality over token secrets.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        // Compare against self so the work done is independent of where
        // the mismatch occurred.
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token into a caller identity.
///
/// Accepted forms:
/// - `{actor}:{secret}` — attributed to `actor`;
/// - `{secret}` — legacy form, attributed to `system`.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    match provided.split_once(':') {
        Some((actor, secret)) => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid token secret".to_string());
            }
            let actor = actor.trim();
            if actor.is_empty() {
                return Err("actor segment must be non-empty".to_string());
            }
            Ok(CallerIdentity {
                actor: actor.to_string(),
            })
        }
        None => {
            if !constant_time_token_eq(provided, expected_secret) {
                return Err("invalid token secret".to_string());
            }
            Ok(CallerIdentity::system())
        }
    }
}

/// Extract and validate the Bearer token from the Authorization header,
/// injecting [`CallerIdentity`] into request extensions for handlers.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request.extensions().get::<AuthConfig>().cloned();

    match config {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(header_value) if header_value.starts_with("Bearer ") => {
                    match parse_bearer_token(&header_value[7..], expected) {
                        Ok(identity) => {
                            request.extensions_mut().insert(identity);
                            next.run(request).await
                        }
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                            unauthorized_response(&msg)
                        }
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            // Auth disabled.
            request.extensions_mut().insert(CallerIdentity::system());
            next.run(request).await
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    fn test_app(token: Option<String>) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|identity: CallerIdentity| async move { identity.actor }),
            )
            .layer(from_fn(auth_middleware))
            .layer(Extension(AuthConfig { token }))
    }

    async fn send(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = HttpRequest::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_auth_disabled_attributes_to_system() {
        let (status, body) = send(test_app(None), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "system");
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let (status, _) = send(test_app(Some("s3cret".to_string())), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_actor_token_attributes_caller() {
        let (status, body) = send(
            test_app(Some("s3cret".to_string())),
            Some("Bearer jdoe:s3cret"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "jdoe");
    }

    #[tokio::test]
    async fn test_legacy_token_attributes_system() {
        let (status, body) =
            send(test_app(Some("s3cret".to_string())), Some("Bearer s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "system");
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let (status, _) = send(
            test_app(Some("s3cret".to_string())),
            Some("Bearer jdoe:wrong"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_basic_scheme_rejected() {
        let (status, _) = send(
            test_app(Some("s3cret".to_string())),
            Some("Basic anything"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_empty_actor_rejected() {
        assert!(parse_bearer_token(":s3cret", "s3cret").is_err());
    }

    #[test]
    fn test_auth_config_debug_redacts_token() {
        let config = AuthConfig {
            token: Some("hunter2".to_string()),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
