use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

/// Bearer-token extraction middleware.
///
/// Pulls the `Authorization: Bearer <token>` header and inserts `AuthUser`
/// into request extensions for handlers and the rate limiter to use.
/// Credential verification happens in the identity gateway in front of
/// this service; requests that reach here carry an already-vetted subject.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let sub = {
        let auth_header = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        token.to_string()
    };

    req.extensions_mut().insert(AuthUser { sub });

    Ok(next.run(req).await)
}

/// Authenticated user identity attached to the request.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub sub: String,
}
