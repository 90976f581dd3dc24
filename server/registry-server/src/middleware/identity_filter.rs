use auth_gateway::{AuthorizationEnforcer, CredentialLookup};
use axum::{
    extract::{Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Body of every authorization failure answered by this filter
pub const UNAUTHORIZED_BODY: &str = "Authorization required. Access token not found";

fn is_grpc(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/grpc"))
}

/// Authorizes plain HTTP requests from the `authorization` header or the
/// session cookie.
///
/// RPC requests are left to the interceptor chain. Requests without any
/// credential go through unauthenticated; a malformed or rejected credential
/// is answered with 401 before the handler runs.
pub async fn identity_filter(
    State(enforcer): State<AuthorizationEnforcer>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_grpc(&request) {
        return next.run(request).await;
    }

    match enforcer
        .authorize(request.headers(), CredentialLookup::HeaderThenCookie)
        .await
    {
        Ok(Some(identity)) => {
            tracing::debug!(path = %request.uri().path(), subject = %identity.subject, "Request authorized");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => {
            tracing::debug!(path = %request.uri().path(), error = %e, "Request rejected");
            (StatusCode::UNAUTHORIZED, UNAUTHORIZED_BODY).into_response()
        }
    }
}
