//! Per-request choice between the RPC server, the JSON gateway and the
//! remaining HTTP handlers, all behind one listener.

use std::convert::Infallible;
use std::task::{Context, Poll};

use axum::body::Body;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, Request, Response, Version};
use tower::util::{BoxCloneService, Oneshot};
use tower::{Service, ServiceExt};

pub type HttpService = BoxCloneService<Request<Body>, Response<Body>, Infallible>;

const GRPC_CONTENT_TYPE: &str = "application/grpc";
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Grpc,
    Gateway,
    Fallback,
}

fn header_contains(headers: &HeaderMap, name: http::header::HeaderName, needle: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains(needle))
}

/// Where a request goes. The RPC check always comes first; the static
/// exception path only matters for the gateway check.
pub fn route(version: Version, headers: &HeaderMap, path: &str, exception_path: &str) -> Destination {
    if version == Version::HTTP_2 && header_contains(headers, CONTENT_TYPE, GRPC_CONTENT_TYPE) {
        return Destination::Grpc;
    }

    let wants_json =
        header_contains(headers, CONTENT_TYPE, JSON_CONTENT_TYPE) || header_contains(headers, ACCEPT, JSON_CONTENT_TYPE);
    if wants_json && path != exception_path {
        return Destination::Gateway;
    }

    Destination::Fallback
}

#[derive(Clone)]
pub struct ProtocolDispatcher {
    grpc: HttpService,
    gateway: HttpService,
    fallback: HttpService,
    exception_path: String,
}

impl ProtocolDispatcher {
    pub fn new(grpc: HttpService, gateway: HttpService, fallback: HttpService, exception_path: impl Into<String>) -> Self {
        Self {
            grpc,
            gateway,
            fallback,
            exception_path: exception_path.into(),
        }
    }
}

impl Service<Request<Body>> for ProtocolDispatcher {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Oneshot<HttpService, Request<Body>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let destination = route(
            request.version(),
            request.headers(),
            request.uri().path(),
            &self.exception_path,
        );
        tracing::trace!(path = %request.uri().path(), ?destination, "Dispatching request");

        let service = match destination {
            Destination::Grpc => self.grpc.clone(),
            Destination::Gateway => self.gateway.clone(),
            Destination::Fallback => self.fallback.clone(),
        };
        service.oneshot(request)
    }
}
