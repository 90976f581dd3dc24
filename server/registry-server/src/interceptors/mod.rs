//! Stages wrapped around every registry RPC.
//!
//! Stages run in the order they were declared on the [`ChainBuilder`]:
//! the first one sees the call first and the response last. Each stage gets
//! an explicit [`Next`] and decides whether to call it or to answer itself.

pub mod chain;
pub mod metrics;
pub mod security;

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use http::header::CONTENT_TYPE;
use http::HeaderValue;
use tonic::Status;
use tower::util::BoxCloneService;
use tower::ServiceExt;

pub use chain::{ChainBuilder, InterceptedService};
pub use metrics::MetricsStage;
pub use security::SecurityStage;

pub type GrpcRequest = http::Request<Body>;
pub type GrpcResponse = http::Response<Body>;
pub type GrpcHandler = BoxCloneService<GrpcRequest, GrpcResponse, Infallible>;

/// Single request/response or streaming call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    Unary,
    Streaming,
}

impl CallShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::Streaming => "streaming",
        }
    }
}

/// What the stages know about the call before it runs
#[derive(Debug, Clone)]
pub struct CallInfo {
    /// Full RPC path, `/package.Service/Method`
    pub method: String,
    pub shape: CallShape,
}

impl CallInfo {
    pub fn new(path: &str, streaming_methods: &[&str]) -> Self {
        let shape = if streaming_methods.contains(&path) {
            CallShape::Streaming
        } else {
            CallShape::Unary
        };
        Self {
            method: path.to_string(),
            shape,
        }
    }

    /// Method name without package and service
    pub fn method_name(&self) -> &str {
        self.method.rsplit('/').next().unwrap_or(&self.method)
    }
}

#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, call: &CallInfo, request: GrpcRequest, next: Next) -> GrpcResponse;
}

/// The remaining stages of a chain, ending in the RPC handler
pub struct Next {
    stages: Arc<[Arc<dyn Interceptor>]>,
    position: usize,
    handler: GrpcHandler,
}

impl Next {
    pub(crate) fn new(stages: Arc<[Arc<dyn Interceptor>]>, handler: GrpcHandler) -> Self {
        Self {
            stages,
            position: 0,
            handler,
        }
    }

    pub async fn run(self, call: &CallInfo, request: GrpcRequest) -> GrpcResponse {
        let Self {
            stages,
            position,
            handler,
        } = self;

        let stage = stages.get(position).cloned();
        match stage {
            Some(stage) => {
                let next = Self {
                    stages,
                    position: position.saturating_add(1),
                    handler,
                };
                stage.intercept(call, request, next).await
            }
            None => match handler.oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            },
        }
    }
}

/// Trailers-only response carrying `status`, as a gRPC server would send it
pub fn grpc_error_response(status: &Status) -> GrpcResponse {
    let mut response = http::Response::new(Body::empty());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/grpc"));
    if status.add_header(headers).is_err() {
        headers.insert("grpc-status", HeaderValue::from(status.code() as i32));
    }
    response
}
