use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::util::BoxCloneService;
use tower::Service;

use super::{CallInfo, CallShape, GrpcRequest, GrpcResponse, Interceptor, Next};

/// Declares the stage order of the unary and the streaming chain
#[derive(Default)]
pub struct ChainBuilder {
    unary: Vec<Arc<dyn Interceptor>>,
    streaming: Vec<Arc<dyn Interceptor>>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage to the unary chain, inside every stage added before it
    #[must_use]
    pub fn unary(mut self, stage: Arc<dyn Interceptor>) -> Self {
        self.unary.push(stage);
        self
    }

    /// Append a stage to the streaming chain, inside every stage added before it
    #[must_use]
    pub fn streaming(mut self, stage: Arc<dyn Interceptor>) -> Self {
        self.streaming.push(stage);
        self
    }

    /// Wrap `service`. Paths listed in `streaming_methods` take the streaming
    /// chain, everything else the unary one.
    pub fn build<S>(self, service: S, streaming_methods: &'static [&'static str]) -> InterceptedService<S> {
        InterceptedService {
            unary: self.unary.into(),
            streaming: self.streaming.into(),
            streaming_methods,
            inner: service,
        }
    }
}

/// An RPC service behind its interceptor chains
#[derive(Clone)]
pub struct InterceptedService<S> {
    unary: Arc<[Arc<dyn Interceptor>]>,
    streaming: Arc<[Arc<dyn Interceptor>]>,
    streaming_methods: &'static [&'static str],
    inner: S,
}

impl<S> InterceptedService<S> {
    pub fn stage_count(&self, shape: CallShape) -> usize {
        match shape {
            CallShape::Unary => self.unary.len(),
            CallShape::Streaming => self.streaming.len(),
        }
    }
}

impl<S> Service<GrpcRequest> for InterceptedService<S>
where
    S: Service<GrpcRequest, Response = GrpcResponse, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = GrpcResponse;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<GrpcResponse, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness of the inner service is awaited by the handler at the end of the chain
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: GrpcRequest) -> Self::Future {
        let call = CallInfo::new(request.uri().path(), self.streaming_methods);
        let stages = match call.shape {
            CallShape::Unary => Arc::clone(&self.unary),
            CallShape::Streaming => Arc::clone(&self.streaming),
        };
        let next = Next::new(stages, BoxCloneService::new(self.inner.clone()));

        Box::pin(async move { Ok(next.run(&call, request).await) })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use tonic::Status;
    use tower::ServiceExt;

    use super::*;
    use crate::interceptors::grpc_error_response;

    const STREAMING: &[&str] = &["/test.Echo/Watch"];

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        reject: bool,
    }

    #[async_trait]
    impl Interceptor for Recorder {
        async fn intercept(&self, call: &CallInfo, request: GrpcRequest, next: Next) -> GrpcResponse {
            self.log.lock().unwrap().push(format!("{} in {}", self.name, call.method_name()));
            if self.reject {
                return grpc_error_response(&Status::unauthenticated("rejected"));
            }
            let response = next.run(call, request).await;
            self.log.lock().unwrap().push(format!("{} out", self.name));
            response
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>, reject: bool) -> Arc<dyn Interceptor> {
        Arc::new(Recorder {
            name,
            log: Arc::clone(log),
            reject,
        })
    }

    fn handler(log: &Arc<Mutex<Vec<String>>>) -> BoxCloneService<GrpcRequest, GrpcResponse, Infallible> {
        let log = Arc::clone(log);
        BoxCloneService::new(tower::service_fn(move |_request: GrpcRequest| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("handler".to_string());
                Ok::<_, Infallible>(http::Response::new(Body::empty()))
            }
        }))
    }

    fn request(path: &str) -> GrpcRequest {
        http::Request::post(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_stages_run_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let service = ChainBuilder::new()
            .unary(recorder("security", &log, false))
            .unary(recorder("metrics", &log, false))
            .build(handler(&log), STREAMING);

        service.oneshot(request("/test.Echo/Say")).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["security in Say", "metrics in Say", "handler", "metrics out", "security out"]
        );
    }

    #[tokio::test]
    async fn test_rejecting_stage_stops_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let service = ChainBuilder::new()
            .streaming(recorder("security", &log, true))
            .streaming(recorder("metrics", &log, false))
            .build(handler(&log), STREAMING);

        let response = service.oneshot(request("/test.Echo/Watch")).await.unwrap();

        assert_eq!(response.headers()["grpc-status"], "16");
        assert_eq!(*log.lock().unwrap(), vec!["security in Watch"]);
    }

    #[tokio::test]
    async fn test_call_shape_selects_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let service = ChainBuilder::new()
            .unary(recorder("unary", &log, false))
            .streaming(recorder("streaming", &log, false))
            .build(handler(&log), STREAMING);
        assert_eq!(service.stage_count(CallShape::Unary), 1);

        service.clone().oneshot(request("/test.Echo/Watch")).await.unwrap();
        service.oneshot(request("/test.Echo/Say")).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "streaming in Watch",
                "handler",
                "streaming out",
                "unary in Say",
                "handler",
                "unary out"
            ]
        );
    }
}
