use std::time::Instant;

use async_trait::async_trait;
use tonic::Code;

use super::{CallInfo, GrpcRequest, GrpcResponse, Interceptor, Next};

/// Records count and latency of every call that reaches it
pub struct MetricsStage;

#[async_trait]
impl Interceptor for MetricsStage {
    async fn intercept(&self, call: &CallInfo, request: GrpcRequest, next: Next) -> GrpcResponse {
        let started = Instant::now();
        let response = next.run(call, request).await;

        // Successful calls report their status in trailers, which have not been sent yet
        let code = response
            .headers()
            .get("grpc-status")
            .map_or(Code::Ok, |value| Code::from_bytes(value.as_bytes()));

        telemetry::record_grpc_call(
            call.method_name(),
            call.shape.as_str(),
            &format!("{code:?}"),
            started.elapsed(),
        );
        response
    }
}
