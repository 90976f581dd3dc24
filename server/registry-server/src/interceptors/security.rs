use async_trait::async_trait;
use auth_gateway::{AuthorizationEnforcer, CredentialLookup};
use tonic::Status;

use super::{grpc_error_response, CallInfo, GrpcRequest, GrpcResponse, Interceptor, Next};
use crate::error::status_from_error;

/// Verifies the `authorization` metadata entry before the handler runs.
///
/// Calls without the entry go through unauthenticated; handlers that need an
/// identity reject them. Used for unary and streaming calls alike.
pub struct SecurityStage {
    enforcer: AuthorizationEnforcer,
}

impl SecurityStage {
    pub fn new(enforcer: AuthorizationEnforcer) -> Self {
        Self { enforcer }
    }
}

#[async_trait]
impl Interceptor for SecurityStage {
    async fn intercept(&self, call: &CallInfo, mut request: GrpcRequest, next: Next) -> GrpcResponse {
        let credential = match self.enforcer.credential(request.headers(), CredentialLookup::HeaderOnly) {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                tracing::warn!(
                    method = %call.method,
                    shape = call.shape.as_str(),
                    "Call without authorization metadata"
                );
                return next.run(call, request).await;
            }
            Err(e) => {
                tracing::debug!(method = %call.method, error = %e, "Malformed authorization metadata");
                return grpc_error_response(&Status::unauthenticated(e.public_message()));
            }
        };

        match self.enforcer.verify(&credential).await {
            Ok(identity) => {
                tracing::debug!(method = %call.method, subject = %identity.subject, "Call authorized");
                request.extensions_mut().insert(identity);
                next.run(call, request).await
            }
            Err(e) => grpc_error_response(&status_from_error(e)),
        }
    }
}
