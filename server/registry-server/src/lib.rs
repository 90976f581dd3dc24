//! # Lift Registry Server
//!
//! One TLS listener answering three kinds of traffic:
//!
//! - gRPC calls to the `lift.registry.v1.Registry` service, behind the
//!   unary and streaming interceptor chains
//! - JSON calls under `/v1/plugins`, translated into in-process gRPC calls
//! - package files under `/files` and the web application, behind the
//!   HTTP identity filter
//!
//! [`dispatcher::ProtocolDispatcher`] picks one of the three per request.

pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod grpc;
pub mod handlers;
pub mod interceptors;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod tls;

pub use dispatcher::{Destination, ProtocolDispatcher};
pub use error::{ApiError, ApiErrorResponse};
pub use server::{build_service, storage_from_config, RegistryState};
