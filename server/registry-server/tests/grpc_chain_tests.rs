//! Native gRPC calls through the dispatcher and both interceptor chains

mod common;

use axum::body::Body;
use common::{decode_frames, grpc_frame, plugin, test_registry, TestRegistry, READER_TOKEN, WRITER_TOKEN};
use http::{Request, Response, StatusCode, Version};
use http_body_util::BodyExt;
use registry_server::build_service;
use registry_server::grpc::proto;
use tower::ServiceExt;

fn grpc_request<M: prost::Message>(method: &str, message: &M, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .version(Version::HTTP_2)
        .uri(format!("/lift.registry.v1.Registry/{method}"))
        .header("content-type", "application/grpc")
        .header("te", "trailers");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    builder.body(Body::from(grpc_frame(message))).unwrap()
}

/// grpc-status of a response, from headers or trailers, and its body
async fn call(registry: &TestRegistry, request: Request<Body>) -> (String, bytes::Bytes) {
    let response: Response<Body> = build_service(&registry.state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let header_status = response
        .headers()
        .get("grpc-status")
        .map(|v| v.to_str().unwrap().to_string());
    let collected = response.into_body().collect().await.unwrap();
    let trailer_status = collected
        .trailers()
        .and_then(|t| t.get("grpc-status"))
        .map(|v| v.to_str().unwrap().to_string());

    let status = header_status.or(trailer_status).unwrap_or_else(|| "0".to_string());
    (status, collected.to_bytes())
}

async fn seed(registry: &TestRegistry, count: usize) {
    let identity = auth_gateway::VerifiedIdentity::new("acct-a", vec!["write".to_string()]);
    for i in 0..count {
        let manifest: plugins_registry_api::Manifest = plugin(&format!("plugin-{i:02}"), "1.0.0").try_into().unwrap();
        registry.state.registry.publish(Some(&identity), manifest).await.unwrap();
    }
}

#[tokio::test]
async fn test_search_without_credential_passes_through() {
    let registry = test_registry();
    seed(&registry, 3).await;

    let request = grpc_request("Search", &proto::SearchRequest::default(), None);
    let (status, body) = call(&registry, request).await;

    assert_eq!(status, "0");
    let responses: Vec<proto::SearchResponse> = decode_frames(&body);
    assert_eq!(responses[0].plugins.len(), 3);
    assert_eq!(registry.verifier.calls(), 0);
}

#[tokio::test]
async fn test_publish_with_valid_token() {
    let registry = test_registry();

    let request = grpc_request(
        "Publish",
        &proto::PublishRequest {
            plugin: Some(plugin("redis", "1.2.3")),
        },
        Some(&format!("Bearer {WRITER_TOKEN}")),
    );
    let (status, body) = call(&registry, request).await;

    assert_eq!(status, "0");
    let responses: Vec<proto::PublishResponse> = decode_frames(&body);
    assert!(!responses[0].id.is_empty());
    assert_eq!(responses[0].version, "1.2.3");
    assert_eq!(registry.verifier.calls(), 1);
}

#[tokio::test]
async fn test_malformed_authorization_never_reaches_handler() {
    let registry = test_registry();

    for value in ["Basic abc", "Bearer", "Bearer a b", WRITER_TOKEN] {
        let request = grpc_request(
            "Publish",
            &proto::PublishRequest {
                plugin: Some(plugin("redis", "1.0.0")),
            },
            Some(value),
        );
        let (status, _) = call(&registry, request).await;
        assert_eq!(status, "16", "{value:?} should be unauthenticated");
    }

    assert_eq!(registry.verifier.calls(), 0);
    let found = registry
        .state
        .registry
        .search("", plugins_registry_api::PageRequest::default())
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_rejected_token_is_unauthenticated() {
    let registry = test_registry();

    let request = grpc_request("Search", &proto::SearchRequest::default(), Some("Bearer expired"));
    let (status, _) = call(&registry, request).await;

    assert_eq!(status, "16");
    assert_eq!(registry.verifier.calls(), 1);
}

#[tokio::test]
async fn test_publish_without_privileged_scope() {
    let registry = test_registry();

    let publish = proto::PublishRequest {
        plugin: Some(plugin("redis", "1.0.0")),
    };
    let (status, _) = call(&registry, grpc_request("Publish", &publish, None)).await;
    assert_eq!(status, "16");

    let (status, _) = call(
        &registry,
        grpc_request("Publish", &publish, Some(&format!("Bearer {READER_TOKEN}"))),
    )
    .await;
    assert_eq!(status, "7");
}

#[tokio::test]
async fn test_stream_search_pages_through_results() {
    let registry = test_registry();
    seed(&registry, 12).await;

    let request = grpc_request(
        "StreamSearch",
        &proto::SearchRequest {
            results_per_page: 5,
            ..Default::default()
        },
        None,
    );
    let (status, body) = call(&registry, request).await;

    assert_eq!(status, "0");
    let plugins: Vec<proto::PluginManifest> = decode_frames(&body);
    assert_eq!(plugins.len(), 12);
    assert_eq!(plugins[0].name, "plugin-00");
    assert_eq!(plugins[11].name, "plugin-11");
}

#[tokio::test]
async fn test_stream_search_enforces_authorization() {
    let registry = test_registry();
    seed(&registry, 2).await;

    let request = grpc_request("StreamSearch", &proto::SearchRequest::default(), Some("Token abc"));
    let (status, body) = call(&registry, request).await;
    assert_eq!(status, "16");
    assert!(body.is_empty());

    let request = grpc_request("StreamSearch", &proto::SearchRequest::default(), Some("Bearer expired"));
    let (status, _) = call(&registry, request).await;
    assert_eq!(status, "16");
    assert_eq!(registry.verifier.calls(), 1);
}
