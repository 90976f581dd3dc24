#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth_gateway::{AuthorizationEnforcer, TokenVerifier, VerifiedIdentity};
use bytes::{BufMut, Bytes, BytesMut};
use config_engine::RegistryConfig;
use error_common::{RegistryError, Result};
use package_storage::MemoryProvider;
use registry_server::grpc::proto;
use registry_server::RegistryState;

pub const CLIENT_ID: &str = "lift-registry";
pub const WRITER_TOKEN: &str = "writer-token";
pub const OTHER_WRITER_TOKEN: &str = "other-writer-token";
pub const READER_TOKEN: &str = "reader-token";

/// Identity service stand-in answering from a fixed token table
#[derive(Default)]
pub struct FakeVerifier {
    tokens: HashMap<String, VerifiedIdentity>,
    pub calls: AtomicUsize,
}

impl FakeVerifier {
    pub fn new() -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(
            WRITER_TOKEN.to_string(),
            VerifiedIdentity::new("acct-a", vec!["write".to_string()]),
        );
        tokens.insert(
            OTHER_WRITER_TOKEN.to_string(),
            VerifiedIdentity::new("acct-b", vec!["admin".to_string()]),
        );
        tokens.insert(
            READER_TOKEN.to_string(),
            VerifiedIdentity::new("acct-c", vec!["read".to_string()]),
        );
        Self {
            tokens,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify_token(&self, client_id: &str, token: &str) -> Result<VerifiedIdentity> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(client_id, CLIENT_ID);
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| RegistryError::unauthorized("token expired"))
    }
}

pub struct TestRegistry {
    pub state: RegistryState,
    pub verifier: Arc<FakeVerifier>,
    pub storage: Arc<MemoryProvider>,
    pub web_dir: tempfile::TempDir,
}

pub fn test_registry() -> TestRegistry {
    test_registry_with(|_| {})
}

/// Registry over `configure`d defaults
pub fn test_registry_with(configure: impl FnOnce(&mut RegistryConfig)) -> TestRegistry {
    let web_dir = tempfile::tempdir().unwrap();
    std::fs::write(web_dir.path().join("index.html"), "<html>lift</html>").unwrap();
    std::fs::write(web_dir.path().join("app.js"), "console.log('lift')").unwrap();
    std::fs::create_dir_all(web_dir.path().join("lib")).unwrap();
    std::fs::write(web_dir.path().join("lib/api.swagger.json"), r#"{"swagger":"2.0"}"#).unwrap();

    let mut config = RegistryConfig::default();
    config.primary_domain = Some("registry.hooklift.io".to_string());
    config.identity.client_id = CLIENT_ID.to_string();
    config.web.static_dir = web_dir.path().to_path_buf();
    configure(&mut config);

    let verifier = Arc::new(FakeVerifier::new());
    let storage = Arc::new(MemoryProvider::new());
    let enforcer = AuthorizationEnforcer::new(
        verifier.clone(),
        CLIENT_ID,
        config.auth.session_cookie.clone(),
        Duration::from_secs(1),
    );

    TestRegistry {
        state: RegistryState::new(config, enforcer, storage.clone()),
        verifier,
        storage,
        web_dir,
    }
}

pub fn plugin(name: &str, version: &str) -> proto::PluginManifest {
    proto::PluginManifest {
        name: name.to_string(),
        version: version.to_string(),
        description: format!("{name} plugin"),
        license: "MPL-2.0".to_string(),
        packages: vec![proto::Package {
            name: format!("{name}-linux-x64.tgz"),
            arch: "x64".to_string(),
            os: "linux".to_string(),
            url: format!("https://registry.hooklift.io/files/{name}-linux-x64.tgz"),
            checksum: "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08".to_string(),
            algorithm: "sha256".to_string(),
        }],
        ..Default::default()
    }
}

/// Length-prefixed gRPC message frame
pub fn grpc_frame<M: prost::Message>(message: &M) -> Bytes {
    let encoded = message.encode_to_vec();
    let mut frame = BytesMut::with_capacity(encoded.len() + 5);
    frame.put_u8(0);
    frame.put_u32(u32::try_from(encoded.len()).unwrap());
    frame.put_slice(&encoded);
    frame.freeze()
}

/// Messages of a gRPC response body
pub fn decode_frames<M: prost::Message + Default>(mut body: &[u8]) -> Vec<M> {
    let mut messages = Vec::new();
    while body.len() >= 5 {
        let len = u32::from_be_bytes([body[1], body[2], body[3], body[4]]) as usize;
        messages.push(M::decode(&body[5..5 + len]).unwrap());
        body = &body[5 + len..];
    }
    messages
}
