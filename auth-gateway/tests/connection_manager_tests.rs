// Exactly-once dial behaviour of the identity connection manager
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth_gateway::{Dialer, IdentityConnectionManager, TokenVerifier, VerifiedIdentity};
use error_common::{RegistryError, Result};

#[derive(Debug, Clone)]
struct FakeConnection {
    id: usize,
}

#[async_trait]
impl TokenVerifier for FakeConnection {
    async fn verify_token(&self, _client_id: &str, token: &str) -> Result<VerifiedIdentity> {
        Ok(VerifiedIdentity::new(format!("{token}@{}", self.id), vec![]))
    }
}

struct CountingDialer {
    dials: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl Dialer for CountingDialer {
    type Connection = FakeConnection;

    async fn dial(&self) -> Result<FakeConnection> {
        let id = self.dials.fetch_add(1, Ordering::SeqCst);
        // Keep the dial in flight long enough for every caller to pile up
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.fail {
            return Err(RegistryError::UpstreamUnavailable("connection refused".into()));
        }
        Ok(FakeConnection { id })
    }
}

fn manager(fail: bool) -> (Arc<IdentityConnectionManager<CountingDialer>>, Arc<AtomicUsize>) {
    let dials = Arc::new(AtomicUsize::new(0));
    let manager = IdentityConnectionManager::new(CountingDialer {
        dials: Arc::clone(&dials),
        fail,
    });
    (Arc::new(manager), dials)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_callers_share_one_dial() {
    for callers in [1_usize, 2, 16, 64] {
        let (manager, dials) = manager(false);

        let handles: Vec<_> = (0..callers)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.connection().await.map(|c| c.id) })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 0);
        }
        assert_eq!(dials.load(Ordering::SeqCst), 1, "callers = {callers}");
        assert!(manager.is_connected());
    }
}

#[tokio::test]
async fn test_later_callers_reuse_connection() {
    let (manager, dials) = manager(false);

    manager.connection().await.unwrap();
    let identity = manager.verify_token("lift-registry", "tok").await.unwrap();

    assert_eq!(identity.subject, "tok@0");
    assert_eq!(dials.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_dial_is_not_retried() {
    let (manager, dials) = manager(true);

    for _ in 0..3 {
        let err = manager.connection().await.unwrap_err();
        assert!(matches!(err, RegistryError::UpstreamUnavailable(msg) if msg.contains("refused")));
    }

    let err = manager.verify_token("lift-registry", "tok").await.unwrap_err();
    assert!(matches!(err, RegistryError::UpstreamUnavailable(_)));
    assert_eq!(dials.load(Ordering::SeqCst), 1);
    assert!(!manager.is_connected());
}
