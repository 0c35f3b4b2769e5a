//! Bounded-retry connection establishment

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use qarag_core::{Connector, Error, Result, RetryPolicy, SearchBackend};

/// Establishes a verified connection to a search backend.
///
/// Every attempt opens a handle and then requires a positive liveness probe;
/// a handle that opens but does not answer the probe counts as a failed attempt.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    policy: RetryPolicy,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self { connector, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Connect, trying at most `policy.max_attempts` times.
    ///
    /// Returns `Error::Connection` once the attempts are exhausted; the retry loop
    /// runs once per call and callers should not wrap it in another one.
    pub async fn connect(&self) -> Result<Arc<C::Backend>> {
        let target = self.connector.describe();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            match self.try_once().await {
                Ok(backend) => {
                    info!(%target, attempt, backend = backend.name(), "connected to search backend");
                    return Ok(Arc::new(backend));
                }
                Err(reason) => {
                    warn!(%target, attempt, max_attempts, %reason, "connection attempt failed");
                    last_error = reason;
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.backoff()).await;
            }
        }

        Err(Error::Connection {
            attempts: max_attempts,
            message: format!("{}: {}", target, last_error),
        })
    }

    async fn try_once(&self) -> std::result::Result<C::Backend, String> {
        let backend = self.connector.open().await.map_err(|e| e.to_string())?;
        match backend.ping().await {
            Ok(true) => Ok(backend),
            Ok(false) => Err("liveness probe was not answered".to_string()),
            Err(e) => Err(format!("liveness probe failed: {}", e)),
        }
    }

    fn backoff(&self) -> Duration {
        let base = self.policy.interval;
        if !self.policy.jitter || base.is_zero() {
            return base;
        }
        let max_extra = base.as_millis() as u64 / 10;
        let extra = rand::thread_rng().gen_range(0..=max_extra);
        base + Duration::from_millis(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qarag_core::{Document, IndexSchema, MultiMatchQuery, SearchResult};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct FakeBackend {
        alive: bool,
    }

    #[async_trait]
    impl SearchBackend for FakeBackend {
        fn name(&self) -> &str {
            "fake"
        }

        async fn ping(&self) -> Result<bool> {
            Ok(self.alive)
        }

        async fn index_exists(&self, _index: &str) -> Result<bool> {
            Ok(true)
        }

        async fn create_index(&self, _index: &str, _schema: &IndexSchema) -> Result<()> {
            Ok(())
        }

        async fn upsert(&self, _index: &str, _document: &Document) -> Result<()> {
            Ok(())
        }

        async fn search(&self, _index: &str, _query: &MultiMatchQuery) -> Result<SearchResult> {
            Ok(SearchResult::default())
        }
    }

    /// Fails to open `open_failures` times, then opens handles that answer pings
    /// only from attempt `alive_from` on.
    struct FlakyConnector {
        attempts: Arc<AtomicU32>,
        open_failures: u32,
        alive_from: u32,
    }

    impl FlakyConnector {
        fn new(open_failures: u32, alive_from: u32) -> Self {
            Self {
                attempts: Arc::new(AtomicU32::new(0)),
                open_failures,
                alive_from,
            }
        }
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        type Backend = FakeBackend;

        async fn open(&self) -> Result<FakeBackend> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.open_failures {
                return Err(Error::Other("connection refused".to_string()));
            }
            Ok(FakeBackend {
                alive: attempt >= self.alive_from,
            })
        }

        fn describe(&self) -> String {
            "fake://search".to_string()
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_connects_after_failures() {
        let connector = FlakyConnector::new(3, 0);
        let attempts = connector.attempts.clone();
        let manager = ConnectionManager::new(connector, fast_policy(10));

        let backend = manager.connect().await.unwrap();
        assert_eq!(backend.name(), "fake");
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_exhausts_exact_attempt_count() {
        let connector = FlakyConnector::new(u32::MAX, 0);
        let attempts = connector.attempts.clone();
        let manager = ConnectionManager::new(connector, fast_policy(7));

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, Error::Connection { attempts: 7, .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_unanswered_ping_is_a_failed_attempt() {
        let connector = FlakyConnector::new(0, 3);
        let attempts = connector.attempts.clone();
        let manager = ConnectionManager::new(connector, fast_policy(5));

        manager.connect().await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let connector = FlakyConnector::new(0, u32::MAX);
        let attempts = connector.attempts.clone();
        let manager = ConnectionManager::new(connector, fast_policy(4));

        let err = manager.connect().await.unwrap_err();
        assert!(err.to_string().contains("liveness probe"));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::new(1, Duration::from_millis(100)).with_jitter(true);
        let manager = ConnectionManager::new(FlakyConnector::new(0, 0), policy);

        for _ in 0..20 {
            let wait = manager.backoff();
            assert!(wait >= Duration::from_millis(100));
            assert!(wait <= Duration::from_millis(110));
        }
    }
}
