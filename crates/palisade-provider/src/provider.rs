//! Cached, hot-reloadable access to the active policy.
//!
//! The whole read-check-reload sequence runs under one mutex, so concurrent
//! callers never race each other into duplicate reloads and nobody can see a
//! half-built policy. Reloads are synchronous: the caller that notices a
//! change pays for the load.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use palisade_policy::{LoadError, Policy, load_policy_from_slice};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, Result};
use crate::store::{FileStore, PolicyStore, Revision};

/// Default minimum interval between storage freshness checks.
pub const DEFAULT_MIN_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// How many times a read is retried when the document changes mid-read.
const MAX_READ_ATTEMPTS: usize = 3;

/// Provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Location of the policy document. Required; `None` makes every
    /// `get()` fail with `not_configured`.
    pub policy_path: Option<PathBuf>,
    /// Whether to watch the document for changes after the first load.
    pub reload_enabled: bool,
    /// Minimum time between freshness checks while a policy is cached.
    pub min_check_interval: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            policy_path: None,
            reload_enabled: true,
            min_check_interval: DEFAULT_MIN_CHECK_INTERVAL,
        }
    }
}

impl ProviderConfig {
    /// Creates a config for the given policy file with default reload settings.
    pub fn new(policy_path: impl Into<PathBuf>) -> Self {
        Self {
            policy_path: Some(policy_path.into()),
            ..Self::default()
        }
    }

    pub fn with_reload(mut self, enabled: bool) -> Self {
        self.reload_enabled = enabled;
        self
    }

    pub fn with_min_check_interval(mut self, interval: Duration) -> Self {
        self.min_check_interval = interval;
        self
    }
}

#[derive(Debug, Default)]
struct CacheState {
    policy: Option<Arc<Policy>>,
    revision: Option<Revision>,
    /// Last time storage was checked and its content verified, good or bad.
    last_check: Option<Instant>,
    /// The revision most recently refused by the loader, with the reason.
    rejected: Option<Rejected>,
}

#[derive(Debug)]
struct Rejected {
    revision: Revision,
    error: Arc<LoadError>,
}

/// Outcome of reading one revision of the document.
enum Loaded {
    Accepted(Arc<Policy>),
    Rejected(Arc<LoadError>),
}

/// Serves the current policy for one storage location.
#[derive(Debug)]
pub struct PolicyProvider {
    store: Option<Box<dyn PolicyStore>>,
    reload_enabled: bool,
    min_check_interval: Duration,
    state: Mutex<CacheState>,
}

impl PolicyProvider {
    /// Creates a file-backed provider from its configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let store = config
            .policy_path
            .map(|path| Box::new(FileStore::new(path)) as Box<dyn PolicyStore>);

        Self {
            store,
            reload_enabled: config.reload_enabled,
            min_check_interval: config.min_check_interval,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Creates a provider over an arbitrary store.
    pub fn from_store(
        store: impl PolicyStore + 'static,
        reload_enabled: bool,
        min_check_interval: Duration,
    ) -> Self {
        Self {
            store: Some(Box::new(store)),
            reload_enabled,
            min_check_interval,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// The configured storage location, if any.
    pub fn locator(&self) -> Option<String> {
        self.store.as_ref().map(|store| store.locator())
    }

    /// Returns the currently cached policy without touching storage.
    pub fn cached(&self) -> Option<Arc<Policy>> {
        self.lock().policy.clone()
    }

    /// Returns the current policy, loading or reloading it as needed.
    ///
    /// - Reload disabled: loads once, then serves the cache forever.
    /// - Reload enabled: within `min_check_interval` of the last verified
    ///   check the previous outcome is repeated without touching storage.
    ///   Otherwise storage is probed; a failed probe fails the call even if a
    ///   policy is cached. A changed revision triggers a full load. A rejected
    ///   document leaves the previous cache in place, and keeps failing
    ///   without being read again until its revision changes.
    pub fn get(&self) -> Result<Arc<Policy>> {
        let Some(store) = self.store.as_deref() else {
            return Err(ProviderError::NotConfigured);
        };

        let mut state = self.lock();

        if !self.reload_enabled {
            if let Some(policy) = &state.policy {
                return Ok(Arc::clone(policy));
            }
            let current = probe(store)?;
            return match load(store, current)? {
                (Loaded::Accepted(policy), revision) => {
                    state.policy = Some(Arc::clone(&policy));
                    state.revision = Some(revision);
                    Ok(policy)
                }
                (Loaded::Rejected(error), _) => Err(rejection(store, error)),
            };
        }

        let now = Instant::now();
        if let Some(last_check) = state.last_check {
            if now.duration_since(last_check) < self.min_check_interval {
                if let Some(rejected) = &state.rejected {
                    return Err(rejection(store, Arc::clone(&rejected.error)));
                }
                if let Some(policy) = &state.policy {
                    return Ok(Arc::clone(policy));
                }
            }
        }

        let current = probe(store)?;

        if let Some(rejected) = &state.rejected {
            if rejected.revision == current {
                debug!(locator = %store.locator(), "policy still at a rejected revision");
                let err = rejection(store, Arc::clone(&rejected.error));
                state.last_check = Some(now);
                return Err(err);
            }
        }

        if let Some(policy) = &state.policy {
            if state.revision == Some(current) {
                debug!(locator = %store.locator(), "policy unchanged");
                let policy = Arc::clone(policy);
                state.rejected = None;
                state.last_check = Some(now);
                return Ok(policy);
            }
        }

        match load(store, current)? {
            (Loaded::Accepted(policy), revision) => {
                state.policy = Some(Arc::clone(&policy));
                state.revision = Some(revision);
                state.rejected = None;
                state.last_check = Some(now);
                Ok(policy)
            }
            (Loaded::Rejected(error), revision) => {
                if state.policy.is_some() {
                    warn!(
                        locator = %store.locator(),
                        kind = error.kind(),
                        "policy reload failed; keeping previous policy cached"
                    );
                }
                state.rejected = Some(Rejected {
                    revision,
                    error: Arc::clone(&error),
                });
                state.last_check = Some(now);
                Err(rejection(store, error))
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // The cache is only ever replaced wholesale, so a poisoned guard
        // still holds a consistent value.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn rejection(store: &dyn PolicyStore, source: Arc<LoadError>) -> ProviderError {
    ProviderError::Validation {
        locator: store.locator(),
        source,
    }
}

fn probe(store: &dyn PolicyStore) -> Result<Revision> {
    store.probe().map_err(|source| {
        error!(locator = %store.locator(), error = %source, "policy storage probe failed");
        ProviderError::Io {
            locator: store.locator(),
            source,
        }
    })
}

/// Reads and decodes the document, starting from the revision `before`.
///
/// The store is probed again after each read; if the revision moved while
/// reading, the bytes may be torn, so the read is retried. The returned
/// revision is the one the decoded bytes belong to.
fn load(store: &dyn PolicyStore, mut before: Revision) -> Result<(Loaded, Revision)> {
    for attempt in 1..=MAX_READ_ATTEMPTS {
        let bytes = store.read().map_err(|source| ProviderError::Io {
            locator: store.locator(),
            source,
        })?;
        let after = probe(store)?;

        if after != before {
            debug!(
                locator = %store.locator(),
                attempt,
                "policy changed during read; retrying"
            );
            before = after;
            continue;
        }

        let policy = match load_policy_from_slice(&bytes) {
            Ok(policy) => policy,
            Err(source) => {
                warn!(
                    locator = %store.locator(),
                    kind = source.kind(),
                    error = %source,
                    "policy document rejected"
                );
                return Ok((Loaded::Rejected(Arc::new(source)), after));
            }
        };

        info!(
            locator = %store.locator(),
            policy_id = policy.id(),
            version = policy.version(),
            rules = policy.rules().len(),
            "loaded policy"
        );
        return Ok((Loaded::Accepted(Arc::new(policy)), after));
    }

    Err(ProviderError::Io {
        locator: store.locator(),
        source: std::io::Error::other(format!(
            "policy kept changing across {MAX_READ_ATTEMPTS} read attempts"
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    use tempfile::tempdir;

    const POLICY_V1: &str = r#"{"id":"p","version":"1","rules":[]}"#;
    const POLICY_V2: &str = r#"{"id":"p","version":"2","rules":[
        {"id":"r1","effect":"allow","actions":["read"],"resource_type":"report"}
    ]}"#;

    /// In-memory store with an explicit revision counter.
    #[derive(Debug, Default)]
    struct MemoryStore {
        document: Mutex<Vec<u8>>,
        generation: AtomicU64,
        probe_fails: std::sync::atomic::AtomicBool,
        reads: AtomicUsize,
        probes: AtomicUsize,
        /// Bump the generation on each read, simulating a writer racing the reader.
        churn_on_read: std::sync::atomic::AtomicBool,
    }

    impl MemoryStore {
        fn with_document(doc: &str) -> Arc<Self> {
            let store = Arc::new(Self::default());
            store.set(doc);
            store
        }

        fn set(&self, doc: &str) {
            *self.document.lock().unwrap() = doc.as_bytes().to_vec();
            self.generation.fetch_add(1, Ordering::SeqCst);
        }

        fn set_probe_fails(&self, fails: bool) {
            self.probe_fails.store(fails, Ordering::SeqCst);
        }
    }

    impl PolicyStore for Arc<MemoryStore> {
        fn locator(&self) -> String {
            "memory://policy".to_string()
        }

        fn probe(&self) -> io::Result<Revision> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.probe_fails.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
            }
            let generation = self.generation.load(Ordering::SeqCst);
            Ok(Revision::new(
                UNIX_EPOCH + Duration::from_secs(generation),
                self.document.lock().unwrap().len() as u64,
            ))
        }

        fn read(&self) -> io::Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.churn_on_read.load(Ordering::SeqCst) {
                self.generation.fetch_add(1, Ordering::SeqCst);
            }
            Ok(self.document.lock().unwrap().clone())
        }
    }

    fn reloading(store: &Arc<MemoryStore>, interval: Duration) -> PolicyProvider {
        PolicyProvider::from_store(Arc::clone(store), true, interval)
    }

    #[test]
    fn test_not_configured() {
        let provider = PolicyProvider::new(ProviderConfig::default());

        let err = provider.get().unwrap_err();
        assert_eq!(err.kind(), "not_configured");
        assert!(err.hint().contains("no storage locator configured"));
        assert!(provider.cached().is_none());
        assert!(!provider.is_configured());
    }

    #[test]
    fn test_default_config() {
        let config = ProviderConfig::default();
        assert!(config.reload_enabled);
        assert_eq!(config.min_check_interval, Duration::from_millis(500));
        assert!(config.policy_path.is_none());
    }

    #[test]
    fn test_throttle_window_returns_identical_cache() {
        let store = MemoryStore::with_document(POLICY_V1);
        let provider = reloading(&store, Duration::from_secs(3600));

        let first = provider.get().unwrap();
        store.set(POLICY_V2);
        let second = provider.get().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.version(), "1");
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unchanged_revision_skips_read() {
        let store = MemoryStore::with_document(POLICY_V1);
        let provider = reloading(&store, Duration::ZERO);

        let first = provider.get().unwrap();
        let second = provider.get().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
        assert!(store.probes.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn test_changed_revision_reloads() {
        let store = MemoryStore::with_document(POLICY_V1);
        let provider = reloading(&store, Duration::ZERO);

        assert_eq!(provider.get().unwrap().version(), "1");
        store.set(POLICY_V2);

        let reloaded = provider.get().unwrap();
        assert_eq!(reloaded.version(), "2");
        assert_eq!(reloaded.rules().len(), 1);
    }

    #[test]
    fn test_probe_failure_fails_closed() {
        let store = MemoryStore::with_document(POLICY_V1);
        let provider = reloading(&store, Duration::ZERO);
        provider.get().unwrap();

        store.set_probe_fails(true);
        let err = provider.get().unwrap_err();
        assert_eq!(err.kind(), "io_error");
        assert!(err.hint().contains("gone"));

        // The cache survives, but is only served again once storage answers.
        assert!(provider.cached().is_some());
        store.set_probe_fails(false);
        assert_eq!(provider.get().unwrap().version(), "1");
    }

    #[test]
    fn test_validation_failure_keeps_previous_cache() {
        let store = MemoryStore::with_document(POLICY_V1);
        let provider = reloading(&store, Duration::ZERO);
        let original = provider.get().unwrap();

        store.set(r#"{"id":"p","version":"3","rules":[{"id":"r","effect":"maybe"}]}"#);
        let err = provider.get().unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        let cached = provider.cached().unwrap();
        assert!(Arc::ptr_eq(&original, &cached));

        // Still failing while the bad document is in place, without re-reading it.
        let reads = store.reads.load(Ordering::SeqCst);
        assert_eq!(provider.get().unwrap_err().kind(), "validation_error");
        assert_eq!(store.reads.load(Ordering::SeqCst), reads);

        store.set(POLICY_V2);
        assert_eq!(provider.get().unwrap().version(), "2");
    }

    #[test]
    fn test_rejected_document_is_not_reread_within_window() {
        let interval = Duration::from_millis(200);
        let store = MemoryStore::with_document(POLICY_V1);
        let provider = reloading(&store, interval);
        let original = provider.get().unwrap();

        std::thread::sleep(interval + Duration::from_millis(50));
        store.set(r#"{"id":"p","version":"3","rules":[{"id":"r","effect":"maybe"}]}"#);

        let reads_before = store.reads.load(Ordering::SeqCst);
        let probes_before = store.probes.load(Ordering::SeqCst);
        for _ in 0..50 {
            let err = provider.get().unwrap_err();
            assert_eq!(err.kind(), "validation_error");
            assert!(err.hint().contains("schema_violation"));
        }

        // One read (plus its confirming probe) for the whole burst.
        assert_eq!(store.reads.load(Ordering::SeqCst), reads_before + 1);
        assert_eq!(store.probes.load(Ordering::SeqCst), probes_before + 2);
        assert!(Arc::ptr_eq(&provider.cached().unwrap(), &original));
    }

    #[test]
    fn test_rejected_revision_cleared_when_storage_reverts() {
        let store = MemoryStore::with_document(POLICY_V1);
        let provider = reloading(&store, Duration::ZERO);
        provider.get().unwrap();

        store.set(r#"{"id":"p","version":"3","rules":[],"extra":true}"#);
        assert_eq!(provider.get().unwrap_err().kind(), "validation_error");

        store.set(POLICY_V2);
        assert_eq!(provider.get().unwrap().version(), "2");
        assert_eq!(provider.get().unwrap().version(), "2");
    }

    #[test]
    fn test_probe_failure_is_not_masked_by_throttle() {
        let interval = Duration::from_millis(200);
        let store = MemoryStore::with_document(POLICY_V1);
        let provider = reloading(&store, interval);
        provider.get().unwrap();

        std::thread::sleep(interval + Duration::from_millis(50));
        store.set_probe_fails(true);

        let probes_before = store.probes.load(Ordering::SeqCst);
        assert_eq!(provider.get().unwrap_err().kind(), "io_error");
        assert_eq!(provider.get().unwrap_err().kind(), "io_error");
        assert_eq!(store.probes.load(Ordering::SeqCst), probes_before + 2);
    }

    #[test]
    fn test_first_load_failure_is_not_an_empty_policy() {
        let store = MemoryStore::with_document("{not json");
        let provider = reloading(&store, Duration::ZERO);

        let err = provider.get().unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        match err {
            ProviderError::Validation { source, .. } => {
                assert_eq!(source.kind(), "malformed_syntax");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(provider.cached().is_none());
    }

    #[test]
    fn test_reload_disabled_never_touches_storage_again() {
        let store = MemoryStore::with_document(POLICY_V1);
        let provider = PolicyProvider::from_store(Arc::clone(&store), false, Duration::ZERO);

        let first = provider.get().unwrap();
        let probes_after_load = store.probes.load(Ordering::SeqCst);

        store.set(POLICY_V2);
        store.set_probe_fails(true);
        let second = provider.get().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
        assert_eq!(store.probes.load(Ordering::SeqCst), probes_after_load);
    }

    #[test]
    fn test_document_churning_during_read_fails() {
        let store = MemoryStore::with_document(POLICY_V1);
        store.churn_on_read.store(true, Ordering::SeqCst);
        let provider = reloading(&store, Duration::ZERO);

        let err = provider.get().unwrap_err();
        assert_eq!(err.kind(), "io_error");
        assert_eq!(store.reads.load(Ordering::SeqCst), MAX_READ_ATTEMPTS);
        assert!(provider.cached().is_none());
    }

    #[test]
    fn test_concurrent_callers_load_once() {
        let store = MemoryStore::with_document(POLICY_V2);
        let provider = Arc::new(reloading(&store, Duration::from_secs(3600)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                std::thread::spawn(move || provider.get().unwrap())
            })
            .collect();
        let policies: Vec<Arc<Policy>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
        assert!(policies.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_file_backed_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, POLICY_V1).unwrap();

        let provider = PolicyProvider::new(
            ProviderConfig::new(&path).with_min_check_interval(Duration::ZERO),
        );
        assert_eq!(provider.get().unwrap().version(), "1");

        std::fs::write(&path, POLICY_V2).unwrap();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(10))
            .unwrap();

        assert_eq!(provider.get().unwrap().version(), "2");
        assert_eq!(provider.locator(), Some(path.display().to_string()));
    }

    #[test]
    fn test_file_removed_fails_with_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, POLICY_V1).unwrap();

        let provider = PolicyProvider::new(
            ProviderConfig::new(&path).with_min_check_interval(Duration::ZERO),
        );
        provider.get().unwrap();

        std::fs::remove_file(&path).unwrap();
        assert_eq!(provider.get().unwrap_err().kind(), "io_error");
    }
}
