//! Session-keyed storage for analysis reports.
//!
//! Each uploaded file's analysis is cached under an unguessable session key
//! so the dashboard and report layer can fetch it later. The store is an
//! injected abstraction: the in-process DashMap implementation below serves
//! tests and small deployments and can be swapped for an external cache
//! without touching callers.

use crate::analysis::types::AnalysisReport;
use dashmap::DashMap;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// An unguessable identifier for one analyzed upload.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SessionKey(String);

impl SessionKey {
    /// Generates a fresh random key.
    ///
    /// Random bytes are hashed so the key format stays uniform regardless
    /// of the entropy source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        Self(hex_encode(&digest[..16]))
    }

    /// Reconstructs a key from its string form (e.g. a path parameter).
    pub fn from_string(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show a prefix in logs
        write!(f, "{}...", &self.0[..8.min(self.0.len())])
    }
}

/// Key-value storage for analysis reports.
///
/// Implementations must tolerate concurrent writers without corrupting
/// entries; no transactional semantics are required.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &SessionKey) -> Option<AnalysisReport>;
    fn set(&self, key: SessionKey, report: AnalysisReport);
    fn delete(&self, key: &SessionKey) -> bool;
    fn list(&self) -> Vec<SessionKey>;
}

/// In-process store backed by a concurrent map. Unbounded by design:
/// entries live until deleted or the process restarts.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: DashMap<SessionKey, AnalysisReport>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &SessionKey) -> Option<AnalysisReport> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    fn set(&self, key: SessionKey, report: AnalysisReport) {
        self.entries.insert(key, report);
    }

    fn delete(&self, key: &SessionKey) -> bool {
        self.entries.remove(key).is_some()
    }

    fn list(&self) -> Vec<SessionKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
