//! Duplicate-question cache.
//!
//! Answers are keyed by a fingerprint of the normalized question (trimmed,
//! lower-cased). Questions that differ only in case or surrounding whitespace
//! share one entry, so a follow-up whose meaning changes only through case
//! gets the earlier answer.
//!
//! The cache is memory-only and shared by all turns. Once it grows past its
//! capacity, the oldest entries by insertion order are dropped until only the
//! `retain` most recent remain.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use sha2::{Digest, Sha256};

pub const DEFAULT_CACHE_CAPACITY: usize = 50;
pub const DEFAULT_CACHE_RETAIN: usize = 30;

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

/// Stable fingerprint of a question: SHA-256 of the normalized text, first 16 hex chars.
pub fn fingerprint(question: &str) -> String {
    let normalized = question.trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)[..FINGERPRINT_LEN].to_string()
}

#[derive(Debug, Default)]
struct Entries {
    answers: HashMap<String, String>,
    /// Fingerprints, oldest first.
    order: VecDeque<String>,
}

#[derive(Debug)]
pub struct QuestionCache {
    entries: RwLock<Entries>,
    capacity: usize,
    retain: usize,
}

impl Default for QuestionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_RETAIN)
    }
}

impl QuestionCache {
    /// `retain` is clamped to `capacity`.
    pub fn new(capacity: usize, retain: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity,
            retain: retain.min(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lookup(&self, fingerprint: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.answers.get(fingerprint).cloned()
    }

    /// Store an answer. Existing entries are left untouched.
    ///
    /// Returns the number of entries evicted.
    pub fn insert(&self, fingerprint: String, answer: String) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.answers.contains_key(&fingerprint) {
            return 0;
        }
        entries.order.push_back(fingerprint.clone());
        entries.answers.insert(fingerprint, answer);

        if entries.answers.len() <= self.capacity {
            return 0;
        }

        let mut evicted = 0;
        while entries.answers.len() > self.retain {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.answers.remove(&oldest);
            evicted += 1;
        }
        tracing::debug!(
            evicted,
            remaining = entries.answers.len(),
            "Evicted oldest cached answers"
        );
        evicted
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.answers.clear();
        entries.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .answers
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
