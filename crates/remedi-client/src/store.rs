//! Correlation store: completed responses waiting for their poller.
//!
//! One table per keyed message kind plus a single slot for the
//! supported-language response. The dispatcher is the only producer;
//! pollers drain entries with `take`, which removes them. A key holds at
//! most one response: a second arrival before the take replaces the first.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use remedi_core::{ProcessorResponse, SupportedLanguageResponse, TranslationResponse};

/// Concurrent key → response table with take-once semantics.
pub struct CorrelationTable<K, V> {
    entries: Arc<DashMap<K, V>>,
}

impl<K: Eq + Hash, V> CorrelationTable<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Store a response, returning the unread one it replaced.
    pub fn store(&self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    /// Remove and return the response for `key`, if it has arrived.
    pub fn take<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V> Default for CorrelationTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for CorrelationTable<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

/// Keyless single-entry variant of [`CorrelationTable`].
pub struct ResponseSlot<V> {
    cell: Arc<Mutex<Option<V>>>,
}

impl<V> ResponseSlot<V> {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self, value: V) -> Option<V> {
        self.lock().replace(value)
    }

    pub fn take(&self) -> Option<V> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<V>> {
        // A panic while holding this lock cannot leave the Option half-written.
        self.cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<V> Default for ResponseSlot<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for ResponseSlot<V> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

/// All pending responses for one client. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct CorrelationStore {
    /// job_id → translation response
    translations: CorrelationTable<u64, TranslationResponse>,
    /// job token group → pre-processor response
    pre_processing: CorrelationTable<String, ProcessorResponse>,
    /// job token group → post-processor response
    post_processing: CorrelationTable<String, ProcessorResponse>,
    languages: ResponseSlot<SupportedLanguageResponse>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_translation(&self, response: TranslationResponse) -> Option<TranslationResponse> {
        self.translations.store(response.job_id, response)
    }

    pub fn take_translation(&self, job_id: u64) -> Option<TranslationResponse> {
        self.translations.take(&job_id)
    }

    pub fn store_pre_processing(&self, group: String, response: ProcessorResponse) -> Option<ProcessorResponse> {
        self.pre_processing.store(group, response)
    }

    pub fn take_pre_processing(&self, group: &str) -> Option<ProcessorResponse> {
        self.pre_processing.take(group)
    }

    pub fn store_post_processing(&self, group: String, response: ProcessorResponse) -> Option<ProcessorResponse> {
        self.post_processing.store(group, response)
    }

    pub fn take_post_processing(&self, group: &str) -> Option<ProcessorResponse> {
        self.post_processing.take(group)
    }

    pub fn store_languages(&self, response: SupportedLanguageResponse) -> Option<SupportedLanguageResponse> {
        self.languages.store(response)
    }

    pub fn take_languages(&self) -> Option<SupportedLanguageResponse> {
        self.languages.take()
    }

    /// Number of responses stored and not yet taken, across all tables.
    pub fn pending(&self) -> usize {
        self.translations.len()
            + self.pre_processing.len()
            + self.post_processing.len()
            + usize::from(!self.languages.is_empty())
    }
}
