use super::utf::{hash_str, ComparableString};
use std::collections::HashMap;
use std::sync::Arc;

/// Interning table for message type names.
///
/// Buckets are keyed by the UTF-16 rolling hash so a freshly decoded
/// [`ComparableString`] can be resolved without building a `String` first.
/// Entries live as long as the table; there is no eviction.
#[derive(Debug, Default)]
pub struct StringTable {
    buckets: HashMap<i32, Vec<Arc<str>>>,
    count: usize,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct strings held.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the shared instance equal to `text`, adding it if absent.
    pub fn intern(&mut self, text: &str) -> Arc<str> {
        let bucket = self.buckets.entry(hash_str(text)).or_default();
        if let Some(existing) = bucket.iter().find(|s| &***s == text) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(text);
        bucket.push(Arc::clone(&shared));
        self.count += 1;
        shared
    }

    /// Resolves a decoded builder. Only allocates the first time a given
    /// string is seen.
    pub fn intern_builder(&mut self, builder: &ComparableString) -> Arc<str> {
        let bucket = self.buckets.entry(builder.hash_code()).or_default();
        if let Some(existing) = bucket.iter().find(|s| builder.eq_str(s)) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(builder.to_string());
        bucket.push(Arc::clone(&shared));
        self.count += 1;
        shared
    }

    pub fn get(&self, text: &str) -> Option<Arc<str>> {
        self.buckets
            .get(&hash_str(text))
            .and_then(|bucket| bucket.iter().find(|s| &***s == text))
            .cloned()
    }
}
