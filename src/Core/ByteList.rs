// Growable byte buffer backing every message and queue on both sides of the boundary.

/// Append-only byte buffer with amortized doubling growth.
///
/// The logical length (`len`) and the allocated capacity are tracked
/// separately so that `clear()` keeps the allocation around for the next
/// frame. `shrink_to()` is the only way capacity ever goes down.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ByteList {
    bytes: Vec<u8>,
}

impl ByteList {
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Resets the length to zero. Capacity is retained.
    pub fn clear(&mut self) -> &mut Self {
        self.bytes.clear();
        self
    }

    /// Makes room for `additional` more bytes.
    ///
    /// Grows to twice the current capacity, or to the exact requirement when
    /// doubling is not enough.
    pub fn ensure_capacity(&mut self, additional: usize) -> &mut Self {
        let required = self.bytes.len() + additional;
        let current = self.bytes.capacity();
        if required <= current {
            return self;
        }

        let target = required.max(current * 2);
        // reserve_exact is relative to len, not capacity
        self.bytes.reserve_exact(target - self.bytes.len());
        self
    }

    pub fn push(&mut self, value: u8) -> &mut Self {
        self.ensure_capacity(1);
        self.bytes.push(value);
        self
    }

    /// Appends `length` bytes of `src` starting at `offset`.
    ///
    /// The range is clamped to `src`, so a short source appends what it has.
    pub fn append(&mut self, src: &[u8], offset: usize, length: usize) -> &mut Self {
        let start = offset.min(src.len());
        let end = start.saturating_add(length).min(src.len());
        self.extend_from_slice(&src[start..end])
    }

    pub fn extend_from_slice(&mut self, src: &[u8]) -> &mut Self {
        self.ensure_capacity(src.len());
        self.bytes.extend_from_slice(src);
        self
    }

    /// Replaces the whole content with `src`, reusing the allocation.
    pub fn replace_with(&mut self, src: &[u8]) -> &mut Self {
        self.bytes.clear();
        self.extend_from_slice(src)
    }

    /// Caps the allocation at `max_capacity` bytes, truncating content when
    /// it no longer fits. Used to bound memory held by pooled objects.
    pub fn shrink_to(&mut self, max_capacity: usize) -> &mut Self {
        if self.bytes.capacity() <= max_capacity {
            return self;
        }

        if max_capacity == 0 {
            self.bytes = Vec::new();
            return self;
        }

        self.bytes.truncate(max_capacity);
        let mut replacement = Vec::with_capacity(max_capacity);
        replacement.extend_from_slice(&self.bytes);
        self.bytes = replacement;
        self
    }

    /// Appends a big-endian 32-bit integer.
    pub fn write_i32_be(&mut self, value: i32) -> &mut Self {
        self.extend_from_slice(&value.to_be_bytes())
    }

    /// Reads a big-endian 32-bit integer at `at`, or 0 when fewer than four
    /// bytes remain.
    pub fn read_i32_be(&self, at: usize) -> i32 {
        match self.bytes.get(at..at.saturating_add(4)) {
            Some(&[a, b, c, d]) => i32::from_be_bytes([a, b, c, d]),
            _ => 0,
        }
    }
}

impl AsRef<[u8]> for ByteList {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<&[u8]> for ByteList {
    fn from(src: &[u8]) -> Self {
        let mut list = Self::with_capacity(src.len().max(1));
        list.extend_from_slice(src);
        list
    }
}
