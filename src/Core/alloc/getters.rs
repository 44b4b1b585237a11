use super::*;

/// Read-only accessors used for monitoring and by the debug formatter.
impl MessagePool {
    /// Messages currently parked on the free list.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Messages allocated because the free list was empty.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Messages served from the free list.
    pub fn reused(&self) -> u64 {
        self.reused
    }

    pub fn retained_capacity(&self) -> usize {
        self.retained_capacity
    }

    pub fn max_pooled(&self) -> usize {
        self.max_pooled
    }
}
