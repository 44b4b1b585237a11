// Ordered set with stable integer handles.
//
// Positional access is a Vec index; membership and handle lookup go through a
// HashMap. Handles survive insertion/removal churn and are what gets handed to
// the engine side of the boundary.

use crate::error::{BridgeError, Result};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Handle 0 is never issued so the other side can use it as "none".
pub const NULL_HANDLE: u32 = 0;

pub struct LookupList<V> {
    /// Dense values in insertion order.
    values: Vec<V>,
    /// `positions[handle]` -> index into `values`; `None` for free handles
    /// and for the reserved handle 0.
    positions: Vec<Option<usize>>,
    /// Released handles, reissued last-in first-out.
    free: Vec<u32>,
    handles: HashMap<V, u32>,
}

impl<V: Hash + Eq + Clone> Default for LookupList<V> {
    fn default() -> Self {
        Self::with_capacity(10)
    }
}

impl<V: Hash + Eq + Clone> LookupList<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut positions = Vec::with_capacity(capacity + 1);
        positions.push(None);
        Self {
            values: Vec::with_capacity(capacity),
            positions,
            free: Vec::new(),
            handles: HashMap::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.positions.clear();
        self.positions.push(None);
        self.free.clear();
        self.handles.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.values.iter()
    }

    /// Inserts `value` unless it is already a member. Returns whether it was
    /// inserted.
    pub fn add(&mut self, value: V) -> bool {
        if self.handles.contains_key(&value) {
            return false;
        }
        self.insert_new(value);
        true
    }

    fn insert_new(&mut self, value: V) -> u32 {
        let position = self.values.len();
        let handle = match self.free.pop() {
            Some(handle) => {
                self.positions[handle as usize] = Some(position);
                handle
            }
            None => {
                let handle = self.positions.len() as u32;
                self.positions.push(Some(position));
                handle
            }
        };
        self.handles.insert(value.clone(), handle);
        self.values.push(value);
        handle
    }

    #[inline]
    pub fn contains(&self, value: &V) -> bool {
        self.handles.contains_key(value)
    }

    /// Handle of `value`, adding it first if necessary.
    pub fn id(&mut self, value: V) -> u32 {
        match self.handles.get(&value) {
            Some(&handle) => handle,
            None => self.insert_new(value),
        }
    }

    /// Position of `value`, adding it first if necessary.
    pub fn index(&mut self, value: V) -> usize {
        if let Some(position) = self.locate(&value) {
            return position;
        }
        let position = self.values.len();
        self.insert_new(value);
        position
    }

    /// Handle of `value` without inserting.
    pub fn handle_of(&self, value: &V) -> Option<u32> {
        self.handles.get(value).copied()
    }

    /// Position of `value` without inserting.
    pub fn locate(&self, value: &V) -> Option<usize> {
        self.handles
            .get(value)
            .and_then(|&handle| self.position_of(handle))
    }

    #[inline]
    fn position_of(&self, handle: u32) -> Option<usize> {
        self.positions.get(handle as usize).copied().flatten()
    }

    #[inline]
    pub fn get(&self, position: usize) -> Option<&V> {
        self.values.get(position)
    }

    /// Value currently owning `handle`. Free, reserved or never-issued
    /// handles are reported as unknown.
    pub fn get_by_handle(&self, handle: u32) -> Result<&V> {
        self.position_of(handle)
            .and_then(|position| self.values.get(position))
            .ok_or(BridgeError::UnknownHandle(handle))
    }

    /// Removes `value`, frees its handle and shifts every later position down
    /// by one. O(n) in the number of handles.
    pub fn remove(&mut self, value: &V) -> Option<V> {
        let handle = self.handles.remove(value)?;
        let removed_position = self.positions[handle as usize].take()?;
        let removed = self.values.remove(removed_position);
        self.free.push(handle);

        for slot in self.positions.iter_mut() {
            if let Some(position) = slot {
                if *position > removed_position {
                    *position -= 1;
                }
            }
        }
        Some(removed)
    }

    pub fn remove_at(&mut self, position: usize) -> Result<V> {
        let value = self
            .values
            .get(position)
            .cloned()
            .ok_or(BridgeError::IndexOutOfRange {
                index: position,
                len: self.values.len(),
            })?;
        self.remove(&value).ok_or(BridgeError::IndexOutOfRange {
            index: position,
            len: self.values.len(),
        })
    }

    pub fn remove_by_handle(&mut self, handle: u32) -> Result<V> {
        let value = self.get_by_handle(handle)?.clone();
        self.remove(&value).ok_or(BridgeError::UnknownHandle(handle))
    }

    pub fn remove_first(&mut self) -> Option<V> {
        self.remove_at(0).ok()
    }

    pub fn remove_last(&mut self) -> Option<V> {
        let last = self.values.len().checked_sub(1)?;
        self.remove_at(last).ok()
    }

    /// Replaces the value at `position`; the handle follows the new value.
    pub fn set(&mut self, position: usize, value: V) -> Result<()> {
        let len = self.values.len();
        let old = self
            .values
            .get(position)
            .ok_or(BridgeError::IndexOutOfRange { index: position, len })?;
        if *old == value {
            return Ok(());
        }
        if self.handles.contains_key(&value) {
            return Err(BridgeError::DuplicateValue);
        }

        let old = old.clone();
        if let Some(handle) = self.handles.remove(&old) {
            self.handles.insert(value.clone(), handle);
        }
        self.values[position] = value;
        Ok(())
    }
}

impl<'a, V> IntoIterator for &'a LookupList<V> {
    type Item = &'a V;
    type IntoIter = std::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<V: fmt::Debug> fmt::Debug for LookupList<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_lookup_list(&self.values, &self.free, f)
    }
}
