//! Versioned read-only field snapshots.
//!
//! A rebuilt field is published by swapping one [`FieldHandle`] for
//! another. Readers clone the handle for as long as they need it; the old
//! buffer stays alive until its last clone drops, so a reader sees either
//! the whole old field or the whole new one, never a partial rebuild.

use std::ops::Deref;
use std::sync::Arc;

use horde_core::GridVersion;

/// Shared, immutable field data tagged with the grid version it was built
/// from.
#[derive(Debug)]
pub struct FieldHandle<T> {
    data: Arc<T>,
    version: GridVersion,
}

impl<T> FieldHandle<T> {
    /// Wrap freshly built data.
    pub fn new(data: T, version: GridVersion) -> Self {
        Self {
            data: Arc::new(data),
            version,
        }
    }

    /// Grid version the data was built from.
    pub fn version(&self) -> GridVersion {
        self.version
    }

    /// Whether two handles share the same buffer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Number of live handles to this buffer.
    pub fn reader_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }
}

impl<T> Clone for FieldHandle<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            version: self.version,
        }
    }
}

impl<T> Deref for FieldHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

/// Owner of the currently published [`FieldHandle`], if any.
#[derive(Debug)]
pub struct FieldSlot<T> {
    current: Option<FieldHandle<T>>,
    publish_count: u64,
}

impl<T> Default for FieldSlot<T> {
    fn default() -> Self {
        Self {
            current: None,
            publish_count: 0,
        }
    }
}

impl<T> FieldSlot<T> {
    /// An empty slot (field not yet built).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published field. Returns the previous handle.
    pub fn publish(&mut self, data: T, version: GridVersion) -> Option<FieldHandle<T>> {
        self.publish_count += 1;
        self.current.replace(FieldHandle::new(data, version))
    }

    /// Clone the current handle.
    pub fn load(&self) -> Option<FieldHandle<T>> {
        self.current.clone()
    }

    /// Borrow the current data.
    pub fn get(&self) -> Option<&T> {
        self.current.as_deref()
    }

    /// Whether a field has been published.
    pub fn is_built(&self) -> bool {
        self.current.is_some()
    }

    /// Whether the published field was built from `version`.
    pub fn is_current(&self, version: GridVersion) -> bool {
        self.current
            .as_ref()
            .is_some_and(|h| h.version() == version)
    }

    /// How many times a field has been published.
    pub fn publish_count(&self) -> u64 {
        self.publish_count
    }

    /// Drop the published field.
    pub fn clear(&mut self) -> Option<FieldHandle<T>> {
        self.current.take()
    }
}
