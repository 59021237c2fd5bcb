//! Persistent memory accounting for long lived simulation storage.

use thiserror::Error;

/// Raised when an allocator cannot serve a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("out of memory: requested {requested} bytes with {available} bytes available")]
pub struct OutOfMemory {
    pub requested: usize,
    pub available: usize,
}

/// Source of persistent memory shared between subsystems.
///
/// Storage that lives across simulation steps asks the allocator before it grows and hands the
/// bytes back when it shrinks or is dropped. The allocator decides whether a request can be
/// served; it never moves memory.
pub trait MemoryAllocator: Send {
    /// Requests `byte_count` bytes.
    fn allocate(&mut self, byte_count: usize) -> Result<(), OutOfMemory>;

    /// Returns `byte_count` bytes previously obtained through [`MemoryAllocator::allocate`].
    fn release(&mut self, byte_count: usize);

    /// Gets the number of bytes currently held by callers.
    fn allocated_byte_count(&self) -> usize;
}

/// Allocator backed by the global heap with an optional budget.
#[derive(Debug, Clone, Default)]
pub struct HeapAllocator {
    allocated: usize,
    limit: Option<usize>,
}

impl HeapAllocator {
    /// Creates an allocator without a budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator that refuses requests once `limit` bytes are outstanding.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            allocated: 0,
            limit: Some(limit),
        }
    }
}

impl MemoryAllocator for HeapAllocator {
    fn allocate(&mut self, byte_count: usize) -> Result<(), OutOfMemory> {
        if let Some(limit) = self.limit {
            let available = limit.saturating_sub(self.allocated);
            if byte_count > available {
                return Err(OutOfMemory {
                    requested: byte_count,
                    available,
                });
            }
        }
        self.allocated += byte_count;
        Ok(())
    }

    fn release(&mut self, byte_count: usize) {
        debug_assert!(
            byte_count <= self.allocated,
            "Cannot release more memory than was allocated."
        );
        self.allocated -= byte_count;
    }

    #[inline(always)]
    fn allocated_byte_count(&self) -> usize {
        self.allocated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_allocator_tracks_bytes() {
        let mut allocator = HeapAllocator::new();
        allocator.allocate(128).unwrap();
        allocator.allocate(64).unwrap();
        assert_eq!(allocator.allocated_byte_count(), 192);
        allocator.release(128);
        assert_eq!(allocator.allocated_byte_count(), 64);
    }

    #[test]
    fn limited_allocator_refuses_requests_over_budget() {
        let mut allocator = HeapAllocator::with_limit(100);
        allocator.allocate(60).unwrap();
        let error = allocator.allocate(50).unwrap_err();
        assert_eq!(
            error,
            OutOfMemory {
                requested: 50,
                available: 40
            }
        );
        assert_eq!(allocator.allocated_byte_count(), 60);
        allocator.allocate(40).unwrap();
    }
}
