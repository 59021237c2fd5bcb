//! Memory accounting for persistent registry storage.

pub mod allocator;

pub use allocator::{HeapAllocator, MemoryAllocator, OutOfMemory};
