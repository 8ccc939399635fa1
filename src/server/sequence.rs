//! # Sequence Allocation
//!
//! Hands out the sample numbers that name each submission's files. One
//! allocator is constructed per service run and shared by all requests.
//! Numbering starts at 1 on every run and is not persisted.

use std::sync::Mutex;

/// Thread-safe, strictly increasing counter starting at 1.
///
/// The lock is held only for the increment-and-read, never across I/O.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    last: Mutex<u64>,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next number. Every call returns a value greater than all
    /// previously returned ones; numbers are never handed out twice.
    pub fn next(&self) -> u64 {
        // A panic elsewhere cannot leave a half-updated u64 behind
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *last += 1;
        *last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_at_one_and_increases() {
        let allocator = SequenceAllocator::new();
        assert_eq!(allocator.next(), 1);
        assert_eq!(allocator.next(), 2);
        assert_eq!(allocator.next(), 3);
    }

    #[test]
    fn test_allocators_are_independent() {
        let first = SequenceAllocator::new();
        let second = SequenceAllocator::new();
        first.next();
        first.next();
        assert_eq!(second.next(), 1);
    }

    #[test]
    fn test_concurrent_allocation_has_no_duplicates_or_gaps() {
        let allocator = Arc::new(SequenceAllocator::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = allocator.clone();
                thread::spawn(move || (0..250).map(|_| allocator.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut numbers: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        numbers.sort_unstable();

        assert_eq!(numbers, (1..=2000).collect::<Vec<u64>>());
    }
}
