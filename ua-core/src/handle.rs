// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

//! Generators for numeric ids such as channel, token, subscription and
//! monitored item ids.

use std::sync::atomic::{AtomicU32, Ordering};

/// A thread safe generator of `u32` handles. Wraps around to `first` on
/// overflow and never returns `0`.
#[derive(Debug)]
pub struct AtomicHandle {
    next: AtomicU32,
    first: u32,
}

impl AtomicHandle {
    /// Create a generator starting at `first`, which is raised to `1` if it is `0`.
    pub fn new(first: u32) -> Self {
        let first = first.max(1);
        Self {
            next: AtomicU32::new(first),
            first,
        }
    }

    /// The next handle.
    pub fn next(&self) -> u32 {
        let mut current = self.next.load(Ordering::Acquire);
        loop {
            let following = if current == u32::MAX {
                self.first
            } else {
                current + 1
            };
            match self.next.compare_exchange_weak(
                current,
                following,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return current,
                Err(actual) => current = actual,
            }
        }
    }

    /// Set the next handle. Values below `first` are raised to `first`.
    pub fn set_next(&self, next: u32) {
        self.next.store(next.max(self.first), Ordering::Release);
    }
}

/// A non thread safe handle generator.
#[derive(Debug, Clone)]
pub struct Handle {
    next: u32,
    first: u32,
}

impl Handle {
    /// Create a generator starting at `first`, which is raised to `1` if it is `0`.
    pub fn new(first: u32) -> Self {
        let first = first.max(1);
        Self { next: first, first }
    }

    /// The next handle.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u32 {
        let next = self.next;
        self.next = if next == u32::MAX {
            self.first
        } else {
            next + 1
        };
        next
    }

    /// Peek at the handle `next` would return.
    pub fn peek_next(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::{AtomicHandle, Handle};

    #[test]
    fn wraps_to_first() {
        let mut h = Handle::new(u32::MAX - 1);
        assert_eq!(h.next(), u32::MAX - 1);
        assert_eq!(h.next(), u32::MAX);
        assert_eq!(h.next(), u32::MAX - 1);

        let h = AtomicHandle::new(0);
        assert_eq!(h.next(), 1);
        h.set_next(u32::MAX);
        assert_eq!(h.next(), u32::MAX);
        assert_eq!(h.next(), 1);
    }
}
