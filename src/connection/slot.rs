// Copyright 2024, The rust-ipfs-core Authors
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// The shared inbound-connection counter, enforcing `connection_cap` (§8 invariant 2).
#[derive(Clone, Default)]
pub struct ConnectionCounter {
    count: Arc<AtomicUsize>,
}

impl ConnectionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Attempts to reserve one slot under `cap`. Returns the guard on success, or `None` if the
    /// cap is already reached — the caller must close the new connection without incrementing.
    pub fn try_acquire(&self, cap: usize) -> Option<ConnectionSlot> {
        loop {
            let current = self.count.load(Ordering::SeqCst);
            if current >= cap {
                return None;
            }
            if self
                .count
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Some(ConnectionSlot { count: self.count.clone(), released: false });
            }
        }
    }
}

/// RAII guard for one occupied connection slot. Decrements the shared counter exactly once,
/// either via explicit [`ConnectionSlot::release`] or on `Drop`, satisfying the once-and-only-once
/// invariant regardless of which exit path a `ConnectionWorker` takes.
pub struct ConnectionSlot {
    count: Arc<AtomicUsize>,
    released: bool,
}

impl ConnectionSlot {
    pub fn release(mut self) {
        self.do_release();
    }

    fn do_release(&mut self) {
        if !self.released {
            self.count.fetch_sub(1, Ordering::SeqCst);
            self.released = true;
        }
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.do_release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_respects_cap() {
        let counter = ConnectionCounter::new();
        let a = counter.try_acquire(2).unwrap();
        let _b = counter.try_acquire(2).unwrap();
        assert!(counter.try_acquire(2).is_none());
        assert_eq!(counter.current(), 2);
        drop(a);
        assert_eq!(counter.current(), 1);
    }

    #[test]
    fn drop_decrements_exactly_once() {
        let counter = ConnectionCounter::new();
        let slot = counter.try_acquire(1).unwrap();
        assert_eq!(counter.current(), 1);
        slot.release();
        assert_eq!(counter.current(), 0);
    }
}
