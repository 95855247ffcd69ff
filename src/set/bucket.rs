// MIT License
//
// Copyright (c) 2020 Gregory Meyer
//
// Permission is hereby granted, free of charge, to any person
// obtaining a copy of this software and associated documentation files
// (the "Software"), to deal in the Software without restriction,
// including without limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of the Software,
// and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS
// BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN
// ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use crate::{
    error::{InsertError, LookupError, RemoveError},
    policy::{Access, ChainLock, LockGuard, LockingPolicy},
};

use std::{mem, ptr, sync::atomic::Ordering};

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};

pub(crate) const SENTINEL_KEY: i64 = -1;

/// A node in a bucket's ascending sorted chain.
///
/// Entries reachable from the sentinel are strictly increasing by key. The
/// entry lock is zero-sized under policies that do not lock per entry.
pub(crate) struct Entry<P: LockingPolicy> {
    pub(crate) key: i64,
    pub(crate) next: Atomic<Entry<P>>,
    lock: P::EntryLock,
}

impl<P: LockingPolicy> Entry<P> {
    fn new(key: i64) -> Self {
        Self {
            key,
            next: Atomic::null(),
            lock: P::EntryLock::default(),
        }
    }
}

/// One hash slot: a permanent sentinel entry heading a sorted chain, plus a
/// bucket-wide lock under policies that lock at that granularity.
pub(crate) struct Bucket<P: LockingPolicy> {
    head: Entry<P>,
    lock: P::BucketLock,
}

/// A splice position located by a chain walk: the predecessor entry, its
/// successor (null at the tail), and whatever locks the policy had to take
/// to pin that position. Dropping the position releases the locks.
struct Position<'g, P: LockingPolicy> {
    prev: &'g Entry<P>,
    curr: Shared<'g, Entry<P>>,
    _bucket_guard: LockGuard<'g>,
    _prev_guard: LockGuard<'g>,
    _curr_guard: LockGuard<'g>,
}

impl<P: LockingPolicy> Bucket<P> {
    pub(crate) fn new() -> Self {
        Self {
            head: Entry::new(SENTINEL_KEY),
            lock: P::BucketLock::default(),
        }
    }

    /// Walks the chain to the first entry whose key is greater than or equal
    /// to `key`, taking locks as the policy dictates.
    ///
    /// Under `Coarse` the bucket lock is held for the position's lifetime.
    /// Under `FineGrained` the walk holds the predecessor's and current
    /// entry's locks, hand-over-hand. Under `Optimistic` no locks are taken
    /// and the returned position is unvalidated.
    fn find<'g>(&'g self, key: i64, access: Access, guard: &'g Guard) -> Position<'g, P> {
        let bucket_guard = self.lock.acquire(access);

        let mut prev: &'g Entry<P> = &self.head;
        let mut prev_guard = if P::HAND_OVER_HAND {
            prev.lock.acquire(access)
        } else {
            LockGuard::Unlocked
        };

        let mut curr = prev.next.load_consume(guard);

        while let Some(curr_ref) = unsafe { curr.as_ref() } {
            let curr_guard = if P::HAND_OVER_HAND {
                curr_ref.lock.acquire(access)
            } else {
                LockGuard::Unlocked
            };

            if curr_ref.key >= key {
                return Position {
                    prev,
                    curr,
                    _bucket_guard: bucket_guard,
                    _prev_guard: prev_guard,
                    _curr_guard: curr_guard,
                };
            }

            // hand-over-hand: the predecessor's lock is released here
            prev_guard = curr_guard;
            prev = curr_ref;
            curr = curr_ref.next.load_consume(guard);
        }

        Position {
            prev,
            curr,
            _bucket_guard: bucket_guard,
            _prev_guard: prev_guard,
            _curr_guard: LockGuard::Unlocked,
        }
    }

    /// Write-locks the position's splice entries and re-checks that the
    /// unlocked walk's conclusion still holds: `prev` is reachable from the
    /// sentinel and still points at `curr`.
    fn lock_splice<'g>(&'g self, pos: &mut Position<'g, P>, guard: &'g Guard) -> bool {
        pos._prev_guard = pos.prev.lock.acquire(Access::Write);

        if let Some(curr_ref) = unsafe { pos.curr.as_ref() } {
            pos._curr_guard = curr_ref.lock.acquire(Access::Write);
        }

        self.validate(pos.prev, pos.curr, guard)
    }

    fn validate<'g>(
        &'g self,
        prev: &'g Entry<P>,
        curr: Shared<'g, Entry<P>>,
        guard: &'g Guard,
    ) -> bool {
        let mut node: &Entry<P> = &self.head;

        while !ptr::eq(node, prev) {
            match unsafe { node.next.load_consume(guard).as_ref() } {
                Some(next) => node = next,
                // prev was unlinked while we held no lock
                None => return false,
            }
        }

        prev.next.load(Ordering::Acquire, guard).as_raw() == curr.as_raw()
    }

    pub(crate) fn insert(&self, key: i64, guard: &Guard) -> Result<(), InsertError> {
        let mut pos = self.find(key, Access::Write, guard);

        if let Some(curr_ref) = unsafe { pos.curr.as_ref() } {
            if curr_ref.key == key {
                return Err(InsertError::Duplicate);
            }
        }

        if P::OPTIMISTIC && !self.lock_splice(&mut pos, guard) {
            return Err(InsertError::Contended);
        }

        let new = Owned::new(Entry::new(key));
        new.next.store(pos.curr, Ordering::Relaxed);
        pos.prev.next.store(new, Ordering::Release);

        Ok(())
    }

    pub(crate) fn lookup(&self, key: i64, guard: &Guard) -> Result<(), LookupError> {
        let pos = self.find(key, Access::Read, guard);

        match unsafe { pos.curr.as_ref() } {
            Some(curr_ref) if curr_ref.key == key => Ok(()),
            _ => Err(LookupError::NotFound),
        }
    }

    pub(crate) fn remove(&self, key: i64, guard: &Guard) -> Result<(), RemoveError> {
        let mut pos = self.find(key, Access::Write, guard);

        let curr_ref = match unsafe { pos.curr.as_ref() } {
            Some(curr_ref) if curr_ref.key == key => curr_ref,
            _ => return Err(RemoveError::NotFound),
        };

        if P::OPTIMISTIC && !self.lock_splice(&mut pos, guard) {
            return Err(RemoveError::Contended);
        }

        // Logical unlink. The removed entry's own next pointer is left
        // intact: an unlocked reader standing on it can still reach the rest
        // of the chain, and the epoch reclaimer keeps the successor alive at
        // least as long as that reader's guard.
        let succ = curr_ref.next.load_consume(guard);
        pos.prev.next.store(succ, Ordering::Release);

        // Physical reclamation once no pinned reader can hold a reference.
        unsafe { guard.defer_destroy(pos.curr) };

        Ok(())
    }

    /// Counts live entries. Takes no locks; meaningful only with no
    /// concurrent writers.
    pub(crate) fn count(&self, guard: &Guard) -> usize {
        let mut count = 0;
        let mut curr = self.head.next.load_consume(guard);

        while let Some(curr_ref) = unsafe { curr.as_ref() } {
            count += 1;
            curr = curr_ref.next.load_consume(guard);
        }

        count
    }

    /// Snapshot of the chain's keys, sentinel excluded.
    pub(crate) fn keys(&self, guard: &Guard) -> Vec<i64> {
        let mut keys = Vec::new();
        let mut curr = self.head.next.load_consume(guard);

        while let Some(curr_ref) = unsafe { curr.as_ref() } {
            keys.push(curr_ref.key);
            curr = curr_ref.next.load_consume(guard);
        }

        keys
    }
}

impl<P: LockingPolicy> Drop for Bucket<P> {
    fn drop(&mut self) {
        // Single-owner teardown after quiescence; entries queued with
        // defer_destroy are no longer reachable from the chain.
        let guard = unsafe { crossbeam_epoch::unprotected() };
        let mut curr = mem::replace(&mut self.head.next, Atomic::null()).load(Ordering::Relaxed, guard);

        while !curr.is_null() {
            let owned = unsafe { curr.into_owned() };
            curr = owned.next.load(Ordering::Relaxed, guard);
        }
    }
}
