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

//! A fixed-size concurrent hash set of integer keys, with per-bucket sorted
//! chains under a selectable locking policy.

pub(crate) mod bucket;


use crate::{
    error::{ApplyError, InsertError, LookupError, RemoveError},
    policy::{Coarse, LockingPolicy},
    queue::{Operation, OperationKind},
};

use bucket::Bucket;

use std::fmt;

/// A fixed-size concurrent hash set of non-negative integer keys.
///
/// Keys are distributed over a fixed array of buckets by
/// `hash(key) = key % bucket_count`; each bucket holds a strictly ascending
/// singly-linked chain headed by a permanent sentinel entry. The set never
/// rehashes, so cross-bucket invariants are never required and every
/// operation touches exactly one bucket.
///
/// The concurrency-control discipline is chosen by the `P` type parameter
/// ([`Coarse`] by default) and is fixed for the set's lifetime; see
/// [`LockingPolicy`] for the three disciplines. Under every policy the set
/// may be shared freely across threads by reference; no operation takes
/// `&mut self` besides dropping.
///
/// Unlinked entries are reclaimed through [crossbeam-epoch], so readers that
/// traverse without locks (the [`Optimistic`](crate::Optimistic) policy)
/// never observe freed memory.
///
/// [crossbeam-epoch]: https://docs.rs/crossbeam-epoch
pub struct HashSet<P: LockingPolicy = Coarse> {
    buckets: Box<[Bucket<P>]>,
}

impl<P: LockingPolicy> HashSet<P> {
    /// Creates a set with `bucket_count` buckets, each initialized with a
    /// sentinel entry and an empty chain.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_count` is zero.
    pub fn with_buckets(bucket_count: usize) -> Self {
        assert!(bucket_count > 0, "bucket_count must be greater than zero");

        Self {
            buckets: (0..bucket_count).map(|_| Bucket::new()).collect(),
        }
    }

    /// Returns the number of buckets, fixed at creation.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Inserts `key` into the set.
    ///
    /// The new entry is spliced in immediately before the first entry with a
    /// strictly greater key, keeping the bucket's chain ascending. If an
    /// entry with an equal key is already present, the set is unchanged and
    /// [`InsertError::Duplicate`] is returned.
    ///
    /// Under the [`Optimistic`](crate::Optimistic) policy the operation may
    /// instead fail with [`InsertError::Contended`] when another operation
    /// splices around the insertion point first; the caller may retry.
    ///
    /// Negative keys are rejected with [`InsertError::NegativeKey`].
    pub fn insert(&self, key: i64) -> Result<(), InsertError> {
        if key < 0 {
            return Err(InsertError::NegativeKey);
        }

        let guard = &crossbeam_epoch::pin();

        self.bucket_for(key).insert(key, guard)
    }

    /// Checks whether `key` is in the set.
    ///
    /// Success linearizes at the moment the matching entry is observed; the
    /// entry may be unlinked by a concurrent remove immediately afterwards.
    ///
    /// Negative keys are rejected with [`LookupError::NegativeKey`].
    pub fn lookup(&self, key: i64) -> Result<(), LookupError> {
        if key < 0 {
            return Err(LookupError::NegativeKey);
        }

        let guard = &crossbeam_epoch::pin();

        self.bucket_for(key).lookup(key, guard)
    }

    /// Returns true if `key` is in the set.
    ///
    /// Negative keys are never contained.
    pub fn contains(&self, key: i64) -> bool {
        self.lookup(key).is_ok()
    }

    /// Removes `key` from the set.
    ///
    /// The matching entry is unlinked from its chain and handed to the epoch
    /// reclaimer. If no entry matches, the set is unchanged and
    /// [`RemoveError::NotFound`] is returned.
    ///
    /// Under the [`Optimistic`](crate::Optimistic) policy the operation may
    /// instead fail with [`RemoveError::Contended`] when another operation
    /// splices around the removal point first; the caller may retry.
    ///
    /// Negative keys are rejected with [`RemoveError::NegativeKey`].
    pub fn remove(&self, key: i64) -> Result<(), RemoveError> {
        if key < 0 {
            return Err(RemoveError::NegativeKey);
        }

        let guard = &crossbeam_epoch::pin();

        self.bucket_for(key).remove(key, guard)
    }

    /// Applies a dequeued operation to the set.
    ///
    /// This is the consumer side of the producer/consumer pipeline: records
    /// pulled out of an [`OperationQueue`](crate::OperationQueue) dispatch
    /// to [`insert`](Self::insert), [`remove`](Self::remove), or
    /// [`lookup`](Self::lookup).
    ///
    /// # Panics
    ///
    /// Panics if `op.kind` is [`OperationKind::Undefined`], which no
    /// well-formed queue ever hands out.
    pub fn apply(&self, op: Operation) -> Result<(), ApplyError> {
        match op.kind {
            OperationKind::Insert => self.insert(op.key).map_err(ApplyError::from),
            OperationKind::Remove => self.remove(op.key).map_err(ApplyError::from),
            OperationKind::Lookup => self.lookup(op.key).map_err(ApplyError::from),
            OperationKind::Undefined => panic!("applied an undefined operation"),
        }
    }

    /// Counts live entries by walking every chain.
    ///
    /// This is a diagnostic, not a hot path: it takes no locks, so the count
    /// is only consistent with some serialization of concurrent operations
    /// when called with no concurrent writers.
    pub fn len(&self) -> usize {
        let guard = &crossbeam_epoch::pin();

        self.buckets.iter().map(|b| b.count(guard)).sum()
    }

    /// Returns true if [`len`](Self::len) would return zero, under the same
    /// no-concurrent-writer caveat.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket_for(&self, key: i64) -> &Bucket<P> {
        &self.buckets[key as usize % self.buckets.len()]
    }
}

impl<P: LockingPolicy> fmt::Debug for HashSet<P> {
    /// Renders every bucket's chain, one line per bucket.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = &crossbeam_epoch::pin();

        for (i, bucket) in self.buckets.iter().enumerate() {
            write!(f, "bucket[{}]->", i)?;

            for key in bucket.keys(guard) {
                write!(f, "[{}]->", key)?;
            }

            writeln!(f, "(NULL)")?;
        }

        Ok(())
    }
}
