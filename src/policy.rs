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

//! Locking policies applied to every bucket operation of a
//! [`HashSet`](crate::HashSet).
//!
//! A policy is selected by type parameter when the set is created and is
//! fixed for the set's lifetime. All three policies run the same chain-walk
//! algorithm; they differ only in what is locked, when.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// How a chain walk intends to use the entries it visits.
#[doc(hidden)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// A held bucket or entry lock, or nothing where the policy does not lock at
/// that granularity.
#[doc(hidden)]
pub enum LockGuard<'a> {
    Unlocked,
    Read(RwLockReadGuard<'a, ()>),
    Write(RwLockWriteGuard<'a, ()>),
}

/// Lock slot attached to a bucket or to an entry.
///
/// Policies that do not lock at a given granularity use `()` there, so the
/// slot costs nothing and acquisition compiles away.
#[doc(hidden)]
pub trait ChainLock: Default + Send + Sync + 'static {
    fn acquire(&self, access: Access) -> LockGuard<'_>;
}

impl ChainLock for () {
    #[inline]
    fn acquire(&self, _access: Access) -> LockGuard<'_> {
        LockGuard::Unlocked
    }
}

impl ChainLock for RwLock<()> {
    #[inline]
    fn acquire(&self, access: Access) -> LockGuard<'_> {
        match access {
            Access::Read => LockGuard::Read(self.read()),
            Access::Write => LockGuard::Write(self.write()),
        }
    }
}

/// A concurrency-control discipline for bucket chains.
///
/// This trait is sealed; the only implementations are [`Coarse`],
/// [`FineGrained`], and [`Optimistic`].
pub trait LockingPolicy: private::Sealed + Send + Sync + Sized + 'static {
    #[doc(hidden)]
    type BucketLock: ChainLock;

    #[doc(hidden)]
    type EntryLock: ChainLock;

    /// Walks acquire the next entry's lock before releasing the previous
    /// entry's lock.
    #[doc(hidden)]
    const HAND_OVER_HAND: bool;

    /// Walks take no locks; mutations lock the two splice entries afterwards
    /// and validate before committing.
    #[doc(hidden)]
    const OPTIMISTIC: bool;
}

/// One read/write lock per bucket, held for an operation's whole duration.
///
/// Lookups take the lock shared, insertions and removals take it exclusive.
/// All operations on one bucket serialize against each other; operations on
/// different buckets proceed fully in parallel.
pub struct Coarse;

impl LockingPolicy for Coarse {
    type BucketLock = RwLock<()>;
    type EntryLock = ();
    const HAND_OVER_HAND: bool = false;
    const OPTIMISTIC: bool = false;
}

/// One read/write lock per entry, acquired hand-over-hand.
///
/// A walk is never holding zero locks while another writer could splice
/// around its position, so operations on disjoint regions of one chain may
/// proceed concurrently. Each operation pays one lock acquisition per entry
/// walked.
pub struct FineGrained;

impl LockingPolicy for FineGrained {
    type BucketLock = ();
    type EntryLock = RwLock<()>;
    const HAND_OVER_HAND: bool = true;
    const OPTIMISTIC: bool = false;
}

/// Unlocked traversal with validation at the splice point.
///
/// Lookups never block writers or other readers. Insertions and removals
/// walk without locks, write-lock the two entries adjacent to the splice
/// point, and then re-check that the unlocked walk's conclusion still holds.
/// If it does not, the operation aborts with
/// [`Contended`](crate::InsertError::Contended) and the caller may retry.
pub struct Optimistic;

impl LockingPolicy for Optimistic {
    type BucketLock = ();
    type EntryLock = RwLock<()>;
    const HAND_OVER_HAND: bool = false;
    const OPTIMISTIC: bool = true;
}

mod private {
    pub trait Sealed {}

    impl Sealed for super::Coarse {}
    impl Sealed for super::FineGrained {}
    impl Sealed for super::Optimistic {}
}
