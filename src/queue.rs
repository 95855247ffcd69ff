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

//! A bounded multiple-producer/multiple-consumer queue of table operations.
//!
//! Each caller takes a ticket by fetch-and-increment; the ticket maps to a
//! ring slot (`seq % capacity`) and an expected generation
//! (`seq / capacity`). A slot's flag packs a filled bit (low bit) and the
//! generation that last wrote or is expected next to write it (`flag >> 1`),
//! so two tickets that map to the same slot in different rounds can never
//! race: each waits until exactly its round's turn. Waits are busy-wait
//! loops that hand the processor back on every failed attempt; nothing in
//! the queue blocks, sleeps, or times out.

use std::{
    cell::UnsafeCell,
    fmt,
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
    thread,
};

use crossbeam_utils::{Backoff, CachePadded};

/// Number of slots in a queue created by [`OperationQueue::new`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// What a queued operation asks the table to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    /// The state of a slot before any producer has written it. Never
    /// legitimately enqueued; observing it out of [`OperationQueue::dequeue`]
    /// means a slot was read before being written and is treated as a fatal
    /// internal-consistency fault.
    Undefined,
    Insert,
    Remove,
    Lookup,
}

/// One unit of work handed from a producer to a consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operation {
    pub key: i64,
    pub kind: OperationKind,
}

/// Busy-wait discipline used while a ticket waits for its slot's turn.
///
/// Every wait in the queue is an active spin that yields the processor in
/// some form on each failed attempt; strategies only choose the form. The
/// generation protocol is identical under every strategy.
pub trait WaitStrategy: Default + Send + Sync + 'static {
    /// State carried across the attempts of one wait loop.
    type Session: Default;

    /// Called after each failed poll of a slot's flag.
    fn pause(session: &mut Self::Session);
}

/// Yields to the scheduler on every failed attempt. The default.
#[derive(Clone, Copy, Debug, Default)]
pub struct YieldNow;

impl WaitStrategy for YieldNow {
    type Session = ();

    #[inline]
    fn pause(_session: &mut ()) {
        thread::yield_now();
    }
}

/// Spins with exponential backoff before falling back to yielding.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpinBackoff;

impl WaitStrategy for SpinBackoff {
    type Session = Backoff;

    #[inline]
    fn pause(session: &mut Backoff) {
        session.snooze();
    }
}

struct Slot {
    /// Low bit: filled. Remaining bits: the generation that last wrote or is
    /// expected next to write this slot.
    flag: AtomicU64,
    op: UnsafeCell<Operation>,
}

/// A bounded MPMC queue of [`Operation`]s with per-slot generation fencing.
///
/// Tickets are totally ordered by the atomic `front`/`rear` counters, and a
/// given slot serves generation `g` strictly before `g + 1`, so nothing is
/// lost or duplicated no matter how many producers and consumers race. Slots
/// are never created or destroyed after construction; they are perpetually
/// reused, re-tagged by generation.
pub struct OperationQueue<W: WaitStrategy = YieldNow> {
    slots: Box<[Slot]>,
    front: CachePadded<AtomicU64>,
    rear: CachePadded<AtomicU64>,
    wait: PhantomData<W>,
}

// A slot's payload is only written by the producer whose ticket the flag
// protocol says holds the slot, and only read by the matching consumer.
unsafe impl<W: WaitStrategy> Send for OperationQueue<W> {}
unsafe impl<W: WaitStrategy> Sync for OperationQueue<W> {}

impl<W: WaitStrategy> OperationQueue<W> {
    /// Creates a queue with [`DEFAULT_CAPACITY`] slots.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a queue with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");

        let slots = (0..capacity)
            .map(|_| Slot {
                flag: AtomicU64::new(0),
                op: UnsafeCell::new(Operation {
                    key: -1,
                    kind: OperationKind::Undefined,
                }),
            })
            .collect();

        Self {
            slots,
            front: CachePadded::new(AtomicU64::new(0)),
            rear: CachePadded::new(AtomicU64::new(0)),
            wait: PhantomData,
        }
    }

    /// Returns the number of slots, fixed at creation.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Hands an operation to a consumer, spinning until this ticket's slot
    /// is empty and serving this ticket's generation.
    ///
    /// On a full queue this waits indefinitely for a dequeue; there is no
    /// timeout or cancellation. Callers needing either must layer it above,
    /// for example with a poison operation value.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is [`OperationKind::Undefined`].
    pub fn enqueue(&self, key: i64, kind: OperationKind) {
        assert!(
            kind != OperationKind::Undefined,
            "enqueued an undefined operation"
        );

        let seq = self.rear.fetch_add(1, Ordering::Relaxed);
        let capacity = self.slots.len() as u64;
        let slot = &self.slots[(seq % capacity) as usize];
        let round = seq / capacity;

        let mut session = W::Session::default();

        loop {
            let flag = slot.flag.load(Ordering::Acquire);

            // empty, and this ticket's round
            if flag & 1 == 0 && flag >> 1 == round {
                unsafe { *slot.op.get() = Operation { key, kind } };
                slot.flag.store(flag + 1, Ordering::Release);

                return;
            }

            W::pause(&mut session);
        }
    }

    /// Takes the next operation, spinning until this ticket's slot is filled
    /// by its matching producer.
    ///
    /// On an empty queue this waits indefinitely for an enqueue. Emptiness
    /// with no future producers must be detected out of band; combine
    /// [`is_empty`](Self::is_empty) with an external termination signal.
    ///
    /// # Panics
    ///
    /// Panics if the slot was never written, which indicates an internal
    /// consistency fault rather than a normal empty-queue condition.
    pub fn dequeue(&self) -> Operation {
        let seq = self.front.fetch_add(1, Ordering::Relaxed);
        let capacity = self.slots.len() as u64;
        let slot = &self.slots[(seq % capacity) as usize];
        let round = seq / capacity;

        let mut session = W::Session::default();

        loop {
            let flag = slot.flag.load(Ordering::Acquire);

            // filled, and this ticket's round
            if flag & 1 == 1 && flag >> 1 == round {
                let op = unsafe { *slot.op.get() };
                slot.flag.store(flag + 1, Ordering::Release);

                if op.kind == OperationKind::Undefined {
                    #[cfg(feature = "logging")]
                    log::error!(
                        "slot {} dequeued before any write (ticket {})",
                        seq % capacity,
                        seq
                    );

                    panic!("dequeued a slot that was never written");
                }

                return op;
            }

            W::pause(&mut session);
        }
    }

    /// Returns true if a snapshot of the counters saw no queued operations.
    ///
    /// Both counters are moving targets under concurrency, so this is a
    /// heuristic only; true stable emptiness additionally needs an external
    /// "no more producers" signal.
    pub fn is_empty(&self) -> bool {
        self.front.load(Ordering::Relaxed) >= self.rear.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of the number of queued operations, with the same
    /// caveat as [`is_empty`](Self::is_empty).
    pub fn len(&self) -> usize {
        let front = self.front.load(Ordering::Relaxed);
        let rear = self.rear.load(Ordering::Relaxed);

        rear.saturating_sub(front) as usize
    }
}

impl<W: WaitStrategy> Default for OperationQueue<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: WaitStrategy> fmt::Debug for OperationQueue<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationQueue")
            .field("capacity", &self.slots.len())
            .field("front", &self.front.load(Ordering::Relaxed))
            .field("rear", &self.rear.load(Ordering::Relaxed))
            .finish()
    }
}
