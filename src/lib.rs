// MIT License
//
// Copyright (c) 2019 Gregory Meyer
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

pub mod error;
pub mod policy;
pub mod queue;
pub mod set;

pub use error::{ApplyError, InsertError, LookupError, RemoveError};
pub use policy::{Coarse, FineGrained, LockingPolicy, Optimistic};
pub use queue::{Operation, OperationKind, OperationQueue, SpinBackoff, WaitStrategy, YieldNow};
pub use set::HashSet;

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        sync::{Arc, Barrier},
        thread,
    };

    fn collision_scenario<P: LockingPolicy>() {
        let set = HashSet::<P>::with_buckets(10);

        // 15 keys over 10 buckets; 10..=14 collide with 0..=4
        for key in 0..15 {
            assert_eq!(set.insert(key), Ok(()));
        }

        assert!(set.lookup(1).is_ok());
        assert!(set.lookup(5).is_ok());
        assert_eq!(set.lookup(18), Err(LookupError::NotFound));

        assert_eq!(set.remove(1), Ok(()));
        assert_eq!(set.remove(5), Ok(()));
        assert_eq!(set.remove(18), Err(RemoveError::NotFound));

        assert_eq!(set.len(), 13);

        for key in [0, 2, 3, 4, 6, 7, 8, 9, 10, 11, 12, 13, 14] {
            assert!(set.contains(key));
        }

        assert!(!set.contains(1));
        assert!(!set.contains(5));

        let dump = format!("{:?}", set);

        assert!(dump.contains("bucket[0]->[0]->[10]->(NULL)"));
        assert!(dump.contains("bucket[1]->[11]->(NULL)"));
        assert!(dump.contains("bucket[5]->(NULL)"));
    }

    #[test]
    fn coarse_collision_scenario() {
        collision_scenario::<Coarse>();
    }

    #[test]
    fn fine_grained_collision_scenario() {
        collision_scenario::<FineGrained>();
    }

    #[test]
    fn optimistic_collision_scenario() {
        collision_scenario::<Optimistic>();
    }

    fn apply_settled<P: LockingPolicy>(set: &HashSet<P>, op: Operation) {
        loop {
            match set.apply(op) {
                Err(ApplyError::Insert(InsertError::Contended))
                | Err(ApplyError::Remove(RemoveError::Contended)) => continue,
                _ => return,
            }
        }
    }

    fn produce_consume_pipeline<P: LockingPolicy>() {
        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 4;
        const PER_PRODUCER: usize = 512;

        let set = Arc::new(HashSet::<P>::with_buckets(64));
        let queue = Arc::new(OperationQueue::<YieldNow>::with_capacity(128));
        let barrier = Arc::new(Barrier::new(PRODUCERS + CONSUMERS));

        let mut handles = Vec::with_capacity(PRODUCERS + CONSUMERS);

        for producer in 0..PRODUCERS {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);

            handles.push(thread::spawn(move || {
                barrier.wait();

                let first = (producer * PER_PRODUCER) as i64;

                for key in first..first + PER_PRODUCER as i64 {
                    queue.enqueue(key, OperationKind::Insert);
                }
            }));
        }

        for _ in 0..CONSUMERS {
            let set = Arc::clone(&set);
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);

            handles.push(thread::spawn(move || {
                barrier.wait();

                for _ in 0..PRODUCERS * PER_PRODUCER / CONSUMERS {
                    apply_settled(&set, queue.dequeue());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(queue.is_empty());
        assert_eq!(set.len(), PRODUCERS * PER_PRODUCER);

        for key in 0..(PRODUCERS * PER_PRODUCER) as i64 {
            assert!(set.contains(key));
        }
    }

    #[test]
    fn coarse_produce_consume_pipeline() {
        produce_consume_pipeline::<Coarse>();
    }

    #[test]
    fn fine_grained_produce_consume_pipeline() {
        produce_consume_pipeline::<FineGrained>();
    }

    #[test]
    fn optimistic_produce_consume_pipeline() {
        produce_consume_pipeline::<Optimistic>();
    }
}
