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
    error::{InsertError, RemoveError},
    policy::LockingPolicy,
    set::HashSet,
};

/// Retries an insert until it reaches a definitive outcome, absorbing
/// optimistic validation aborts.
pub(crate) fn insert_settled<P: LockingPolicy>(
    set: &HashSet<P>,
    key: i64,
) -> Result<(), InsertError> {
    loop {
        match set.insert(key) {
            Err(InsertError::Contended) => continue,
            outcome => return outcome,
        }
    }
}

/// Retries a remove until it reaches a definitive outcome, absorbing
/// optimistic validation aborts.
pub(crate) fn remove_settled<P: LockingPolicy>(
    set: &HashSet<P>,
    key: i64,
) -> Result<(), RemoveError> {
    loop {
        match set.remove(key) {
            Err(RemoveError::Contended) => continue,
            outcome => return outcome,
        }
    }
}

/// Snapshot of one bucket's chain, sentinel excluded.
pub(crate) fn bucket_keys<P: LockingPolicy>(set: &HashSet<P>, index: usize) -> Vec<i64> {
    let guard = &crossbeam_epoch::pin();

    set.buckets[index].keys(guard)
}

pub(crate) fn assert_strictly_ascending(keys: &[i64]) {
    for pair in keys.windows(2) {
        assert!(
            pair[0] < pair[1],
            "chain out of order: {} precedes {}",
            pair[0],
            pair[1]
        );
    }
}
