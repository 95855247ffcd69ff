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

//! Error types returned by table operations.
//!
//! Every failure is reported to the immediate caller; nothing is retried
//! internally or swallowed. Under the [`Optimistic`](crate::Optimistic)
//! policy a validation race is reported as `Contended`, distinct from the
//! definitive `Duplicate`/`NotFound` outcomes, so callers can tell "known
//! absent or present" from "interfered with, try again".

use thiserror::Error;

/// The error type for [`HashSet::insert`](crate::HashSet::insert).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InsertError {
    /// An entry with an equal key is already present. The set is unchanged.
    #[error("an equal key is already present")]
    Duplicate,

    /// Keys must be non-negative. The key was rejected before hashing.
    #[error("keys must be non-negative")]
    NegativeKey,

    /// Another operation spliced around the insertion point between the
    /// unlocked walk and validation. The set is unchanged and the operation
    /// may be retried. Only returned under the
    /// [`Optimistic`](crate::Optimistic) policy.
    #[error("interference detected while validating the splice point")]
    Contended,
}

/// The error type for [`HashSet::remove`](crate::HashSet::remove).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RemoveError {
    /// No entry with an equal key is present. The set is unchanged.
    #[error("no equal key is present")]
    NotFound,

    /// Keys must be non-negative. The key was rejected before hashing.
    #[error("keys must be non-negative")]
    NegativeKey,

    /// Another operation spliced around the removal point between the
    /// unlocked walk and validation. The set is unchanged and the operation
    /// may be retried. Only returned under the
    /// [`Optimistic`](crate::Optimistic) policy.
    #[error("interference detected while validating the splice point")]
    Contended,
}

/// The error type for [`HashSet::lookup`](crate::HashSet::lookup).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// No entry with an equal key is present.
    #[error("no equal key is present")]
    NotFound,

    /// Keys must be non-negative. The key was rejected before hashing.
    #[error("keys must be non-negative")]
    NegativeKey,
}

/// The error type for [`HashSet::apply`](crate::HashSet::apply).
///
/// Wraps the error of whichever table operation the applied
/// [`Operation`](crate::Operation) dispatched to.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error(transparent)]
    Insert(#[from] InsertError),

    #[error(transparent)]
    Remove(#[from] RemoveError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}
