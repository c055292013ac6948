//! Per-method expectation queues.
//!
//! A queue holds the expectations of one method in declaration order. Selection is a
//! linear scan that returns the **first** live expectation whose slots all match, so
//! matching is deterministic regardless of how many expectations are eligible.

use tracing::trace;

use super::Expectation;
use crate::method::MethodSig;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct ExpectationQueue {
    method: MethodSig,
    expectations: Vec<Expectation>,
}

impl ExpectationQueue {
    pub fn new(method: MethodSig) -> Self {
        Self {
            method,
            expectations: Vec::new(),
        }
    }

    pub fn method(&self) -> &MethodSig {
        &self.method
    }

    /// Arms an expectation and returns its position in the queue.
    pub fn push(&mut self, expectation: Expectation) -> usize {
        self.expectations.push(expectation);
        self.expectations.len() - 1
    }

    /// Index of the first non-exhausted expectation accepting `args`.
    pub fn select(&self, args: &[Value]) -> Option<usize> {
        self.expectations.iter().position(|e| {
            if e.is_exhausted() {
                return false;
            }
            let matched = e.matches(args);
            trace!(expectation = %e.description(), matched, "checked expectation");
            matched
        })
    }

    /// The first exhausted expectation that would otherwise have accepted `args`. Used to
    /// report "expected #n, actual #n+1" instead of a bare unexpected call.
    pub fn exhausted_match(&self, args: &[Value]) -> Option<&Expectation> {
        self.expectations
            .iter()
            .find(|e| e.is_exhausted() && e.matches(args))
    }

    pub fn get(&self, index: usize) -> Option<&Expectation> {
        self.expectations.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Expectation> {
        self.expectations.get_mut(index)
    }

    // Indices handed out by `push`/`select` are always in bounds: expectations are never
    // removed from a queue.
    pub(crate) fn at_mut(&mut self, index: usize) -> &mut Expectation {
        &mut self.expectations[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expectation> {
        self.expectations.iter()
    }

    pub fn len(&self) -> usize {
        self.expectations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expectations.is_empty()
    }
}
