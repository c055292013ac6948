//! The interception boundary.
//!
//! A hand-written delegation wrapper turns each method call into a [`Call`]: by-value
//! arguments are copied in as [`Value`]s, while reference and output parameters also
//! register a writable slot over caller storage.
//!
//! Writing back is two-phase. Every slot first stages its final value, converting it to
//! the caller's type; only when all slots of the call accepted their values are they
//! committed. A conversion failure therefore leaves all caller storage untouched.

use std::fmt;

use crate::value::{FromValue, Value};
use crate::DecoyError;

/// Caller storage behind a reference or output parameter.
pub(crate) trait WritableSlot {
    /// Converts `value` for the caller's storage without storing it yet.
    fn stage(&mut self, value: Value) -> Result<(), DecoyError>;
    /// Stores the staged value, if any.
    fn commit(&mut self);
}

pub(crate) type SlotWriter<'a> = Box<dyn WritableSlot + 'a>;

struct TypedSlot<'a, T> {
    slot: &'a mut T,
    staged: Option<T>,
}

impl<T: FromValue> WritableSlot for TypedSlot<'_, T> {
    fn stage(&mut self, value: Value) -> Result<(), DecoyError> {
        self.staged = Some(T::from_value(value)?);
        Ok(())
    }

    fn commit(&mut self) {
        if let Some(value) = self.staged.take() {
            *self.slot = value;
        }
    }
}

struct StoreSlot<F> {
    store: F,
    staged: Option<Value>,
}

impl<F: FnMut(Value)> WritableSlot for StoreSlot<F> {
    fn stage(&mut self, value: Value) -> Result<(), DecoyError> {
        self.staged = Some(value);
        Ok(())
    }

    fn commit(&mut self) {
        if let Some(value) = self.staged.take() {
            (self.store)(value);
        }
    }
}

/// The actual arguments of one intercepted call.
#[derive(Default)]
pub struct Call<'a> {
    args: Vec<Value>,
    writers: Vec<Option<SlotWriter<'a>>>,
}

impl<'a> Call<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A by-value argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self.writers.push(None);
        self
    }

    /// An output parameter. The slot's current content is never read.
    pub fn out<T: FromValue + 'a>(self, slot: &'a mut T) -> Self {
        self.slot(Value::Nil, Box::new(TypedSlot { slot, staged: None }))
    }

    /// A by-reference parameter: its current content is matched, then overwritten.
    pub fn reference<T>(self, slot: &'a mut T) -> Self
    where
        T: FromValue + Clone + Into<Value> + 'a,
    {
        let prior = slot.clone().into();
        self.slot(prior, Box::new(TypedSlot { slot, staged: None }))
    }

    /// A writable slot with an explicit prior value. `store` receives the final value
    /// untyped and cannot refuse it.
    pub fn writer(self, prior: impl Into<Value>, store: impl FnMut(Value) + 'a) -> Self {
        self.slot(
            prior.into(),
            Box::new(StoreSlot {
                store,
                staged: None,
            }),
        )
    }

    fn slot(mut self, prior: Value, writer: SlotWriter<'a>) -> Self {
        self.args.push(prior);
        self.writers.push(Some(writer));
        self
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<Value>, Vec<Option<SlotWriter<'a>>>) {
        (self.args, self.writers)
    }
}

impl fmt::Debug for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("args", &self.args)
            .field(
                "writable",
                &self.writers.iter().map(Option::is_some).collect::<Vec<_>>(),
            )
            .finish()
    }
}
