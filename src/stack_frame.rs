//! Operand stack and local variable array (spec §4.2), the two pieces of
//! per-frame state every opcode handler touches.
//!
//! https://docs.oracle.com/javase/specs/jvms/se17/jvms17.pdf#%5B%7B%22num%22%3A802%2C%22gen%22%3A0%7D%2C%7B%22name%22%3A%22XYZ%22%7D%2C72%2C165%2Cnull%5D

use crate::data_types::{ObjectRef, Value};
use crate::errors::{ExecutionCause, ExecutionError};

/// A fixed-capacity stack of tagged cells, preallocated to a method's
/// `max_stack`. The interpreter trusts `max_stack`/`max_locals` without
/// verification (spec §3's invariant), but push still refuses to exceed
/// capacity so a malformed class file fails loudly instead of silently
/// corrupting memory.
#[derive(Debug)]
pub struct OperandStack {
    store: Vec<Value>,
    max_size: usize,
}

impl OperandStack {
    pub fn new(max_size: usize) -> Self {
        OperandStack {
            store: Vec::with_capacity(max_size),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn push(&mut self, value: Value) -> Result<(), ExecutionError> {
        if self.store.len() >= self.max_size {
            return Err(ExecutionError::new(
                ExecutionCause::StackOverflow,
                format!("operand stack capacity is {}", self.max_size),
            ));
        }
        self.store.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, ExecutionError> {
        self.store.pop().ok_or_else(|| {
            ExecutionError::new(ExecutionCause::StackUnderflow, "popped an empty operand stack")
        })
    }

    /// Returns the top cell without popping it (JVMS `dup`-family helper).
    pub fn top(&self) -> Result<Value, ExecutionError> {
        self.store.last().copied().ok_or_else(|| {
            ExecutionError::new(ExecutionCause::StackUnderflow, "peeked an empty operand stack")
        })
    }

    /// Pops a cell and widens it to a signed 64-bit integer (`stack_to_int`
    /// + `pop_int` in the source). Fatal if the top cell is a reference.
    pub fn pop_int(&mut self) -> Result<i64, ExecutionError> {
        let value = self.pop()?;
        if !value.is_integral() {
            return Err(ExecutionError::new(
                ExecutionCause::StackUnderflow,
                format!("expected an integral cell, found {:?}", value),
            ));
        }
        Ok(value.to_i64())
    }

    pub fn pop_i32(&mut self) -> Result<i32, ExecutionError> {
        Ok(self.pop_int()? as i32)
    }

    pub fn pop_ref(&mut self) -> Result<Option<ObjectRef>, ExecutionError> {
        match self.pop()? {
            Value::Reference(r) => Ok(r),
            other => Err(ExecutionError::new(
                ExecutionCause::StackUnderflow,
                format!("expected a reference cell, found {:?}", other),
            )),
        }
    }

    /// `dup`: duplicates the top single-width cell.
    pub fn dup(&mut self) -> Result<(), ExecutionError> {
        let top = self.top()?;
        self.push(top)
    }

    /// `dup2`: for a category-2 value (`Long`) duplicates the single slot;
    /// otherwise duplicates the top two category-1 slots as a pair
    /// (JVMS §6.5 `dup2`).
    pub fn dup2(&mut self) -> Result<(), ExecutionError> {
        let top = self.top()?;
        if matches!(top, Value::Long(_)) {
            self.push(top)
        } else {
            let second = self.pop()?;
            let first = self.pop()?;
            self.push(first)?;
            self.push(second)?;
            self.push(first)?;
            self.push(second)
        }
    }

    /// Pops the top cell into `locals[index]`, preserving the
    /// reference-vs-integer distinction: integers are widened to a long
    /// (spec §4.2's `pop_to_local`), references are stored as-is.
    pub fn pop_to_local(&mut self, locals: &mut Locals, index: u16) -> Result<(), ExecutionError> {
        let value = self.pop()?;
        let normalized = match value {
            Value::Reference(_) => value,
            integral if integral.is_integral() => Value::Long(integral.to_i64()),
            other => {
                return Err(ExecutionError::new(
                    ExecutionCause::StackUnderflow,
                    format!("cannot store {:?} into a local variable", other),
                ))
            }
        };
        locals.set(index, normalized)
    }
}

/// A frame's local variable array, preallocated to `max_locals` and
/// zero-initialized (`Value::Empty`) the way the source's `local_variable_t`
/// array starts out memset to zero.
#[derive(Debug)]
pub struct Locals {
    store: Vec<Value>,
}

impl Locals {
    pub fn new(max_locals: usize) -> Self {
        Locals {
            store: vec![Value::Empty; max_locals],
        }
    }

    pub fn get(&self, index: u16) -> Result<Value, ExecutionError> {
        self.store.get(index as usize).copied().ok_or_else(|| {
            ExecutionError::new(
                ExecutionCause::LocalIndexOutOfRange(index),
                format!("locals array has {} slots", self.store.len()),
            )
        })
    }

    pub fn set(&mut self, index: u16, value: Value) -> Result<(), ExecutionError> {
        let slot = self.store.get_mut(index as usize).ok_or_else(|| {
            ExecutionError::new(
                ExecutionCause::LocalIndexOutOfRange(index),
                "local variable index out of range",
            )
        })?;
        *slot = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trips() {
        let mut stack = OperandStack::new(4);
        stack.push(Value::Int(7)).unwrap();
        assert_eq!(stack.pop_int().unwrap(), 7);
    }

    #[test]
    fn push_past_capacity_is_fatal() {
        let mut stack = OperandStack::new(1);
        stack.push(Value::Int(1)).unwrap();
        assert!(stack.push(Value::Int(2)).is_err());
    }

    #[test]
    fn pop_to_local_widens_integers_and_preserves_references() {
        let mut stack = OperandStack::new(4);
        let mut locals = Locals::new(2);
        stack.push(Value::Byte(5)).unwrap();
        stack.pop_to_local(&mut locals, 0).unwrap();
        assert_eq!(locals.get(0).unwrap(), Value::Long(5));

        stack.push(Value::Reference(Some(ObjectRef(3)))).unwrap();
        stack.pop_to_local(&mut locals, 1).unwrap();
        assert_eq!(locals.get(1).unwrap(), Value::Reference(Some(ObjectRef(3))));
    }

    #[test]
    fn dup2_pairs_two_category_one_slots() {
        let mut stack = OperandStack::new(8);
        stack.push(Value::Int(1)).unwrap();
        stack.push(Value::Int(2)).unwrap();
        stack.dup2().unwrap();
        assert_eq!(stack.pop_int().unwrap(), 2);
        assert_eq!(stack.pop_int().unwrap(), 1);
        assert_eq!(stack.pop_int().unwrap(), 2);
        assert_eq!(stack.pop_int().unwrap(), 1);
    }

    #[test]
    fn dup2_on_a_long_duplicates_the_single_slot() {
        let mut stack = OperandStack::new(8);
        stack.push(Value::Long(99)).unwrap();
        stack.dup2().unwrap();
        assert_eq!(stack.pop_int().unwrap(), 99);
        assert_eq!(stack.pop_int().unwrap(), 99);
    }
}
