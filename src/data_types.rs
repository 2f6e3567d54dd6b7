//! The tagged value cell (spec §3) used uniformly by the operand stack,
//! local variables, and field storage.

use std::fmt;

/// Index into the object heap. A bare `u32` rather than a pointer: both
/// heaps are append-only arenas (spec §9), so an index is a simpler and
/// safer handle than the source's raw `void *`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub u32);

/// Index into the class heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// One operand-stack slot, local-variable slot, or field storage cell.
///
/// Widening/narrowing follows spec §3: pushing a byte/short is tagged at
/// its native width; popping as an integer accepts any integral tag and
/// sign-extends to `i64`. `Empty` is the default for freshly allocated
/// object fields and unused locals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Empty,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Reference(Option<ObjectRef>),
}

impl Value {
    /// True for every integral tag (byte/short/int/long), the set
    /// `pop_to_local` (spec §4.2) widens uniformly to a long.
    pub fn is_integral(&self) -> bool {
        matches!(self, Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_))
    }

    /// Widens any integral cell to a signed 64-bit value. Panics on a
    /// reference or empty cell: callers must check the tag first, the same
    /// contract `stack_to_int` has in the source (an assertion failure on
    /// type mismatch, spec §7's "invariant violation" kind).
    pub fn to_i64(self) -> i64 {
        match self {
            Value::Byte(v) => v as i64,
            Value::Short(v) => v as i64,
            Value::Int(v) => v as i64,
            Value::Long(v) => v,
            Value::Reference(_) | Value::Empty => {
                panic!("attempted to widen a non-integral stack cell: {:?}", self)
            }
        }
    }

    pub fn to_i32(self) -> i32 {
        self.to_i64() as i32
    }

    pub fn as_reference(self) -> Option<ObjectRef> {
        match self {
            Value::Reference(r) => r,
            other => panic!("expected a reference cell, got {:?}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "<empty>"),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Reference(Some(r)) => write!(f, "ref#{}", r.0),
            Value::Reference(None) => write!(f, "null"),
        }
    }
}
