//! The native fast-path (spec §4.7): a small `(name, descriptor)`-keyed
//! dispatch table for console I/O, time, and the `String` helpers this
//! interpreter's test programs rely on.
//!
//! Argument placement in `locals` is the caller's responsibility — the
//! `invokestatic`/`invokevirtual`/`invokespecial` handlers in
//! [`crate::interpreter`] pop operands into the locals array using their
//! own calling convention (spec §9's native dispatch table note) before
//! calling [`dispatch`]; this module only implements the effect once
//! arguments are in place.

use std::io::{self, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::data_types::Value;
use crate::errors::{ExecutionCause, ExecutionError};
use crate::object_heap::{Object, ObjectHeap};
use crate::stack_frame::Locals;

/// What a native call produced. The caller decides how to push it (as a
/// byte, int, long, or a freshly-registered heap string) based on the
/// method descriptor's own return-type character.
pub enum NativeOutcome {
    Void,
    Int(i32),
    Long(i64),
    Str(String),
}

fn read_str<'a>(object_heap: &'a ObjectHeap, value: Value) -> Result<&'a str, ExecutionError> {
    let reference = match value {
        Value::Reference(Some(r)) => r,
        Value::Reference(None) => {
            return Err(ExecutionError::new(
                ExecutionCause::StackUnderflow,
                "unexpected null string reference",
            ))
        }
        other => {
            return Err(ExecutionError::new(
                ExecutionCause::StackUnderflow,
                format!("expected a string reference, found {:?}", other),
            ))
        }
    };
    match object_heap.get(reference) {
        Object::Str(s) => Ok(s.as_str()),
        other => Err(ExecutionError::new(
            ExecutionCause::UnsupportedDescriptor("Ljava/lang/String;".to_string()),
            format!("expected a string object, found {:?}", other),
        )),
    }
}

/// Reads one whitespace-delimited token from standard input, capped at 50
/// bytes, matching the source's `scanf("%50s", ...)`.
fn read_line_token() -> Result<String, ExecutionError> {
    let mut token = Vec::with_capacity(50);
    let stdin = io::stdin();
    let mut bytes = stdin.lock().bytes();
    // Skip leading whitespace, then collect up to 50 non-whitespace bytes.
    let mut first = None;
    for b in bytes.by_ref() {
        let b = b.map_err(|e| ExecutionError::new(ExecutionCause::StackUnderflow, e.to_string()))?;
        if !b.is_ascii_whitespace() {
            first = Some(b);
            break;
        }
    }
    if let Some(b) = first {
        token.push(b);
        for b in bytes {
            let b = b.map_err(|e| ExecutionError::new(ExecutionCause::StackUnderflow, e.to_string()))?;
            if b.is_ascii_whitespace() || token.len() >= 50 {
                break;
            }
            token.push(b);
        }
    }
    Ok(String::from_utf8_lossy(&token).into_owned())
}

pub fn dispatch(
    name: &str,
    descriptor: &str,
    locals: &Locals,
    object_heap: &ObjectHeap,
) -> Result<NativeOutcome, ExecutionError> {
    match (name, descriptor) {
        ("println", "()V") => {
            println!();
            Ok(NativeOutcome::Void)
        }
        ("println", "(I)V") => {
            println!("{}", locals.get(1)?.to_i32());
            Ok(NativeOutcome::Void)
        }
        ("println", "(Ljava/lang/String;)V") => {
            println!("{}", read_str(object_heap, locals.get(1)?)?);
            Ok(NativeOutcome::Void)
        }
        ("print", "(Ljava/lang/String;)V") => {
            print!("{}", read_str(object_heap, locals.get(1)?)?);
            io::stdout().flush().ok();
            Ok(NativeOutcome::Void)
        }
        ("flush", "()V") => {
            io::stdout().flush().ok();
            Ok(NativeOutcome::Void)
        }
        ("readLine", "()Ljava/lang/String;") => Ok(NativeOutcome::Str(read_line_token()?)),
        ("parseLong", "(Ljava/lang/String;)J") => {
            let s = read_str(object_heap, locals.get(1)?)?;
            let value: i64 = s.trim().parse().map_err(|_| {
                ExecutionError::new(
                    ExecutionCause::UnsupportedDescriptor(descriptor.to_string()),
                    format!("parseLong: not a valid long: {:?}", s),
                )
            })?;
            Ok(NativeOutcome::Long(value))
        }
        ("currentTimeMillis", "()J") => {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            Ok(NativeOutcome::Long(millis))
        }
        ("charAt", "(I)C") => {
            let s = read_str(object_heap, locals.get(0)?)?;
            let index = locals.get(1)?.to_i32() as usize;
            let byte = *s.as_bytes().get(index).ok_or_else(|| {
                ExecutionError::new(
                    ExecutionCause::StackUnderflow,
                    format!("charAt: index {} out of range for {:?}", index, s),
                )
            })?;
            Ok(NativeOutcome::Int(byte as i32))
        }
        ("compareTo", "(Ljava/lang/String;)I") => {
            let a = read_str(object_heap, locals.get(0)?)?;
            let b = read_str(object_heap, locals.get(1)?)?;
            // Lexicographic byte compare: the first differing byte's signed
            // difference, or (real `String.compareTo` semantics) the
            // length difference when one is a prefix of the other. The
            // source reads an uninitialized `result` in that latter case;
            // see DESIGN.md for why this diverges intentionally.
            let (a_bytes, b_bytes) = (a.as_bytes(), b.as_bytes());
            let end = a_bytes.len().min(b_bytes.len());
            for i in 0..end {
                let diff = a_bytes[i] as i32 - b_bytes[i] as i32;
                if diff != 0 {
                    return Ok(NativeOutcome::Int(diff));
                }
            }
            Ok(NativeOutcome::Int(a_bytes.len() as i32 - b_bytes.len() as i32))
        }
        _ => Err(ExecutionError::new(
            ExecutionCause::MissingMethod {
                class: "<native>".to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            },
            "no native implementation registered for this (name, descriptor)",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::Value;

    #[test]
    fn compare_to_matches_java_semantics_on_shared_prefix() {
        let mut heap = ObjectHeap::new();
        let a = heap.create_string("hi");
        let b = heap.create_string("hi there");
        let mut locals = Locals::new(2);
        locals.set(0, Value::Reference(Some(a))).unwrap();
        locals.set(1, Value::Reference(Some(b))).unwrap();
        match dispatch("compareTo", "(Ljava/lang/String;)I", &locals, &heap).unwrap() {
            NativeOutcome::Int(diff) => assert_eq!(diff, "hi".len() as i32 - "hi there".len() as i32),
            _ => panic!("expected an int result"),
        }
    }

    #[test]
    fn char_at_reads_byte_at_index() {
        let mut heap = ObjectHeap::new();
        let s = heap.create_string("abc");
        let mut locals = Locals::new(2);
        locals.set(0, Value::Reference(Some(s))).unwrap();
        locals.set(1, Value::Int(1)).unwrap();
        match dispatch("charAt", "(I)C", &locals, &heap).unwrap() {
            NativeOutcome::Int(c) => assert_eq!(c as u8 as char, 'b'),
            _ => panic!("expected an int result"),
        }
    }
}
