//! Execution-layer errors: everything that can go wrong once a class is
//! already decoded and the interpreter is running its bytecode (spec §7's
//! "execution errors" and "invariant violations" kinds). Decode-time and
//! resolution-time errors are `jloader`'s `FormatError`/`LoadingError` and
//! this crate's own `ResolutionError` respectively; all three compose
//! through `Box<dyn Error>` at call boundaries.

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone)]
pub enum ExecutionCause {
    UnknownOpcode(u8),
    UnsupportedDescriptor(String),
    UnsupportedArrayType(u8),
    UnsupportedDimensions { expected: &'static str, got: String },
    MissingField(String),
    MissingMethod { class: String, name: String, descriptor: String },
    MissingMain,
    StackUnderflow,
    StackOverflow,
    LocalIndexOutOfRange(u16),
    SuperclassChainExhausted(String),
    ArrayIndexOutOfBounds { index: i32, length: usize },
}

impl fmt::Display for ExecutionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionCause::UnknownOpcode(op) => write!(f, "unknown opcode {:#04x}", op),
            ExecutionCause::UnsupportedDescriptor(desc) => {
                write!(f, "unsupported field descriptor {:?}", desc)
            }
            ExecutionCause::UnsupportedArrayType(code) => {
                write!(f, "unsupported newarray type code {}", code)
            }
            ExecutionCause::UnsupportedDimensions { expected, got } => {
                write!(f, "expected {} array, got {:?}", expected, got)
            }
            ExecutionCause::MissingField(name) => write!(f, "no such field: {}", name),
            ExecutionCause::MissingMethod { class, name, descriptor } => {
                write!(f, "no such method: {}.{}{}", class, name, descriptor)
            }
            ExecutionCause::MissingMain => {
                write!(f, "no main([Ljava/lang/String;)V method found")
            }
            ExecutionCause::StackUnderflow => write!(f, "operand stack underflow"),
            ExecutionCause::StackOverflow => write!(f, "operand stack overflow"),
            ExecutionCause::LocalIndexOutOfRange(idx) => {
                write!(f, "local variable index {} out of range", idx)
            }
            ExecutionCause::SuperclassChainExhausted(field) => write!(
                f,
                "field {:?} not found anywhere in the superclass chain",
                field
            ),
            ExecutionCause::ArrayIndexOutOfBounds { index, length } => {
                write!(f, "array index {} out of bounds for length {}", index, length)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionError {
    pub cause: ExecutionCause,
    pub msg: String,
}

impl ExecutionError {
    pub fn new(cause: ExecutionCause, msg: impl Into<String>) -> Self {
        Self { cause, msg: msg.into() }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.cause, self.msg)
    }
}

impl Error for ExecutionError {}

#[derive(Debug, Clone)]
pub enum ResolutionCause {
    ClassFileNotFound(String),
}

impl fmt::Display for ResolutionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionCause::ClassFileNotFound(path) => {
                write!(f, "could not open class file at {:?}", path)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolutionError {
    pub cause: ResolutionCause,
    pub msg: String,
}

impl ResolutionError {
    pub fn new(cause: ResolutionCause, msg: impl Into<String>) -> Self {
        Self { cause, msg: msg.into() }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.cause, self.msg)
    }
}

impl Error for ResolutionError {}
