#![allow(unused)]

/// [Data Types](https://docs.oracle.com/javase/specs/jvms/se17/jvms17.pdf#%5B%7B%22num%22%3A62%2C%22gen%22%3A0%7D%2C%7B%22name%22%3A%22XYZ%22%7D%2C72%2C590%2Cnull%5D)
pub mod data_types;
pub mod errors;
/// Class heap (§4.3): append-only registry of decoded classes.
pub mod class_heap;
/// Object heap (§4.4): append-only registry of all heap allocations.
pub mod object_heap;
/// Operand stack and local variable array (§4.2).
pub mod stack_frame;
/// Lazy class loader (§4.5).
pub mod resolver;
/// Native fast-path dispatch table (§4.7).
pub mod native;
/// [JVM Spec](https://docs.oracle.com/javase/specs/jvms/se17/jvms17.pdf)
pub mod interpreter;
