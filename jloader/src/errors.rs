//! Decode-time error types, one module per phase of loading a class file.
//!
//! Each phase gets a `*Cause` enum naming what went wrong and a wrapper
//! struct pairing the cause with a human-readable message, mirroring the
//! two-enum-plus-wrapper shape used throughout this crate's decoders.

pub mod class_format {
    use std::error::Error;
    use std::fmt;

    use crate::constants::ConstantPool;

    #[derive(Debug, Clone)]
    pub enum FormatCause {
        IncorrectMagic(u32),
        ExtraBytes,
        InvalidIndex(u16),
        InvalidDescriptor(String),
        InvalidReferenceKind(u8),
        InvalidConstant(ConstantPool),
        MissingAttribute(&'static str),
        UnknownAttributeName(String),
    }

    impl fmt::Display for FormatCause {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                FormatCause::IncorrectMagic(got) => {
                    write!(f, "incorrect class file magic: {:#010x}", got)
                }
                FormatCause::ExtraBytes => write!(f, "trailing bytes after class file"),
                FormatCause::InvalidIndex(idx) => {
                    write!(f, "constant pool index {} out of range", idx)
                }
                FormatCause::InvalidDescriptor(desc) => {
                    write!(f, "invalid descriptor: {:?}", desc)
                }
                FormatCause::InvalidReferenceKind(kind) => {
                    write!(f, "invalid method handle reference kind: {}", kind)
                }
                FormatCause::InvalidConstant(constant) => {
                    write!(f, "unexpected constant pool entry: {:?}", constant)
                }
                FormatCause::MissingAttribute(name) => {
                    write!(f, "missing required attribute: {}", name)
                }
                FormatCause::UnknownAttributeName(name) => {
                    write!(f, "attribute name does not resolve to a Utf8: {:?}", name)
                }
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct FormatError {
        pub cause: FormatCause,
        pub msg: String,
    }

    impl FormatError {
        pub fn new(cause: FormatCause, msg: impl Into<String>) -> Self {
            Self {
                cause,
                msg: msg.into(),
            }
        }
    }

    impl fmt::Display for FormatError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}: {}", self.cause, self.msg)
        }
    }

    impl Error for FormatError {}
}

pub mod class_loading {
    use std::error::Error;
    use std::fmt;

    #[derive(Debug, Clone)]
    pub enum LoadingCause {
        InvalidConstantTag(u8),
        UnexpectedEndOfInput,
    }

    impl fmt::Display for LoadingCause {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                LoadingCause::InvalidConstantTag(tag) => {
                    write!(f, "unrecognized constant pool tag {}", tag)
                }
                LoadingCause::UnexpectedEndOfInput => {
                    write!(f, "unexpected end of input while decoding")
                }
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct LoadingError {
        pub cause: LoadingCause,
        pub msg: String,
    }

    impl LoadingError {
        pub fn new(cause: LoadingCause, msg: impl Into<String>) -> Self {
            Self {
                cause,
                msg: msg.into(),
            }
        }
    }

    impl fmt::Display for LoadingError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}: {}", self.cause, self.msg)
        }
    }

    impl Error for LoadingError {}
}
