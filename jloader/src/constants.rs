//! The constant pool: a one-indexed array of tag-dispatched variants
//! (JVMS §4.4). Only the tag subset this interpreter understands is
//! represented; anything else is a fatal decode error at read time.

use std::error::Error;
use std::fmt;
use std::io::Cursor;

use byteorder::{ReadBytesExt, BE};

use crate::errors::class_loading::{LoadingCause, LoadingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Utf8 = 1,
    Integer = 3,
    Long = 5,
    Class = 7,
    String = 8,
    Fieldref = 9,
    Methodref = 10,
    NameAndType = 12,
    MethodHandle = 15,
    InvokeDynamic = 18,
}

impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        Ok(match value {
            1 => Tag::Utf8,
            3 => Tag::Integer,
            5 => Tag::Long,
            7 => Tag::Class,
            8 => Tag::String,
            9 => Tag::Fieldref,
            10 => Tag::Methodref,
            12 => Tag::NameAndType,
            15 => Tag::MethodHandle,
            18 => Tag::InvokeDynamic,
            other => return Err(other),
        })
    }
}

/// A length-prefixed, modified-UTF-8 string. We store the raw bytes and
/// decode lossily for display/comparison, which is enough for the
/// ASCII-only class and member names this interpreter's fixtures use.
#[derive(Clone, PartialEq, Eq)]
pub struct Utf8 {
    pub bytes: Vec<u8>,
}

impl Utf8 {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, Box<dyn Error>> {
        let length = cursor.read_u16::<BE>()?;
        let mut bytes = vec![0u8; length as usize];
        std::io::Read::read_exact(cursor, &mut bytes)?;
        Ok(Utf8 { bytes })
    }

    /// Borrows the constant's bytes as `&str`. The class files this
    /// interpreter targets are ASCII-only; anything not valid UTF-8 decodes
    /// to an empty string rather than panicking.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or("")
    }
}

impl fmt::Debug for Utf8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Utf8({:?})", self.as_str())
    }
}

impl From<&str> for Utf8 {
    fn from(value: &str) -> Self {
        Utf8 {
            bytes: value.as_bytes().to_vec(),
        }
    }
}

impl From<&Utf8> for String {
    fn from(value: &Utf8) -> Self {
        value.as_str().to_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Integer {
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Long {
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Class {
    pub name_index: u16,
}

/// Named `StringRef` rather than `String` to avoid shadowing `std::string::String`
/// at every use site; the payload is the single index JVMS §4.4.3 specifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringRef {
    pub string_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fieldref {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Methodref {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameAndType {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodHandle {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeDynamic {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantPool {
    /// Padding at index 0; constant pool indices are 1-based (JVMS §4.4).
    Unused,
    Utf8(Utf8),
    Integer(Integer),
    Long(Long),
    Class(Class),
    String(StringRef),
    Fieldref(Fieldref),
    Methodref(Methodref),
    NameAndType(NameAndType),
    MethodHandle(MethodHandle),
    InvokeDynamic(InvokeDynamic),
}

/// Reads `count` constant pool entries (not counting the reserved slot 0)
/// into `pool`, which must already contain the `Unused` sentinel at index 0.
pub fn read_constant_pool(
    pool: &mut Vec<ConstantPool>,
    count: u16,
    cursor: &mut Cursor<&[u8]>,
) -> Result<(), Box<dyn Error>> {
    for _ in 0..count {
        let tag = cursor.read_u8()?;
        let constant = match Tag::try_from(tag) {
            Ok(Tag::Utf8) => ConstantPool::Utf8(Utf8::read(cursor)?),
            Ok(Tag::Integer) => ConstantPool::Integer(Integer {
                value: cursor.read_i32::<BE>()?,
            }),
            Ok(Tag::Long) => {
                let high = cursor.read_u32::<BE>()? as u64;
                let low = cursor.read_u32::<BE>()? as u64;
                ConstantPool::Long(Long {
                    value: ((high << 32) | low) as i64,
                })
            }
            Ok(Tag::Class) => ConstantPool::Class(Class {
                name_index: cursor.read_u16::<BE>()?,
            }),
            Ok(Tag::String) => ConstantPool::String(StringRef {
                string_index: cursor.read_u16::<BE>()?,
            }),
            Ok(Tag::Fieldref) => ConstantPool::Fieldref(Fieldref {
                class_index: cursor.read_u16::<BE>()?,
                name_and_type_index: cursor.read_u16::<BE>()?,
            }),
            Ok(Tag::Methodref) => ConstantPool::Methodref(Methodref {
                class_index: cursor.read_u16::<BE>()?,
                name_and_type_index: cursor.read_u16::<BE>()?,
            }),
            Ok(Tag::NameAndType) => ConstantPool::NameAndType(NameAndType {
                name_index: cursor.read_u16::<BE>()?,
                descriptor_index: cursor.read_u16::<BE>()?,
            }),
            Ok(Tag::MethodHandle) => ConstantPool::MethodHandle(MethodHandle {
                reference_kind: cursor.read_u8()?,
                reference_index: cursor.read_u16::<BE>()?,
            }),
            Ok(Tag::InvokeDynamic) => ConstantPool::InvokeDynamic(InvokeDynamic {
                bootstrap_method_attr_index: cursor.read_u16::<BE>()?,
                name_and_type_index: cursor.read_u16::<BE>()?,
            }),
            Err(unknown) => {
                return Err(Box::new(LoadingError::new(
                    LoadingCause::InvalidConstantTag(unknown),
                    format!("constant pool entry {} has unsupported tag", pool.len()),
                )))
            }
        };
        pool.push(constant);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(bytes: &[u8], count: u16) -> Vec<ConstantPool> {
        let mut pool = vec![ConstantPool::Unused];
        let mut cursor = Cursor::new(bytes);
        read_constant_pool(&mut pool, count, &mut cursor).unwrap();
        pool
    }

    #[test]
    fn reads_utf8_and_integer() {
        let mut bytes = vec![1u8, 0, 3];
        bytes.extend_from_slice(b"abc");
        bytes.push(3);
        bytes.extend_from_slice(&42i32.to_be_bytes());
        let pool = pool_with(&bytes, 2);
        assert_eq!(pool[1], ConstantPool::Utf8(Utf8::from("abc")));
        assert_eq!(pool[2], ConstantPool::Integer(Integer { value: 42 }));
    }

    #[test]
    fn reads_long_as_combined_halves() {
        let mut bytes = vec![5u8];
        bytes.extend_from_slice(&0x0000_0001u32.to_be_bytes());
        bytes.extend_from_slice(&0x0000_0002u32.to_be_bytes());
        let pool = pool_with(&bytes, 1);
        assert_eq!(
            pool[1],
            ConstantPool::Long(Long {
                value: 0x0000_0001_0000_0002
            })
        );
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let bytes = vec![200u8];
        let mut pool = vec![ConstantPool::Unused];
        let mut cursor = Cursor::new(bytes.as_slice());
        assert!(read_constant_pool(&mut pool, 1, &mut cursor).is_err());
    }
}
