//! Attribute table decoding (JVMS §4.7).
//!
//! Real class files carry dozens of attribute kinds (`LineNumberTable`,
//! `StackMapTable`, annotations, ...). This interpreter only ever looks at
//! two: a method's `Code` attribute, and a class's `BootstrapMethods`
//! attribute (needed for `invokedynamic`). Every other attribute is valid
//! to encounter but is skipped by its declared length, never decoded.

use std::error::Error;
use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{ReadBytesExt, BE};

use crate::constants::ConstantPool;
use crate::errors::class_format::{FormatCause, FormatError};

/// The method body: a fixed operand-stack/local-variable budget and the
/// raw opcode stream. Exception tables and nested attributes (line
/// numbers, local variable tables) are not retained; this interpreter has
/// no exception handling and no debugger.
#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct BootstrapMethodEntry {
    pub bootstrap_method_ref: u16,
    pub bootstrap_arguments: Vec<u16>,
}

#[derive(Debug, Clone, Default)]
pub struct BootstrapMethods {
    pub methods: Vec<BootstrapMethodEntry>,
}

/// Looks up a Utf8 constant by index and compares it to `name`, as every
/// attribute-name check in this decoder does.
fn attribute_name_is<'a>(
    pool: &'a [ConstantPool],
    name_index: u16,
    name: &str,
) -> Result<bool, Box<dyn Error>> {
    match pool.get(name_index as usize) {
        Some(ConstantPool::Utf8(utf8)) => Ok(utf8.as_str() == name),
        Some(other) => Err(Box::new(FormatError::new(
            FormatCause::InvalidConstant(other.clone()),
            "attribute_name_index must reference a Utf8 constant",
        ))),
        None => Err(Box::new(FormatError::new(
            FormatCause::InvalidIndex(name_index),
            "attribute_name_index out of range",
        ))),
    }
}

fn skip_attribute(cursor: &mut Cursor<&[u8]>, attribute_length: u32) -> Result<(), Box<dyn Error>> {
    let end = cursor.position() + attribute_length as u64;
    cursor.seek(SeekFrom::Start(end))?;
    Ok(())
}

/// Reads a method's attribute table, returning the single `Code` attribute
/// found. Every other attribute is skipped by length. Absent a `Code`
/// attribute this is a fatal decode error, except for methods flagged
/// `native` or `abstract`, which carry no code and are not routed here by
/// [`crate::class_file::MethodInfo::new`].
pub fn read_method_attributes(
    cursor: &mut Cursor<&[u8]>,
    pool: &[ConstantPool],
) -> Result<Code, Box<dyn Error>> {
    let attributes_count = cursor.read_u16::<BE>()?;
    let mut found: Option<Code> = None;
    for _ in 0..attributes_count {
        let attribute_name_index = cursor.read_u16::<BE>()?;
        let attribute_length = cursor.read_u32::<BE>()?;
        if attribute_name_is(pool, attribute_name_index, "Code")? {
            let max_stack = cursor.read_u16::<BE>()?;
            let max_locals = cursor.read_u16::<BE>()?;
            let code_length = cursor.read_u32::<BE>()?;
            let mut code = vec![0u8; code_length as usize];
            std::io::Read::read_exact(cursor, &mut code)?;
            // Exception table, line numbers, and any nested attributes
            // that follow the raw code bytes are not retained; skip to
            // the end of this attribute's declared length instead of
            // decoding them.
            let attribute_end = cursor.position() - 8 - code_length as u64 + attribute_length as u64;
            cursor.seek(SeekFrom::Start(attribute_end))?;
            found = Some(Code {
                max_stack,
                max_locals,
                code,
            });
        } else {
            skip_attribute(cursor, attribute_length)?;
        }
    }
    found.ok_or_else(|| {
        Box::new(FormatError::new(
            FormatCause::MissingAttribute("Code"),
            "method has no Code attribute",
        )) as Box<dyn Error>
    })
}

/// Field attributes (e.g. `ConstantValue`) are read but never interpreted:
/// static initial values are instead assigned by the class's `<clinit>`.
pub fn skip_field_attributes(cursor: &mut Cursor<&[u8]>) -> Result<(), Box<dyn Error>> {
    let attributes_count = cursor.read_u16::<BE>()?;
    for _ in 0..attributes_count {
        let _attribute_name_index = cursor.read_u16::<BE>()?;
        let attribute_length = cursor.read_u32::<BE>()?;
        skip_attribute(cursor, attribute_length)?;
    }
    Ok(())
}

/// Scans a class's top-level attribute table for `BootstrapMethods`,
/// skipping everything else by length. Returns `None` if the class has no
/// `invokedynamic` call sites and thus no bootstrap table.
pub fn read_bootstrap_methods(
    cursor: &mut Cursor<&[u8]>,
    pool: &[ConstantPool],
) -> Result<Option<BootstrapMethods>, Box<dyn Error>> {
    let attributes_count = cursor.read_u16::<BE>()?;
    let mut found = None;
    for _ in 0..attributes_count {
        let attribute_name_index = cursor.read_u16::<BE>()?;
        let attribute_length = cursor.read_u32::<BE>()?;
        if found.is_none() && attribute_name_is(pool, attribute_name_index, "BootstrapMethods")? {
            let num_bootstrap_methods = cursor.read_u16::<BE>()?;
            let mut methods = Vec::with_capacity(num_bootstrap_methods as usize);
            for _ in 0..num_bootstrap_methods {
                let bootstrap_method_ref = cursor.read_u16::<BE>()?;
                let num_bootstrap_arguments = cursor.read_u16::<BE>()?;
                let mut bootstrap_arguments = Vec::with_capacity(num_bootstrap_arguments as usize);
                for _ in 0..num_bootstrap_arguments {
                    bootstrap_arguments.push(cursor.read_u16::<BE>()?);
                }
                methods.push(BootstrapMethodEntry {
                    bootstrap_method_ref,
                    bootstrap_arguments,
                });
            }
            found = Some(BootstrapMethods { methods });
        } else {
            skip_attribute(cursor, attribute_length)?;
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Utf8;

    fn pool_with_name(name: &str) -> Vec<ConstantPool> {
        vec![ConstantPool::Unused, ConstantPool::Utf8(Utf8::from(name))]
    }

    #[test]
    fn reads_code_attribute_and_skips_trailer() {
        let pool = pool_with_name("Code");
        let mut bytes = vec![0u8, 1]; // attributes_count = 1
        bytes.extend_from_slice(&1u16.to_be_bytes()); // attribute_name_index
        let code_body_len = 2 + 2 + 4 + 2; // max_stack+max_locals+code_length+2 code bytes
        let trailer_len = 5u32;
        bytes.extend_from_slice(&(code_body_len as u32 + trailer_len).to_be_bytes());
        bytes.extend_from_slice(&4u16.to_be_bytes()); // max_stack
        bytes.extend_from_slice(&1u16.to_be_bytes()); // max_locals
        bytes.extend_from_slice(&2u32.to_be_bytes()); // code_length
        bytes.extend_from_slice(&[0xB1, 0x00]); // code bytes (return, padding)
        bytes.extend_from_slice(&[0, 0, 0, 0, 0]); // trailing exception table etc.

        let mut cursor = Cursor::new(bytes.as_slice());
        let code = read_method_attributes(&mut cursor, &pool).unwrap();
        assert_eq!(code.max_stack, 4);
        assert_eq!(code.max_locals, 1);
        assert_eq!(code.code, vec![0xB1, 0x00]);
        assert_eq!(cursor.position(), bytes.len() as u64);
    }

    #[test]
    fn missing_code_attribute_is_fatal() {
        let pool = pool_with_name("Deprecated");
        let mut bytes = vec![0u8, 1];
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        let mut cursor = Cursor::new(bytes.as_slice());
        assert!(read_method_attributes(&mut cursor, &pool).is_err());
    }

    #[test]
    fn reads_bootstrap_methods() {
        let pool = pool_with_name("BootstrapMethods");
        let mut bytes = vec![0u8, 1];
        bytes.extend_from_slice(&1u16.to_be_bytes());
        let body = 2 + (2 + 2 + 2); // num_methods + one entry with one argument
        bytes.extend_from_slice(&(body as u32).to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes()); // num_bootstrap_methods
        bytes.extend_from_slice(&7u16.to_be_bytes()); // bootstrap_method_ref
        bytes.extend_from_slice(&1u16.to_be_bytes()); // num_bootstrap_arguments
        bytes.extend_from_slice(&9u16.to_be_bytes()); // argument
        let mut cursor = Cursor::new(bytes.as_slice());
        let bootstrap = read_bootstrap_methods(&mut cursor, &pool).unwrap().unwrap();
        assert_eq!(bootstrap.methods.len(), 1);
        assert_eq!(bootstrap.methods[0].bootstrap_method_ref, 7);
        assert_eq!(bootstrap.methods[0].bootstrap_arguments, vec![9]);
    }
}
