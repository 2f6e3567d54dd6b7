//! The top-level class file decoder (JVMS §4.1). Consumes a byte slice and
//! produces a fully-decoded [`ClassFile`]: header, constant pool, fields,
//! methods (with their `Code` attribute), and an optional bootstrap table.

use std::error::Error;
use std::io::Cursor;

use byteorder::{ReadBytesExt, BE};

use crate::access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use crate::attributes::{self, BootstrapMethods, Code};
use crate::constants::{self, ConstantPool};
use crate::errors::class_format::{FormatCause, FormatError};

const CLASS_MAGIC: u32 = 0xCAFEBABE;

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub access_flags: FieldAccessFlags,
    pub name: String,
    pub descriptor: String,
}

impl FieldInfo {
    fn new(cursor: &mut Cursor<&[u8]>, pool: &[ConstantPool]) -> Result<Self, Box<dyn Error>> {
        let access_flags = FieldAccessFlags::from_bits_truncate(cursor.read_u16::<BE>()?);
        let name_index = cursor.read_u16::<BE>()?;
        let descriptor_index = cursor.read_u16::<BE>()?;
        let name = resolve_utf8(pool, name_index)?.to_string();
        let descriptor = resolve_utf8(pool, descriptor_index)?.to_string();
        attributes::skip_field_attributes(cursor)?;
        Ok(FieldInfo {
            access_flags,
            name,
            descriptor,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub descriptor: String,
    /// Absent for `native`/`abstract` methods, which carry no `Code`
    /// attribute; present (and mandatory) for every other method.
    pub code: Option<Code>,
}

impl MethodInfo {
    fn new(cursor: &mut Cursor<&[u8]>, pool: &[ConstantPool]) -> Result<Self, Box<dyn Error>> {
        let access_flags = MethodAccessFlags::from_bits_truncate(cursor.read_u16::<BE>()?);
        let name_index = cursor.read_u16::<BE>()?;
        let descriptor_index = cursor.read_u16::<BE>()?;
        let name = resolve_utf8(pool, name_index)?.to_string();
        let descriptor = resolve_utf8(pool, descriptor_index)?.to_string();

        let code = if access_flags.is_native() || access_flags.contains(MethodAccessFlags::ABSTRACT) {
            // Native/abstract methods still carry an attribute table (it
            // may be empty); read and discard it the same way field
            // attributes are discarded.
            attributes::skip_field_attributes(cursor)?;
            None
        } else {
            Some(attributes::read_method_attributes(cursor, pool)?)
        };

        Ok(MethodInfo {
            access_flags,
            name,
            descriptor,
            code,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: Vec<ConstantPool>,
    pub access_flags: ClassAccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub bootstrap_methods: Option<BootstrapMethods>,
}

impl ClassFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<ClassFile, Box<dyn Error>> {
        let mut cursor = Cursor::new(bytes);

        let magic = cursor.read_u32::<BE>()?;
        if magic != CLASS_MAGIC {
            return Err(Box::new(FormatError::new(
                FormatCause::IncorrectMagic(magic),
                "class file does not start with 0xCAFEBABE",
            )));
        }
        let minor_version = cursor.read_u16::<BE>()?;
        let major_version = cursor.read_u16::<BE>()?;

        // constant_pool_count is one greater than the number of usable
        // entries; slot 0 is reserved (JVMS §4.1).
        let constant_pool_count = cursor.read_u16::<BE>()?;
        let mut constant_pool = vec![ConstantPool::Unused];
        constants::read_constant_pool(&mut constant_pool, constant_pool_count - 1, &mut cursor)?;

        let access_flags = ClassAccessFlags::from_bits_truncate(cursor.read_u16::<BE>()?);
        let this_class = cursor.read_u16::<BE>()?;
        let super_class = cursor.read_u16::<BE>()?;

        let interfaces_count = cursor.read_u16::<BE>()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            interfaces.push(cursor.read_u16::<BE>()?);
        }

        let fields_count = cursor.read_u16::<BE>()?;
        let mut fields = Vec::with_capacity(fields_count as usize);
        for _ in 0..fields_count {
            fields.push(FieldInfo::new(&mut cursor, &constant_pool)?);
        }

        let methods_count = cursor.read_u16::<BE>()?;
        let mut methods = Vec::with_capacity(methods_count as usize);
        for _ in 0..methods_count {
            methods.push(MethodInfo::new(&mut cursor, &constant_pool)?);
        }

        let bootstrap_methods = attributes::read_bootstrap_methods(&mut cursor, &constant_pool)?;

        if cursor.position() != bytes.len() as u64 {
            return Err(Box::new(FormatError::new(
                FormatCause::ExtraBytes,
                "trailing bytes after the class file's attribute table",
            )));
        }

        Ok(ClassFile {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            bootstrap_methods,
        })
    }

    pub fn name(&self) -> Result<&str, Box<dyn Error>> {
        resolve_class_name(&self.constant_pool, self.this_class)
    }

    pub fn super_name(&self) -> Result<Option<&str>, Box<dyn Error>> {
        if self.super_class == 0 {
            Ok(None)
        } else {
            Ok(Some(resolve_class_name(&self.constant_pool, self.super_class)?))
        }
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn find_field(&self, name: &str, descriptor: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|f| f.name == name && f.descriptor == descriptor)
    }

    pub fn find_field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Resolves constant pool index `index` to a Utf8 string slice, asserting
/// the tag along the way (JVMS §4.4.7 accessors always assert the
/// expected tag; an unexpected tag is a fatal decode error per spec §3).
pub fn resolve_utf8(pool: &[ConstantPool], index: u16) -> Result<&str, Box<dyn Error>> {
    match pool.get(index as usize) {
        Some(ConstantPool::Utf8(utf8)) => Ok(utf8.as_str()),
        Some(other) => Err(Box::new(FormatError::new(
            FormatCause::InvalidConstant(other.clone()),
            format!("expected a Utf8 constant at index {}", index),
        ))),
        None => Err(Box::new(FormatError::new(
            FormatCause::InvalidIndex(index),
            "constant pool index out of range",
        ))),
    }
}

pub fn resolve_class_name(pool: &[ConstantPool], index: u16) -> Result<&str, Box<dyn Error>> {
    match pool.get(index as usize) {
        Some(ConstantPool::Class(class)) => resolve_utf8(pool, class.name_index),
        Some(other) => Err(Box::new(FormatError::new(
            FormatCause::InvalidConstant(other.clone()),
            format!("expected a Class constant at index {}", index),
        ))),
        None => Err(Box::new(FormatError::new(
            FormatCause::InvalidIndex(index),
            "constant pool index out of range",
        ))),
    }
}

pub fn resolve_string(pool: &[ConstantPool], index: u16) -> Result<&str, Box<dyn Error>> {
    match pool.get(index as usize) {
        Some(ConstantPool::String(string)) => resolve_utf8(pool, string.string_index),
        Some(other) => Err(Box::new(FormatError::new(
            FormatCause::InvalidConstant(other.clone()),
            format!("expected a String constant at index {}", index),
        ))),
        None => Err(Box::new(FormatError::new(
            FormatCause::InvalidIndex(index),
            "constant pool index out of range",
        ))),
    }
}

/// Resolves a `Fieldref`/`Methodref`-shaped pair of indices down to
/// `(owning class name, member name, descriptor)`.
pub fn resolve_ref(
    pool: &[ConstantPool],
    class_index: u16,
    name_and_type_index: u16,
) -> Result<(&str, &str, &str), Box<dyn Error>> {
    let class_name = resolve_class_name(pool, class_index)?;
    match pool.get(name_and_type_index as usize) {
        Some(ConstantPool::NameAndType(nat)) => {
            let name = resolve_utf8(pool, nat.name_index)?;
            let descriptor = resolve_utf8(pool, nat.descriptor_index)?;
            Ok((class_name, name, descriptor))
        }
        Some(other) => Err(Box::new(FormatError::new(
            FormatCause::InvalidConstant(other.clone()),
            format!(
                "expected a NameAndType constant at index {}",
                name_and_type_index
            ),
        ))),
        None => Err(Box::new(FormatError::new(
            FormatCause::InvalidIndex(name_and_type_index),
            "constant pool index out of range",
        ))),
    }
}
