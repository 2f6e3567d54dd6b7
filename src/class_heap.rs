//! The class heap (spec §4.3): an append-only registry mapping a binary
//! class name to its decoded `ClassFile` plus the runtime-owned static
//! field storage the decoder itself has no opinion about.

use jloader::class_file::ClassFile;

use crate::data_types::{ClassId, Value};

/// A loaded class plus the mutable state execution needs that decoding
/// alone doesn't produce: static field cells (positionally parallel to
/// `file.fields`, per spec §3's field/object layout invariant) and whether
/// `<clinit>` has already run (spec §4.5/§9: exactly once, before the
/// faulting instruction retires).
struct LoadedClass {
    name: String,
    file: ClassFile,
    statics: Vec<Value>,
    clinit_ran: bool,
}

/// Append-only, bounded to a pragmatic upper bound matching spec §4.3.
/// `find` is a linear scan by design: the source does the same, and the
/// class counts this interpreter ever sees make a hash index an
/// unnecessary complication.
pub struct ClassHeap {
    classes: Vec<LoadedClass>,
}

const MAX_CLASSES: usize = 5000;

impl ClassHeap {
    pub fn new() -> Self {
        ClassHeap {
            classes: Vec::new(),
        }
    }

    /// Strips a trailing `.class` suffix from `name` and inserts `file`
    /// under that binary name, returning its heap id.
    pub fn add(&mut self, name: &str, file: ClassFile) -> ClassId {
        let name = name.strip_suffix(".class").unwrap_or(name).to_string();
        let field_count = file.fields.len();
        self.classes.push(LoadedClass {
            name,
            file,
            statics: vec![Value::Empty; field_count],
            clinit_ran: false,
        });
        debug_assert!(self.classes.len() <= MAX_CLASSES, "class heap exceeded its bound");
        ClassId((self.classes.len() - 1) as u32)
    }

    pub fn find(&self, name: &str) -> Option<ClassId> {
        let name = name.strip_suffix(".class").unwrap_or(name);
        self.classes
            .iter()
            .position(|c| c.name == name)
            .map(|i| ClassId(i as u32))
    }

    pub fn get(&self, id: ClassId) -> &ClassFile {
        &self.classes[id.0 as usize].file
    }

    pub fn name_of(&self, id: ClassId) -> &str {
        &self.classes[id.0 as usize].name
    }

    pub fn has_run_clinit(&self, id: ClassId) -> bool {
        self.classes[id.0 as usize].clinit_ran
    }

    pub fn mark_clinit_ran(&mut self, id: ClassId) {
        self.classes[id.0 as usize].clinit_ran = true;
    }

    pub fn get_static(&self, id: ClassId, field_index: usize) -> Value {
        self.classes[id.0 as usize].statics[field_index]
    }

    pub fn set_static(&mut self, id: ClassId, field_index: usize, value: Value) {
        self.classes[id.0 as usize].statics[field_index] = value;
    }
}

impl Default for ClassHeap {
    fn default() -> Self {
        Self::new()
    }
}
