//! The lazy loader (spec §4.5): turns a binary class name into a loaded
//! class, reading from disk only on a class-heap miss. Running `<clinit>`
//! once per freshly loaded class is the interpreter's job (`interpreter::resolve_class`);
//! this module only owns "where do the bytes come from."

use std::error::Error;
use std::fs;
use std::path::Path;

use jloader::class_file::ClassFile;
use log::debug;

use crate::class_heap::ClassHeap;
use crate::data_types::ClassId;
use crate::errors::{ResolutionCause, ResolutionError};

pub struct Resolver {
    /// Everything up to and including the last `/` of the main class's
    /// path, or empty if the main class was given with no directory
    /// component (spec §4.5).
    pub prefix: String,
}

impl Resolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Resolver { prefix: prefix.into() }
    }

    /// Derives the loading prefix from the main class file's own path.
    pub fn prefix_from_main_class_path(main_class_path: &str) -> String {
        match main_class_path.rfind('/') {
            Some(idx) => main_class_path[..=idx].to_string(),
            None => String::new(),
        }
    }

    fn path_for(&self, name: &str) -> String {
        format!("{}{}.class", self.prefix, name)
    }

    pub fn load_bytes(path: &str) -> Result<Vec<u8>, Box<dyn Error>> {
        fs::read(Path::new(path)).map_err(|_| {
            Box::new(ResolutionError::new(
                ResolutionCause::ClassFileNotFound(path.to_string()),
                "failed to open class file",
            )) as Box<dyn Error>
        })
    }

    /// Looks `name` up in the class heap; on a miss, opens
    /// `prefix + name + ".class"`, decodes it, and registers it under
    /// `name`. Returns `(id, freshly_loaded)` so the caller knows whether
    /// it still owes this class a `<clinit>` run.
    pub fn ensure_loaded(
        &self,
        name: &str,
        class_heap: &mut ClassHeap,
    ) -> Result<(ClassId, bool), Box<dyn Error>> {
        if let Some(id) = class_heap.find(name) {
            return Ok((id, false));
        }
        let path = self.path_for(name);
        debug!("loading class {} from {}", name, path);
        let bytes = Self::load_bytes(&path)?;
        let file = ClassFile::from_bytes(&bytes)?;
        let id = class_heap.add(name, file);
        Ok((id, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_everything_up_to_and_including_last_slash() {
        assert_eq!(
            Resolver::prefix_from_main_class_path("examples/java/Main.class"),
            "examples/java/"
        );
        assert_eq!(Resolver::prefix_from_main_class_path("Main.class"), "");
    }
}
