/// [JVM Spec](https://docs.oracle.com/javase/specs/jvms/se17/jvms17.pdf)
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error};

use pitifulvm::class_heap::ClassHeap;
use pitifulvm::data_types::Value;
use pitifulvm::errors::{ExecutionCause, ExecutionError};
use pitifulvm::interpreter::Interpreter;
use pitifulvm::object_heap::ObjectHeap;
use pitifulvm::resolver::Resolver;

use jloader::class_file::ClassFile;

/// A minimalist bytecode interpreter for a stack-based object-oriented
/// virtual machine compatible with a subset of the Java Class File format.
#[derive(Parser, Debug)]
struct Cli {
    /// Path to the main class file to run.
    main_class: PathBuf,
}

/// Walks the `java/` directory tree relative to the working directory (if
/// present) and pre-parses every `.class` file found, running each one's
/// `<clinit>` as it loads — the native-class preload step `jvm.c`'s `main`
/// performs before the user's main class ever runs.
fn preload_native_classes(interpreter: &mut Interpreter<'_>) -> Result<(), Box<dyn Error>> {
    let root = Path::new("java");
    if !root.is_dir() {
        debug!("no java/ directory found, skipping native-class preload");
        return Ok(());
    }
    for path in collect_class_files(root)? {
        debug!("preloading native class {}", path.display());
        let bytes = fs::read(&path)?;
        let file = ClassFile::from_bytes(&bytes)?;
        let name = file.name()?.to_string();
        let id = interpreter.class_heap.add(&name, file);
        interpreter.run_clinit(id)?;
    }
    Ok(())
}

fn collect_class_files(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("class") {
                found.push(path);
            }
        }
    }
    Ok(found)
}

fn run() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut class_heap = ClassHeap::new();
    let mut object_heap = ObjectHeap::new();
    let prefix = Resolver::prefix_from_main_class_path(&cli.main_class.to_string_lossy());
    let resolver = Resolver::new(prefix);

    let mut interpreter = Interpreter::new(&mut class_heap, &mut object_heap, &resolver);
    preload_native_classes(&mut interpreter)?;

    let bytes = Resolver::load_bytes(&cli.main_class.to_string_lossy())?;
    let main_file = ClassFile::from_bytes(&bytes)?;
    let main_name = main_file.name()?.to_string();
    let main_id = interpreter.class_heap.add(&main_name, main_file);
    interpreter.run_clinit(main_id)?;

    let main_class = interpreter.class_heap.get(main_id).clone();
    let main_method = main_class
        .find_method("main", "([Ljava/lang/String;)V")
        .cloned()
        .ok_or_else(|| ExecutionError::new(ExecutionCause::MissingMain, "no main([Ljava/lang/String;)V method found"))?;

    let max_locals = main_method.code.as_ref().map(|c| c.max_locals as usize).unwrap_or(1);
    let locals = pitifulvm::stack_frame::Locals::new(max_locals.max(1));
    debug!("invoking main on {}", main_name);
    let result = interpreter.execute_method(main_id, &main_method, locals)?;
    debug_assert!(matches!(result, Value::Empty), "main must return void");

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {}", e);
            eprintln!("fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}
