//! Shared byte-level class file fixture builder for the integration tests
//! in this directory. Follows the same raw-byte-pushing style as
//! `jloader/tests/loading.rs`, just factored so six-odd scenarios don't
//! each reimplement the constant pool bookkeeping.

#![allow(dead_code)]

/// A constant pool under construction. Every helper appends fresh entries
/// (no deduplication) and returns the index of the entry a caller cares
/// about.
pub struct Pool {
    bytes: Vec<u8>,
    len: u16,
}

impl Pool {
    pub fn new() -> Self {
        Pool { bytes: Vec::new(), len: 0 }
    }

    fn next_index(&mut self) -> u16 {
        self.len += 1;
        self.len
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        let idx = self.next_index();
        self.bytes.push(1);
        self.bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(s.as_bytes());
        idx
    }

    pub fn integer(&mut self, v: i32) -> u16 {
        let idx = self.next_index();
        self.bytes.push(3);
        self.bytes.extend_from_slice(&v.to_be_bytes());
        idx
    }

    /// A `Long` entry (tag 5). Unlike real JVMS §4.4.5 pools, this decoder's
    /// constant pool reader doesn't reserve a second slot after a `Long`
    /// entry, so it's indexed exactly like `integer`/`utf8`.
    pub fn long(&mut self, v: i64) -> u16 {
        let idx = self.next_index();
        self.bytes.push(5);
        self.bytes.extend_from_slice(&v.to_be_bytes());
        idx
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name_idx = self.utf8(name);
        let idx = self.next_index();
        self.bytes.push(7);
        self.bytes.extend_from_slice(&name_idx.to_be_bytes());
        idx
    }

    pub fn string(&mut self, s: &str) -> u16 {
        let utf_idx = self.utf8(s);
        let idx = self.next_index();
        self.bytes.push(8);
        self.bytes.extend_from_slice(&utf_idx.to_be_bytes());
        idx
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_idx = self.utf8(name);
        let desc_idx = self.utf8(descriptor);
        let idx = self.next_index();
        self.bytes.push(12);
        self.bytes.extend_from_slice(&name_idx.to_be_bytes());
        self.bytes.extend_from_slice(&desc_idx.to_be_bytes());
        idx
    }

    pub fn fieldref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_idx = self.class(class);
        let nat_idx = self.name_and_type(name, descriptor);
        let idx = self.next_index();
        self.bytes.push(9);
        self.bytes.extend_from_slice(&class_idx.to_be_bytes());
        self.bytes.extend_from_slice(&nat_idx.to_be_bytes());
        idx
    }

    pub fn methodref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_idx = self.class(class);
        let nat_idx = self.name_and_type(name, descriptor);
        let idx = self.next_index();
        self.bytes.push(10);
        self.bytes.extend_from_slice(&class_idx.to_be_bytes());
        self.bytes.extend_from_slice(&nat_idx.to_be_bytes());
        idx
    }

    pub fn invoke_dynamic(&mut self, bootstrap_index: u16, name: &str, descriptor: &str) -> u16 {
        let nat_idx = self.name_and_type(name, descriptor);
        let idx = self.next_index();
        self.bytes.push(18);
        self.bytes.extend_from_slice(&bootstrap_index.to_be_bytes());
        self.bytes.extend_from_slice(&nat_idx.to_be_bytes());
        idx
    }
}

pub struct FieldSpec {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
}

pub fn field(access_flags: u16, name: &str, descriptor: &str) -> FieldSpec {
    FieldSpec { access_flags, name: name.to_string(), descriptor: descriptor.to_string() }
}

pub struct MethodSpec {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub code: Option<(u16, u16, Vec<u8>)>,
}

/// A method with a `Code` attribute: `max_stack`, `max_locals`, raw bytes.
pub fn method(access_flags: u16, name: &str, descriptor: &str, max_stack: u16, max_locals: u16, code: Vec<u8>) -> MethodSpec {
    MethodSpec {
        access_flags,
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        code: Some((max_stack, max_locals, code)),
    }
}

/// A `native`/`abstract` method: no `Code` attribute at all.
pub fn native_method(access_flags: u16, name: &str, descriptor: &str) -> MethodSpec {
    MethodSpec { access_flags, name: name.to_string(), descriptor: descriptor.to_string(), code: None }
}

pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_NATIVE: u16 = 0x0100;

/// Finishes a class file: adds `this_name`/`super_name`/field and method
/// name/descriptor constants to `pool` (on top of whatever the caller
/// already added while building bytecode against it), then emits the full
/// byte sequence `jloader::class_file::ClassFile::from_bytes` accepts.
pub fn assemble_class(
    mut pool: Pool,
    this_name: &str,
    super_name: Option<&str>,
    fields: Vec<FieldSpec>,
    methods: Vec<MethodSpec>,
    bootstrap: Option<Vec<(u16, Vec<u16>)>>,
) -> Vec<u8> {
    let this_idx = pool.class(this_name);
    let super_idx = match super_name {
        Some(n) => pool.class(n),
        None => 0,
    };

    let mut field_entries = Vec::new();
    for f in fields {
        let name_idx = pool.utf8(&f.name);
        let desc_idx = pool.utf8(&f.descriptor);
        field_entries.push((f.access_flags, name_idx, desc_idx));
    }

    let mut method_entries = Vec::new();
    for m in methods {
        let name_idx = pool.utf8(&m.name);
        let desc_idx = pool.utf8(&m.descriptor);
        method_entries.push((m.access_flags, name_idx, desc_idx, m.code));
    }

    let code_name_idx = pool.utf8("Code");
    let bootstrap_name_idx = bootstrap.as_ref().map(|_| pool.utf8("BootstrapMethods"));

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes()); // minor
    bytes.extend_from_slice(&55u16.to_be_bytes()); // major
    bytes.extend_from_slice(&(pool.len + 1).to_be_bytes());
    bytes.extend_from_slice(&pool.bytes);
    bytes.extend_from_slice(&0u16.to_be_bytes()); // access_flags
    bytes.extend_from_slice(&this_idx.to_be_bytes());
    bytes.extend_from_slice(&super_idx.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes()); // interfaces_count

    bytes.extend_from_slice(&(field_entries.len() as u16).to_be_bytes());
    for (flags, name_idx, desc_idx) in &field_entries {
        bytes.extend_from_slice(&flags.to_be_bytes());
        bytes.extend_from_slice(&name_idx.to_be_bytes());
        bytes.extend_from_slice(&desc_idx.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes()); // attributes_count
    }

    bytes.extend_from_slice(&(method_entries.len() as u16).to_be_bytes());
    for (flags, name_idx, desc_idx, code) in &method_entries {
        bytes.extend_from_slice(&flags.to_be_bytes());
        bytes.extend_from_slice(&name_idx.to_be_bytes());
        bytes.extend_from_slice(&desc_idx.to_be_bytes());
        match code {
            Some((max_stack, max_locals, code_bytes)) => {
                bytes.extend_from_slice(&1u16.to_be_bytes());
                bytes.extend_from_slice(&code_name_idx.to_be_bytes());
                let body_len = 2 + 2 + 4 + code_bytes.len() as u32;
                bytes.extend_from_slice(&body_len.to_be_bytes());
                bytes.extend_from_slice(&max_stack.to_be_bytes());
                bytes.extend_from_slice(&max_locals.to_be_bytes());
                bytes.extend_from_slice(&(code_bytes.len() as u32).to_be_bytes());
                bytes.extend_from_slice(code_bytes);
            }
            None => {
                bytes.extend_from_slice(&0u16.to_be_bytes());
            }
        }
    }

    match (bootstrap, bootstrap_name_idx) {
        (Some(entries), Some(name_idx)) => {
            bytes.extend_from_slice(&1u16.to_be_bytes());
            bytes.extend_from_slice(&name_idx.to_be_bytes());
            let mut body = Vec::new();
            body.extend_from_slice(&(entries.len() as u16).to_be_bytes());
            for (method_ref, args) in &entries {
                body.extend_from_slice(&method_ref.to_be_bytes());
                body.extend_from_slice(&(args.len() as u16).to_be_bytes());
                for a in args {
                    body.extend_from_slice(&a.to_be_bytes());
                }
            }
            bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
            bytes.extend_from_slice(&body);
        }
        _ => {
            bytes.extend_from_slice(&0u16.to_be_bytes());
        }
    }

    bytes
}

/// A `java/lang/System` fixture with a single static `out` field of type
/// `Ljava/io/PrintStream;`, set in `<clinit>` to a self-reference — the
/// `PrintStream` fast path never inspects the receiver object itself, only
/// the invoking instruction's own constant-pool class name, so any non-null
/// reference satisfies it.
pub fn system_class_bytes() -> Vec<u8> {
    let mut pool = Pool::new();
    let self_class_idx = pool.class("java/lang/System");
    let out_field_idx = pool.fieldref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let mut code = Vec::new();
    code.push(0xbb);
    code.extend_from_slice(&self_class_idx.to_be_bytes());
    code.push(0xb3);
    code.extend_from_slice(&out_field_idx.to_be_bytes());
    code.push(0xb1);
    assemble_class(
        pool,
        "java/lang/System",
        None,
        vec![field(ACC_STATIC, "out", "Ljava/io/PrintStream;")],
        vec![method(ACC_STATIC, "<clinit>", "()V", 1, 0, code)],
        None,
    )
}
