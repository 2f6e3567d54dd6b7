//! The object heap (spec §4.4): an append-only registry of every heap
//! allocation — instances, one- and two-dimensional int arrays, and
//! synthesized strings — owned in bulk for release at shutdown.

use crate::data_types::{ClassId, ObjectRef, Value};

#[derive(Debug, Clone)]
pub enum Object {
    /// `new`-allocated instance: a parallel cell array, positionally
    /// matching its class's field table (spec §3's layout invariant).
    Instance { class: ClassId, fields: Vec<Value> },
    /// `newarray` of `T_INT` (the only supported element type, spec §4.6).
    IntArray(Vec<i32>),
    /// `multianewarray` of `[[I`: row-pointer vector of row count × column
    /// count (spec §3's three-cell layout, collapsed to a `Vec<Vec<i32>>`
    /// since Rust owns the rows directly rather than through raw pointers).
    IntArray2D(Vec<Vec<i32>>),
    /// `aaload` on an `IntArray2D`: a reference to one of its rows. Mirrors
    /// the source's `int32_t **addr[index]` row pointer — a fresh heap
    /// entry each time rather than a raw alias, since this heap owns its
    /// rows directly instead of through pointers.
    IntArrayRow { parent: ObjectRef, row: usize },
    /// A synthesized or interned string (`ldc`, `invokedynamic` recipe
    /// substitution, native returns). No interning: every synthesis is a
    /// fresh heap entry (spec §3).
    Str(String),
}

const MAX_OBJECTS: usize = 5000;

/// Append-only, bounded to a pragmatic upper bound matching spec §4.4.
pub struct ObjectHeap {
    objects: Vec<Object>,
}

impl ObjectHeap {
    pub fn new() -> Self {
        ObjectHeap { objects: Vec::new() }
    }

    fn push(&mut self, object: Object) -> ObjectRef {
        self.objects.push(object);
        debug_assert!(self.objects.len() <= MAX_OBJECTS, "object heap exceeded its bound");
        ObjectRef((self.objects.len() - 1) as u32)
    }

    /// `create_object`: allocates `field_count` cells, tagged empty.
    pub fn create_object(&mut self, class: ClassId, field_count: usize) -> ObjectRef {
        self.push(Object::Instance {
            class,
            fields: vec![Value::Empty; field_count],
        })
    }

    /// `create_array`: an `n`-int buffer wrapped as a one-dimensional array.
    pub fn create_array(&mut self, n: usize) -> ObjectRef {
        self.push(Object::IntArray(vec![0; n]))
    }

    /// `create_two_dimension_array`: `count1` rows of `count2` ints each.
    pub fn create_two_dimension_array(&mut self, count1: usize, count2: usize) -> ObjectRef {
        self.push(Object::IntArray2D(vec![vec![0; count2]; count1]))
    }

    pub fn create_string(&mut self, value: impl Into<String>) -> ObjectRef {
        self.push(Object::Str(value.into()))
    }

    pub fn get(&self, r: ObjectRef) -> &Object {
        &self.objects[r.0 as usize]
    }

    pub fn get_mut(&mut self, r: ObjectRef) -> &mut Object {
        &mut self.objects[r.0 as usize]
    }

    /// Element count addressed the same way `array_get`/`array_set` do,
    /// for bounds-error reporting.
    pub fn array_len(&self, r: ObjectRef) -> usize {
        match self.get(r) {
            Object::IntArray(v) => v.len(),
            Object::IntArrayRow { parent, row } => match self.get(*parent) {
                Object::IntArray2D(rows) => rows.get(*row).map(|r| r.len()).unwrap_or(0),
                _ => 0,
            },
            Object::IntArray2D(rows) => rows.len(),
            _ => 0,
        }
    }

    /// `iaload`: reads element `index` of a one-dimensional `IntArray`, or
    /// (through an `IntArrayRow`) of one row of a two-dimensional array.
    pub fn array_get(&self, r: ObjectRef, index: i32) -> Option<i32> {
        match self.get(r) {
            Object::IntArray(v) => usize::try_from(index).ok().and_then(|i| v.get(i)).copied(),
            Object::IntArrayRow { parent, row } => match self.get(*parent) {
                Object::IntArray2D(rows) => rows
                    .get(*row)
                    .and_then(|r| usize::try_from(index).ok().and_then(|i| r.get(i)))
                    .copied(),
                _ => None,
            },
            _ => None,
        }
    }

    /// `iastore`: writes element `index`, same addressing as `array_get`.
    pub fn array_set(&mut self, r: ObjectRef, index: i32, value: i32) -> bool {
        let Ok(index) = usize::try_from(index) else { return false };
        match self.get_mut(r) {
            Object::IntArray(v) => match v.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            Object::IntArrayRow { parent, row } => {
                let (parent, row) = (*parent, *row);
                match self.get_mut(parent) {
                    Object::IntArray2D(rows) => match rows.get_mut(row).and_then(|r| r.get_mut(index)) {
                        Some(slot) => {
                            *slot = value;
                            true
                        }
                        None => false,
                    },
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// `aaload` on an `IntArray2D`: allocates a fresh `IntArrayRow` pointer
    /// to row `index`.
    pub fn array_row(&mut self, r: ObjectRef, index: i32) -> Option<ObjectRef> {
        let in_range = match self.get(r) {
            Object::IntArray2D(rows) => usize::try_from(index).ok().map(|i| i < rows.len()).unwrap_or(false),
            _ => false,
        };
        if !in_range {
            return None;
        }
        Some(self.push(Object::IntArrayRow { parent: r, row: index as usize }))
    }
}

impl Default for ObjectHeap {
    fn default() -> Self {
        Self::new()
    }
}
