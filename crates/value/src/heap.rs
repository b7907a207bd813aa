//! In-process reference runtime.
//!
//! [`HeapRuntime`] is a small reference-counted object heap with the object
//! model the value layer expects: a none singleton, integers wider than
//! `i64`, floats, text, byte strings, tuples, lists, string-keyed dicts, sets
//! and modules. Hosts without a real interpreter use it as their runtime, and
//! every property of the value layer is tested against it.
//!
//! Freed slots are never reused, so a stale handle reports a runtime fault
//! instead of silently aliasing a newer object. The price is that the slot
//! table grows with the total number of allocations: a freed object drops
//! its payload but keeps an empty entry for the lifetime of the runtime.
//! Long-running hosts that churn through many objects should plug in a real
//! interpreter instead.
//!
//! Rendering, comparison and deep copy stop with a recursion fault once
//! nesting passes a fixed depth.

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::error::{ForeignError, ForeignErrorKind, ForeignResult};
use crate::handle::{ObjectHandle, ObjectKind};
use crate::runtime::ForeignRuntime;

const SLOT_ALIGN: usize = 16;
const RECURSION_LIMIT: usize = 256;

#[derive(Debug)]
enum Data {
    None,
    Bool(bool),
    Long(i128),
    Float(f64),
    Bytes(Vec<u8>),
    ByteArray(Vec<u8>),
    Str(String),
    Tuple(Vec<ObjectHandle>),
    List(Vec<ObjectHandle>),
    /// key text -> (owned key object, owned value)
    Dict(IndexMap<String, (ObjectHandle, ObjectHandle)>),
    Set(Vec<ObjectHandle>),
    Module { name: String, dict: ObjectHandle },
}

impl Data {
    const fn kind(&self) -> ObjectKind {
        match self {
            Self::None => ObjectKind::NoneType,
            Self::Bool(_) => ObjectKind::Bool,
            Self::Long(_) => ObjectKind::Long,
            Self::Float(_) => ObjectKind::Float,
            Self::Bytes(_) => ObjectKind::Bytes,
            Self::ByteArray(_) => ObjectKind::ByteArray,
            Self::Str(_) => ObjectKind::String,
            Self::Tuple(_) => ObjectKind::Tuple,
            Self::List(_) => ObjectKind::List,
            Self::Dict(_) => ObjectKind::Dict,
            Self::Set(_) => ObjectKind::Set,
            Self::Module { .. } => ObjectKind::Module,
        }
    }

    const fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Long(_) => "int",
            Self::Float(_) => "float",
            Self::Bytes(_) => "bytes",
            Self::ByteArray(_) => "bytearray",
            Self::Str(_) => "str",
            Self::Tuple(_) => "tuple",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::Module { .. } => "module",
        }
    }

    /// References this object owns, released when it is freed.
    fn into_children(self) -> Vec<ObjectHandle> {
        match self {
            Self::Tuple(items) | Self::List(items) | Self::Set(items) => items,
            Self::Dict(map) => map.into_values().flat_map(|(k, v)| [k, v]).collect(),
            Self::Module { dict, .. } => vec![dict],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    refcnt: i64,
    immortal: bool,
    data: Data,
}

/// What a deep copy has to do, captured before the heap is mutated.
enum CopyPlan {
    Share,
    ByteArray(Vec<u8>),
    Tuple(Vec<ObjectHandle>),
    List(Vec<ObjectHandle>),
    Dict(Vec<(String, ObjectHandle, ObjectHandle)>),
    Set(Vec<ObjectHandle>),
    Refuse(&'static str),
}

#[derive(Debug)]
struct Heap {
    slots: Vec<Option<Slot>>,
    none: ObjectHandle,
    yes: ObjectHandle,
    no: ObjectHandle,
}

fn handle_for(index: usize) -> ObjectHandle {
    ObjectHandle::from_addr((index + 1) * SLOT_ALIGN).unwrap_or_else(|| unreachable!())
}

fn index_of(handle: ObjectHandle) -> Option<usize> {
    let addr = handle.addr();
    (addr % SLOT_ALIGN == 0).then(|| addr / SLOT_ALIGN - 1)
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_owned()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn format_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + 3);
    out.push_str("b'");
    for &byte in data {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{byte:02x}")),
        }
    }
    out.push('\'');
    out
}

fn format_str(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl Heap {
    fn new() -> Self {
        let mut heap = Self {
            slots: Vec::new(),
            none: handle_for(0),
            yes: handle_for(1),
            no: handle_for(2),
        };
        for data in [Data::None, Data::Bool(true), Data::Bool(false)] {
            heap.slots.push(Some(Slot {
                refcnt: 1,
                immortal: true,
                data,
            }));
        }
        heap
    }

    fn alloc(&mut self, data: Data) -> ObjectHandle {
        let index = self.slots.len();
        self.slots.push(Some(Slot {
            refcnt: 1,
            immortal: false,
            data,
        }));
        handle_for(index)
    }

    fn slot(&self, handle: ObjectHandle) -> ForeignResult<&Slot> {
        index_of(handle)
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
            .ok_or_else(|| ForeignError::runtime(format!("dangling object handle {handle:?}")))
    }

    fn slot_mut(&mut self, handle: ObjectHandle) -> ForeignResult<&mut Slot> {
        index_of(handle)
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::as_mut)
            .ok_or_else(|| ForeignError::runtime(format!("dangling object handle {handle:?}")))
    }

    fn data(&self, handle: ObjectHandle) -> ForeignResult<&Data> {
        self.slot(handle).map(|slot| &slot.data)
    }

    fn live_objects(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| !slot.immortal)
            .count()
    }

    fn incref(&mut self, handle: ObjectHandle) {
        match self.slot_mut(handle) {
            Ok(slot) => slot.refcnt += 1,
            Err(e) => tracing::error!(error = %e, "incref on a freed object"),
        }
    }

    fn decref(&mut self, handle: ObjectHandle) {
        let mut pending = vec![handle];
        while let Some(handle) = pending.pop() {
            let free = match self.slot_mut(handle) {
                Ok(slot) if slot.immortal => {
                    slot.refcnt = (slot.refcnt - 1).max(1);
                    false
                }
                Ok(slot) => {
                    slot.refcnt -= 1;
                    slot.refcnt <= 0
                }
                Err(e) => {
                    tracing::error!(error = %e, "decref on a freed object");
                    false
                }
            };
            if free
                && let Some(slot) = index_of(handle).and_then(|index| self.slots[index].take())
            {
                pending.extend(slot.data.into_children());
            }
        }
    }

    fn require_live(&self, handle: ObjectHandle) -> ForeignResult<()> {
        self.slot(handle).map(|_| ())
    }

    fn type_error(&self, handle: ObjectHandle, what: &str) -> ForeignError {
        let name = self.data(handle).map_or("<freed>", Data::type_name);
        ForeignError::type_error(format!("'{name}' object {what}"))
    }

    // ── copy ────────────────────────────────────────────────────────────────

    fn deep_copy(
        &mut self,
        handle: ObjectHandle,
        memo: &mut HashMap<ObjectHandle, ObjectHandle>,
        depth: usize,
    ) -> ForeignResult<ObjectHandle> {
        if depth > RECURSION_LIMIT {
            return Err(ForeignError::new(
                ForeignErrorKind::Recursion,
                "maximum recursion depth exceeded while copying",
            ));
        }
        if let Some(&copy) = memo.get(&handle) {
            self.incref(copy);
            return Ok(copy);
        }

        let plan = match self.data(handle)? {
            Data::ByteArray(bytes) => CopyPlan::ByteArray(bytes.clone()),
            Data::Tuple(items) => CopyPlan::Tuple(items.clone()),
            Data::List(items) => CopyPlan::List(items.clone()),
            Data::Set(items) => CopyPlan::Set(items.clone()),
            Data::Dict(map) => CopyPlan::Dict(
                map.iter()
                    .map(|(text, &(key, value))| (text.clone(), key, value))
                    .collect(),
            ),
            Data::Module { .. } => CopyPlan::Refuse("module"),
            _ => CopyPlan::Share,
        };

        match plan {
            CopyPlan::Share => {
                self.incref(handle);
                Ok(handle)
            }
            CopyPlan::Refuse(name) => Err(ForeignError::type_error(format!(
                "cannot copy '{name}' object"
            ))),
            CopyPlan::ByteArray(bytes) => {
                let copy = self.alloc(Data::ByteArray(bytes));
                memo.insert(handle, copy);
                Ok(copy)
            }
            CopyPlan::Tuple(items) => {
                let copies = self.copy_all(&items, memo, depth)?;
                let copy = self.alloc(Data::Tuple(copies));
                memo.insert(handle, copy);
                Ok(copy)
            }
            CopyPlan::List(items) | CopyPlan::Set(items) => {
                let is_list = matches!(self.data(handle)?, Data::List(_));
                let copy = self.alloc(if is_list {
                    Data::List(Vec::new())
                } else {
                    Data::Set(Vec::new())
                });
                memo.insert(handle, copy);
                match self.copy_all(&items, memo, depth) {
                    Ok(copies) => {
                        if let Ok(Slot {
                            data: Data::List(target) | Data::Set(target),
                            ..
                        }) = self.slot_mut(copy)
                        {
                            *target = copies;
                        }
                        Ok(copy)
                    }
                    Err(e) => {
                        self.decref(copy);
                        Err(e)
                    }
                }
            }
            CopyPlan::Dict(entries) => {
                let copy = self.alloc(Data::Dict(IndexMap::new()));
                memo.insert(handle, copy);
                for (text, key, value) in entries {
                    let value = match self.deep_copy(value, memo, depth + 1) {
                        Ok(value) => value,
                        Err(e) => {
                            self.decref(copy);
                            return Err(e);
                        }
                    };
                    self.incref(key);
                    if let Ok(Slot {
                        data: Data::Dict(map),
                        ..
                    }) = self.slot_mut(copy)
                    {
                        map.insert(text, (key, value));
                    }
                }
                Ok(copy)
            }
        }
    }

    fn copy_all(
        &mut self,
        items: &[ObjectHandle],
        memo: &mut HashMap<ObjectHandle, ObjectHandle>,
        depth: usize,
    ) -> ForeignResult<Vec<ObjectHandle>> {
        let mut copies = Vec::with_capacity(items.len());
        for &item in items {
            match self.deep_copy(item, memo, depth + 1) {
                Ok(copy) => copies.push(copy),
                Err(e) => {
                    for copy in copies {
                        self.decref(copy);
                    }
                    return Err(e);
                }
            }
        }
        Ok(copies)
    }

    // ── comparison and rendering ────────────────────────────────────────────

    fn rich_eq(&self, a: ObjectHandle, b: ObjectHandle, depth: usize) -> ForeignResult<bool> {
        if depth > RECURSION_LIMIT {
            return Err(ForeignError::new(
                ForeignErrorKind::Recursion,
                "maximum recursion depth exceeded in comparison",
            ));
        }
        let (left, right) = (self.data(a)?, self.data(b)?);
        if a == b && !matches!(left, Data::Float(_)) {
            return Ok(true);
        }
        Ok(match (left, right) {
            (Data::None, Data::None) => true,
            (Data::Bool(x), Data::Bool(y)) => x == y,
            (Data::Long(x), Data::Long(y)) => x == y,
            (Data::Bool(x), Data::Long(y)) | (Data::Long(y), Data::Bool(x)) => {
                i128::from(*x) == *y
            }
            (Data::Float(x), Data::Float(y)) => x == y,
            (Data::Float(x), Data::Long(y)) | (Data::Long(y), Data::Float(x)) => *x == *y as f64,
            (Data::Float(x), Data::Bool(y)) | (Data::Bool(y), Data::Float(x)) => {
                *x == f64::from(u8::from(*y))
            }
            (Data::Str(x), Data::Str(y)) => x == y,
            (
                Data::Bytes(x) | Data::ByteArray(x),
                Data::Bytes(y) | Data::ByteArray(y),
            ) => x == y,
            (Data::Tuple(x), Data::Tuple(y)) | (Data::List(x), Data::List(y)) => {
                if x.len() != y.len() {
                    return Ok(false);
                }
                for (&l, &r) in x.iter().zip(y) {
                    if !self.rich_eq(l, r, depth + 1)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Data::Dict(x), Data::Dict(y)) => {
                if x.len() != y.len() {
                    return Ok(false);
                }
                for (key, &(_, l)) in x {
                    match y.get(key) {
                        Some(&(_, r)) if self.rich_eq(l, r, depth + 1)? => {}
                        _ => return Ok(false),
                    }
                }
                true
            }
            (Data::Set(x), Data::Set(y)) => {
                if x.len() != y.len() {
                    return Ok(false);
                }
                for &l in x {
                    if !self.contains(y, l, depth + 1)? {
                        return Ok(false);
                    }
                }
                true
            }
            _ => false,
        })
    }

    fn contains(&self, items: &[ObjectHandle], needle: ObjectHandle, depth: usize) -> ForeignResult<bool> {
        for &item in items {
            if self.rich_eq(item, needle, depth)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn repr(&self, handle: ObjectHandle, visiting: &mut Vec<ObjectHandle>) -> ForeignResult<String> {
        if visiting.len() > RECURSION_LIMIT {
            return Err(ForeignError::new(
                ForeignErrorKind::Recursion,
                "maximum recursion depth exceeded while getting the repr",
            ));
        }
        let data = self.data(handle)?;
        let recursive = visiting.contains(&handle);
        let text = match data {
            Data::None => "None".to_owned(),
            Data::Bool(true) => "True".to_owned(),
            Data::Bool(false) => "False".to_owned(),
            Data::Long(value) => value.to_string(),
            Data::Float(value) => format_float(*value),
            Data::Bytes(bytes) => format_bytes(bytes),
            Data::ByteArray(bytes) => format!("bytearray({})", format_bytes(bytes)),
            Data::Str(text) => format_str(text),
            Data::Module { name, .. } => format!("<module '{name}'>"),
            Data::Tuple(_) | Data::List(_) | Data::Set(_) | Data::Dict(_) if recursive => {
                match data {
                    Data::List(_) => "[...]",
                    Data::Tuple(_) => "(...)",
                    _ => "{...}",
                }
                .to_owned()
            }
            Data::Tuple(items) => {
                let parts = self.repr_all(handle, items, visiting)?;
                if parts.len() == 1 {
                    format!("({},)", parts[0])
                } else {
                    format!("({})", parts.join(", "))
                }
            }
            Data::List(items) => format!("[{}]", self.repr_all(handle, items, visiting)?.join(", ")),
            Data::Set(items) if items.is_empty() => "set()".to_owned(),
            Data::Set(items) => format!("{{{}}}", self.repr_all(handle, items, visiting)?.join(", ")),
            Data::Dict(map) => {
                visiting.push(handle);
                let mut parts = Vec::with_capacity(map.len());
                for (key, &(_, value)) in map {
                    parts.push(format!("{}: {}", format_str(key), self.repr(value, visiting)?));
                }
                visiting.pop();
                format!("{{{}}}", parts.join(", "))
            }
        };
        Ok(text)
    }

    fn repr_all(
        &self,
        owner: ObjectHandle,
        items: &[ObjectHandle],
        visiting: &mut Vec<ObjectHandle>,
    ) -> ForeignResult<Vec<String>> {
        visiting.push(owner);
        let parts = items
            .iter()
            .map(|&item| self.repr(item, visiting))
            .collect::<ForeignResult<Vec<_>>>();
        visiting.pop();
        parts
    }

    // ── containers ──────────────────────────────────────────────────────────

    fn list_mut(&mut self, handle: ObjectHandle) -> ForeignResult<&mut Vec<ObjectHandle>> {
        if !matches!(self.data(handle)?, Data::List(_)) {
            return Err(self.type_error(handle, "is not a list"));
        }
        let Slot {
            data: Data::List(items),
            ..
        } = self.slot_mut(handle)?
        else {
            return Err(ForeignError::runtime("list changed kind"));
        };
        Ok(items)
    }

    fn list_set(&mut self, handle: ObjectHandle, index: usize, item: ObjectHandle) -> ForeignResult<()> {
        self.require_live(item)?;
        let items = self.list_mut(handle)?;
        let Some(slot) = items.get_mut(index) else {
            return Err(ForeignError::index_error("list assignment index out of range"));
        };
        let previous = std::mem::replace(slot, item);
        self.incref(item);
        self.decref(previous);
        Ok(())
    }

    fn list_insert(&mut self, handle: ObjectHandle, index: Option<usize>, item: ObjectHandle) -> ForeignResult<()> {
        self.require_live(item)?;
        let items = self.list_mut(handle)?;
        let at = index.map_or(items.len(), |index| index.min(items.len()));
        items.insert(at, item);
        self.incref(item);
        Ok(())
    }

    fn dict_set(&mut self, handle: ObjectHandle, key: &str, item: ObjectHandle) -> ForeignResult<()> {
        self.require_live(item)?;
        let existing = match self.data(handle)? {
            Data::Dict(map) => map.get(key).copied(),
            _ => return Err(self.type_error(handle, "does not support item assignment")),
        };
        let entry = match existing {
            Some((key_obj, previous)) => {
                self.decref(previous);
                (key_obj, item)
            }
            None => (self.alloc(Data::Str(key.to_owned())), item),
        };
        self.incref(item);
        if let Slot {
            data: Data::Dict(map),
            ..
        } = self.slot_mut(handle)?
        {
            map.insert(key.to_owned(), entry);
        }
        Ok(())
    }

    fn set_add(&mut self, handle: ObjectHandle, item: ObjectHandle) -> ForeignResult<()> {
        self.require_live(item)?;
        let present = match self.data(handle)? {
            Data::Set(items) => self.contains(items, item, 0)?,
            _ => return Err(self.type_error(handle, "is not a set")),
        };
        if !present {
            if let Slot {
                data: Data::Set(items),
                ..
            } = self.slot_mut(handle)?
            {
                items.push(item);
            }
            self.incref(item);
        }
        Ok(())
    }
}

/// Reference-counted in-process object heap implementing [`ForeignRuntime`].
#[derive(Debug)]
pub struct HeapRuntime {
    heap: Mutex<Heap>,
}

impl HeapRuntime {
    /// Create a heap holding only the none and boolean singletons.
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(Heap::new()),
        }
    }

    /// Number of live objects, singletons excluded. Zero once every
    /// reference handed out has been released.
    pub fn live_objects(&self) -> usize {
        self.heap.lock().live_objects()
    }
}

impl Default for HeapRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ForeignRuntime for HeapRuntime {
    fn name(&self) -> &str {
        "heap"
    }

    fn none(&self) -> ObjectHandle {
        self.heap.lock().none
    }

    fn kind(&self, obj: ObjectHandle) -> ObjectKind {
        self.heap
            .lock()
            .data(obj)
            .map_or(ObjectKind::Custom, Data::kind)
    }

    fn type_name(&self, obj: ObjectHandle) -> ForeignResult<String> {
        self.heap
            .lock()
            .data(obj)
            .map(|data| data.type_name().to_owned())
    }

    fn incref(&self, obj: ObjectHandle) {
        self.heap.lock().incref(obj);
    }

    fn decref(&self, obj: ObjectHandle) {
        self.heap.lock().decref(obj);
    }

    fn refcnt(&self, obj: ObjectHandle) -> i64 {
        self.heap.lock().slot(obj).map_or(0, |slot| slot.refcnt)
    }

    fn deep_copy(&self, obj: ObjectHandle) -> ForeignResult<ObjectHandle> {
        self.heap.lock().deep_copy(obj, &mut HashMap::new(), 0)
    }

    fn rich_eq(&self, a: ObjectHandle, b: ObjectHandle) -> ForeignResult<bool> {
        self.heap.lock().rich_eq(a, b, 0)
    }

    fn repr(&self, obj: ObjectHandle) -> ForeignResult<String> {
        self.heap.lock().repr(obj, &mut Vec::new())
    }

    fn to_text(&self, obj: ObjectHandle) -> ForeignResult<String> {
        let heap = self.heap.lock();
        match heap.data(obj)? {
            Data::Str(text) => Ok(text.clone()),
            _ => heap.repr(obj, &mut Vec::new()),
        }
    }

    fn bytes_of(&self, obj: ObjectHandle) -> ForeignResult<Vec<u8>> {
        let heap = self.heap.lock();
        match heap.data(obj)? {
            Data::Str(text) => Ok(text.as_bytes().to_vec()),
            Data::Bytes(bytes) | Data::ByteArray(bytes) => Ok(bytes.clone()),
            other => Err(ForeignError::type_error(format!(
                "a bytes-like object is required, not '{}'",
                other.type_name()
            ))),
        }
    }

    fn as_i64(&self, obj: ObjectHandle) -> ForeignResult<i64> {
        let heap = self.heap.lock();
        match heap.data(obj)? {
            Data::Long(value) => i64::try_from(*value)
                .map_err(|_| ForeignError::overflow("int too large to convert to C long long")),
            Data::Bool(value) => Ok(i64::from(*value)),
            _ => Err(heap.type_error(obj, "cannot be interpreted as an integer")),
        }
    }

    fn as_f64(&self, obj: ObjectHandle) -> ForeignResult<f64> {
        let heap = self.heap.lock();
        match heap.data(obj)? {
            Data::Float(value) => Ok(*value),
            Data::Long(value) => Ok(*value as f64),
            Data::Bool(value) => Ok(f64::from(u8::from(*value))),
            other => Err(ForeignError::type_error(format!(
                "must be real number, not {}",
                other.type_name()
            ))),
        }
    }

    fn new_bool(&self, value: bool) -> ForeignResult<ObjectHandle> {
        let mut heap = self.heap.lock();
        let handle = if value { heap.yes } else { heap.no };
        heap.incref(handle);
        Ok(handle)
    }

    fn new_long(&self, value: i64) -> ForeignResult<ObjectHandle> {
        Ok(self.heap.lock().alloc(Data::Long(i128::from(value))))
    }

    fn long_from_f64(&self, value: f64) -> ForeignResult<ObjectHandle> {
        if value.is_nan() {
            return Err(ForeignError::value_error("cannot convert float NaN to integer"));
        }
        if !value.is_finite() || value.abs() >= 1.7e38 {
            return Err(ForeignError::overflow("cannot convert float to integer"));
        }
        Ok(self.heap.lock().alloc(Data::Long(value.trunc() as i128)))
    }

    fn long_from_str(&self, text: &str) -> ForeignResult<ObjectHandle> {
        let value = text.trim().parse::<i128>().map_err(|_| {
            ForeignError::value_error(format!("invalid literal for int() with base 10: '{text}'"))
        })?;
        Ok(self.heap.lock().alloc(Data::Long(value)))
    }

    fn new_float(&self, value: f64) -> ForeignResult<ObjectHandle> {
        Ok(self.heap.lock().alloc(Data::Float(value)))
    }

    fn float_from_str(&self, text: &str) -> ForeignResult<ObjectHandle> {
        let value = text.trim().parse::<f64>().map_err(|_| {
            ForeignError::value_error(format!("could not convert string to float: '{text}'"))
        })?;
        Ok(self.heap.lock().alloc(Data::Float(value)))
    }

    fn new_bytes(&self, data: &[u8]) -> ForeignResult<ObjectHandle> {
        Ok(self.heap.lock().alloc(Data::Bytes(data.to_vec())))
    }

    fn new_bytearray(&self, data: &[u8]) -> ForeignResult<ObjectHandle> {
        Ok(self.heap.lock().alloc(Data::ByteArray(data.to_vec())))
    }

    fn new_string(&self, text: &str) -> ForeignResult<ObjectHandle> {
        Ok(self.heap.lock().alloc(Data::Str(text.to_owned())))
    }

    fn new_tuple(&self, items: &[ObjectHandle]) -> ForeignResult<ObjectHandle> {
        let mut heap = self.heap.lock();
        for &item in items {
            heap.require_live(item)?;
        }
        for &item in items {
            heap.incref(item);
        }
        Ok(heap.alloc(Data::Tuple(items.to_vec())))
    }

    fn new_list(&self) -> ForeignResult<ObjectHandle> {
        Ok(self.heap.lock().alloc(Data::List(Vec::new())))
    }

    fn new_dict(&self) -> ForeignResult<ObjectHandle> {
        Ok(self.heap.lock().alloc(Data::Dict(IndexMap::new())))
    }

    fn new_set(&self) -> ForeignResult<ObjectHandle> {
        Ok(self.heap.lock().alloc(Data::Set(Vec::new())))
    }

    fn new_module(&self, name: &str) -> ForeignResult<ObjectHandle> {
        let mut heap = self.heap.lock();
        let dict = heap.alloc(Data::Dict(IndexMap::new()));
        let module = heap.alloc(Data::Module {
            name: name.to_owned(),
            dict,
        });
        let name_obj = heap.alloc(Data::Str(name.to_owned()));
        let set = heap.dict_set(dict, "__name__", name_obj);
        heap.decref(name_obj);
        set.map(|()| module)
    }

    fn len(&self, obj: ObjectHandle) -> ForeignResult<usize> {
        let heap = self.heap.lock();
        match heap.data(obj)? {
            Data::Bytes(bytes) | Data::ByteArray(bytes) => Ok(bytes.len()),
            Data::Str(text) => Ok(text.chars().count()),
            Data::Tuple(items) | Data::List(items) | Data::Set(items) => Ok(items.len()),
            Data::Dict(map) => Ok(map.len()),
            _ => Err(heap.type_error(obj, "has no len()")),
        }
    }

    fn tuple_get(&self, obj: ObjectHandle, index: usize) -> ForeignResult<ObjectHandle> {
        let heap = self.heap.lock();
        match heap.data(obj)? {
            Data::Tuple(items) => items
                .get(index)
                .copied()
                .ok_or_else(|| ForeignError::index_error("tuple index out of range")),
            _ => Err(heap.type_error(obj, "is not a tuple")),
        }
    }

    fn list_get(&self, obj: ObjectHandle, index: usize) -> ForeignResult<ObjectHandle> {
        let heap = self.heap.lock();
        match heap.data(obj)? {
            Data::List(items) => items
                .get(index)
                .copied()
                .ok_or_else(|| ForeignError::index_error("list index out of range")),
            _ => Err(heap.type_error(obj, "is not a list")),
        }
    }

    fn list_set(&self, obj: ObjectHandle, index: usize, item: ObjectHandle) -> ForeignResult<()> {
        self.heap.lock().list_set(obj, index, item)
    }

    fn list_insert(&self, obj: ObjectHandle, index: usize, item: ObjectHandle) -> ForeignResult<()> {
        self.heap.lock().list_insert(obj, Some(index), item)
    }

    fn list_append(&self, obj: ObjectHandle, item: ObjectHandle) -> ForeignResult<()> {
        self.heap.lock().list_insert(obj, None, item)
    }

    fn dict_get(&self, obj: ObjectHandle, key: &str) -> ForeignResult<Option<ObjectHandle>> {
        let heap = self.heap.lock();
        match heap.data(obj)? {
            Data::Dict(map) => Ok(map.get(key).map(|&(_, value)| value)),
            _ => Err(heap.type_error(obj, "is not subscriptable by key")),
        }
    }

    fn dict_set(&self, obj: ObjectHandle, key: &str, item: ObjectHandle) -> ForeignResult<()> {
        self.heap.lock().dict_set(obj, key, item)
    }

    fn dict_next(&self, obj: ObjectHandle, cursor: &mut usize) -> Option<(ObjectHandle, ObjectHandle)> {
        let heap = self.heap.lock();
        let Ok(Data::Dict(map)) = heap.data(obj) else {
            return None;
        };
        let (_, &(key, value)) = map.get_index(*cursor)?;
        *cursor += 1;
        Some((key, value))
    }

    fn dict_copy(&self, obj: ObjectHandle) -> ForeignResult<ObjectHandle> {
        let mut heap = self.heap.lock();
        let map = match heap.data(obj)? {
            Data::Dict(map) => map.clone(),
            _ => return Err(heap.type_error(obj, "is not a dict")),
        };
        for &(key, value) in map.values() {
            heap.incref(key);
            heap.incref(value);
        }
        Ok(heap.alloc(Data::Dict(map)))
    }

    fn set_add(&self, obj: ObjectHandle, item: ObjectHandle) -> ForeignResult<()> {
        self.heap.lock().set_add(obj, item)
    }

    fn set_next(&self, obj: ObjectHandle, cursor: &mut usize) -> Option<ObjectHandle> {
        let heap = self.heap.lock();
        let Ok(Data::Set(items)) = heap.data(obj) else {
            return None;
        };
        let item = items.get(*cursor).copied()?;
        *cursor += 1;
        Some(item)
    }

    fn bytes_resize(&self, obj: ObjectHandle, len: usize) -> ForeignResult<()> {
        let mut heap = self.heap.lock();
        match heap.slot_mut(obj)? {
            Slot {
                data: Data::ByteArray(bytes),
                ..
            } => {
                bytes.resize(len, 0);
                Ok(())
            }
            _ => Err(heap.type_error(obj, "cannot be resized")),
        }
    }

    fn bytes_write(&self, obj: ObjectHandle, offset: usize, data: &[u8]) -> ForeignResult<()> {
        let mut heap = self.heap.lock();
        match heap.slot_mut(obj)? {
            Slot {
                data: Data::ByteArray(bytes),
                ..
            } => {
                let end = offset
                    .checked_add(data.len())
                    .filter(|&end| end <= bytes.len())
                    .ok_or_else(|| ForeignError::index_error("bytearray index out of range"))?;
                bytes[offset..end].copy_from_slice(data);
                Ok(())
            }
            _ => Err(heap.type_error(obj, "does not support item assignment")),
        }
    }

    fn module_name(&self, obj: ObjectHandle) -> ForeignResult<String> {
        let heap = self.heap.lock();
        match heap.data(obj)? {
            Data::Module { name, .. } => Ok(name.clone()),
            _ => Err(heap.type_error(obj, "is not a module")),
        }
    }

    fn module_dict(&self, obj: ObjectHandle) -> ForeignResult<ObjectHandle> {
        let heap = self.heap.lock();
        match heap.data(obj)? {
            Data::Module { dict, .. } => Ok(*dict),
            _ => Err(heap.type_error(obj, "is not a module")),
        }
    }

    fn module_add_object(&self, obj: ObjectHandle, name: &str, item: ObjectHandle) -> ForeignResult<()> {
        let mut heap = self.heap.lock();
        let dict = match heap.data(obj)? {
            Data::Module { dict, .. } => *dict,
            _ => return Err(heap.type_error(obj, "is not a module")),
        };
        heap.dict_set(dict, name, item)
    }
}
