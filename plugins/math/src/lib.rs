//! # Tether Math Plugin
//!
//! Arithmetic nodes over floats, exported through the plugin entry:
//!
//! - [`Constant`]: emits its `value` attribute
//! - [`Add`]: `a + b`
//! - [`Multiply`]: `a * b`
//! - [`Negate`]: `-x`
//! - [`Pair`]: `[a, b]` as a runtime list
//!
//! Built as a `cdylib`, the library can be dropped into any plugin
//! directory. Inputs accept native numbers and numeric runtime objects.

use tether_node::{
    CategoryDescriptor, Descriptor, FieldDescriptor, Node, NodeDescriptor, NodeInterface, Status,
    export_nodes,
};
use tether_value::{ListRef, ScopedLock, SharedRef, TaggedValue};

/// Read a numeric input, logging values that are not numbers.
fn number(lock: &ScopedLock<'_>, tag: &str, value: TaggedValue<'_>) -> Option<f64> {
    match value.try_to_f64(lock) {
        Ok(number) => Some(number),
        Err(error) => {
            tracing::debug!(tag, %error, "input is not a number");
            None
        }
    }
}

const fn float(name: &'static str) -> FieldDescriptor {
    FieldDescriptor::with_default("float", name, "0")
}

// ── Constant ────────────────────────────────────────────────────────────────

static CONSTANT: Descriptor<0, 1, 1> = Descriptor::new(
    [],
    [FieldDescriptor::typed("float", "out")],
    [FieldDescriptor::new("float", "value", "0", "emitted value")],
    CategoryDescriptor::new("math.source"),
);

/// Emits a fixed number on `out`.
#[derive(Debug, Default)]
pub struct Constant {
    value: f64,
}

impl Constant {
    /// A constant emitting `value`.
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Node for Constant {
    fn set_input(&mut self, lock: &ScopedLock<'_>, tag: &str, value: TaggedValue<'_>) -> Status {
        match (tag, number(lock, tag, value)) {
            ("value", Some(value)) => {
                self.value = value;
                Status::Success
            }
            _ => Status::Fail,
        }
    }

    fn get_output(&self, _lock: &ScopedLock<'_>, tag: &str) -> TaggedValue<'_> {
        match tag {
            "out" => TaggedValue::F64(self.value),
            _ => TaggedValue::Empty,
        }
    }

    fn apply(&mut self, _lock: &ScopedLock<'_>) -> Status {
        Status::Success
    }
}

impl NodeInterface for Constant {
    fn descriptor() -> Option<NodeDescriptor<'static>> {
        Some(CONSTANT.view())
    }
}

// ── Binary operators ────────────────────────────────────────────────────────

/// Two operands, one result; `apply` fails until both operands arrived.
#[derive(Debug, Default)]
struct Operands {
    a: Option<f64>,
    b: Option<f64>,
    result: Option<f64>,
}

impl Operands {
    fn set(&mut self, lock: &ScopedLock<'_>, tag: &str, value: TaggedValue<'_>) -> Status {
        let slot = match tag {
            "a" => &mut self.a,
            "b" => &mut self.b,
            _ => return Status::Fail,
        };
        match number(lock, tag, value) {
            Some(number) => {
                *slot = Some(number);
                Status::Success
            }
            None => Status::Fail,
        }
    }

    fn apply(&mut self, op: fn(f64, f64) -> f64) -> Status {
        match (self.a, self.b) {
            (Some(a), Some(b)) => {
                self.result = Some(op(a, b));
                Status::Success
            }
            _ => Status::Fail,
        }
    }

    fn output(&self, tag: &str, name: &str) -> TaggedValue<'_> {
        match self.result {
            Some(result) if tag == name => TaggedValue::F64(result),
            _ => TaggedValue::Empty,
        }
    }
}

static ADD: Descriptor<2, 1, 0> = Descriptor::new(
    [float("a"), float("b")],
    [FieldDescriptor::new("float", "sum", "", "a + b")],
    [],
    CategoryDescriptor::new("math.basic"),
);

/// `sum = a + b`.
#[derive(Debug, Default)]
pub struct Add(Operands);

impl Node for Add {
    fn set_input(&mut self, lock: &ScopedLock<'_>, tag: &str, value: TaggedValue<'_>) -> Status {
        self.0.set(lock, tag, value)
    }

    fn get_output(&self, _lock: &ScopedLock<'_>, tag: &str) -> TaggedValue<'_> {
        self.0.output(tag, "sum")
    }

    fn apply(&mut self, _lock: &ScopedLock<'_>) -> Status {
        self.0.apply(|a, b| a + b)
    }
}

impl NodeInterface for Add {
    fn descriptor() -> Option<NodeDescriptor<'static>> {
        Some(ADD.view())
    }
}

static MULTIPLY: Descriptor<2, 1, 0> = Descriptor::new(
    [float("a"), float("b")],
    [FieldDescriptor::new("float", "product", "", "a * b")],
    [],
    CategoryDescriptor::new("math.basic"),
);

/// `product = a * b`.
#[derive(Debug, Default)]
pub struct Multiply(Operands);

impl Node for Multiply {
    fn set_input(&mut self, lock: &ScopedLock<'_>, tag: &str, value: TaggedValue<'_>) -> Status {
        self.0.set(lock, tag, value)
    }

    fn get_output(&self, _lock: &ScopedLock<'_>, tag: &str) -> TaggedValue<'_> {
        self.0.output(tag, "product")
    }

    fn apply(&mut self, _lock: &ScopedLock<'_>) -> Status {
        self.0.apply(|a, b| a * b)
    }
}

impl NodeInterface for Multiply {
    fn descriptor() -> Option<NodeDescriptor<'static>> {
        Some(MULTIPLY.view())
    }
}

// ── Negate ──────────────────────────────────────────────────────────────────

static NEGATE: Descriptor<1, 1, 0> = Descriptor::new(
    [float("x")],
    [FieldDescriptor::typed("float", "y")],
    [],
    CategoryDescriptor::new("math/unary"),
);

/// `y = -x`.
#[derive(Debug, Default)]
pub struct Negate {
    x: Option<f64>,
    y: Option<f64>,
}

impl Node for Negate {
    fn set_input(&mut self, lock: &ScopedLock<'_>, tag: &str, value: TaggedValue<'_>) -> Status {
        match (tag, number(lock, tag, value)) {
            ("x", Some(x)) => {
                self.x = Some(x);
                Status::Success
            }
            _ => Status::Fail,
        }
    }

    fn get_output(&self, _lock: &ScopedLock<'_>, tag: &str) -> TaggedValue<'_> {
        match (tag, self.y) {
            ("y", Some(y)) => TaggedValue::F64(y),
            _ => TaggedValue::Empty,
        }
    }

    fn apply(&mut self, _lock: &ScopedLock<'_>) -> Status {
        match self.x {
            Some(x) => {
                self.y = Some(-x);
                Status::Success
            }
            None => Status::Fail,
        }
    }
}

impl NodeInterface for Negate {
    fn descriptor() -> Option<NodeDescriptor<'static>> {
        Some(NEGATE.view())
    }
}

// ── Pair ────────────────────────────────────────────────────────────────────

static PAIR: Descriptor<2, 1, 0> = Descriptor::new(
    [float("a"), float("b")],
    [FieldDescriptor::new("list", "pair", "", "[a, b]")],
    [],
    CategoryDescriptor::new("math.collect"),
);

/// `pair = [a, b]`, built as a fresh runtime list on every apply.
#[derive(Debug, Default)]
pub struct Pair {
    operands: Operands,
    pair: Option<SharedRef<'static>>,
}

impl Node for Pair {
    fn set_input(&mut self, lock: &ScopedLock<'_>, tag: &str, value: TaggedValue<'_>) -> Status {
        self.operands.set(lock, tag, value)
    }

    fn get_output(&self, _lock: &ScopedLock<'_>, tag: &str) -> TaggedValue<'_> {
        match (tag, &self.pair) {
            ("pair", Some(pair)) => pair.value(),
            _ => TaggedValue::Empty,
        }
    }

    fn apply(&mut self, lock: &ScopedLock<'_>) -> Status {
        let (Some(a), Some(b)) = (self.operands.a, self.operands.b) else {
            return Status::Fail;
        };
        let list = lock.new_list();
        let view = ListRef::new(lock, &list);
        for item in [a, b] {
            if let Err(error) = view.append(&TaggedValue::F64(item)) {
                tracing::warn!(%error, "building the pair failed");
                return Status::Fail;
            }
        }
        // Replacing the previous list releases it here.
        self.pair = Some(list);
        Status::Success
    }
}

impl NodeInterface for Pair {
    fn descriptor() -> Option<NodeDescriptor<'static>> {
        Some(PAIR.view())
    }
}

export_nodes!(Constant, Add, Multiply, Negate, Pair);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tether_value::{Bridge, HeapRuntime};

    use super::*;

    #[rstest]
    #[case(TaggedValue::F64(1.5), Some(1.5))]
    #[case(TaggedValue::I32(2), Some(2.0))]
    #[case(TaggedValue::Cstr("2"), None)]
    #[case(TaggedValue::Empty, None)]
    fn numeric_inputs(#[case] value: TaggedValue<'static>, #[case] expected: Option<f64>) {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        assert_eq!(number(&lock, "x", value), expected);
    }

    #[test]
    fn operators_wait_for_both_operands() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let mut add = Add::default();
        assert_eq!(add.set_input(&lock, "a", TaggedValue::F64(1.0)), Status::Success);
        assert_eq!(add.apply(&lock), Status::Fail);
        assert_eq!(add.get_output(&lock, "sum"), TaggedValue::Empty);

        assert_eq!(add.set_input(&lock, "b", TaggedValue::I64(2)), Status::Success);
        assert_eq!(add.apply(&lock), Status::Success);
        assert_eq!(add.get_output(&lock, "sum"), TaggedValue::F64(3.0));
        assert_eq!(add.get_output(&lock, "product"), TaggedValue::Empty);
    }

    #[test]
    fn unknown_sockets_are_refused() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        assert_eq!(Multiply::default().set_input(&lock, "c", TaggedValue::F64(1.0)), Status::Fail);
        assert_eq!(Negate::default().set_input(&lock, "y", TaggedValue::F64(1.0)), Status::Fail);
        assert_eq!(Constant::new(4.0).get_output(&lock, "out"), TaggedValue::F64(4.0));
    }

    #[test]
    fn labels_are_type_names() {
        assert_eq!(
            [Constant::label(), Add::label(), Multiply::label(), Negate::label(), Pair::label()],
            ["Constant", "Add", "Multiply", "Negate", "Pair"]
        );
    }

    #[test]
    fn pair_rebuilds_its_list_on_every_apply() {
        let runtime = Arc::new(HeapRuntime::new());
        let bridge = Bridge::new(runtime.clone());
        let lock = bridge.lock();
        let mut pair = Pair::default();
        assert_eq!(pair.apply(&lock), Status::Fail);

        assert_eq!(pair.set_input(&lock, "a", TaggedValue::F64(1.0)), Status::Success);
        assert_eq!(pair.set_input(&lock, "b", TaggedValue::I64(2)), Status::Success);
        assert_eq!(pair.apply(&lock), Status::Success);
        assert_eq!(pair.apply(&lock), Status::Success);
        let output = pair.get_output(&lock, "pair");
        let list = ListRef::try_new(&lock, &output).unwrap();
        let items: Vec<f64> = list.iter().map(|item| item.to_f64(&lock)).collect();
        assert_eq!(items, [1.0, 2.0]);

        drop(pair);
        assert_eq!(runtime.live_objects(), 0);
    }
}
