//! Static node metadata.
//!
//! A plugin describes each node type with a [`Descriptor`] built in a
//! `const`/`static` context. The registry keeps the flat [`NodeDescriptor`]
//! projection, which the UI builder turns into the generic value tree.

/// One input/output socket or attribute: type, name, default and docs.
///
/// Empty strings mean "unspecified" and are omitted from UI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldDescriptor {
    /// Type label, e.g. `"int"`.
    pub ty: &'static str,
    /// Field name.
    pub name: &'static str,
    /// Default value, rendered as text.
    pub defl: &'static str,
    /// Documentation string.
    pub doc: &'static str,
}

/// A socket on a node.
pub type SocketDescriptor = FieldDescriptor;
/// An attribute of a node.
pub type AttribDescriptor = FieldDescriptor;

impl FieldDescriptor {
    /// Fully specified field.
    pub const fn new(ty: &'static str, name: &'static str, defl: &'static str, doc: &'static str) -> Self {
        Self { ty, name, defl, doc }
    }

    /// Field with only a name.
    pub const fn named(name: &'static str) -> Self {
        Self::new("", name, "", "")
    }

    /// Field with a type and a name.
    pub const fn typed(ty: &'static str, name: &'static str) -> Self {
        Self::new(ty, name, "", "")
    }

    /// Field with a type, a name and a default.
    pub const fn with_default(ty: &'static str, name: &'static str, defl: &'static str) -> Self {
        Self::new(ty, name, defl, "")
    }
}

/// Category path of a node, e.g. `"math.basic"` or `"io/files"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoryDescriptor {
    /// The raw category string.
    pub category: &'static str,
}

impl CategoryDescriptor {
    /// Category used when a node does not name one.
    pub const UNCATEGORIZED: &'static str = "uncategorized";

    /// Wrap a category string.
    pub const fn new(category: &'static str) -> Self {
        Self { category }
    }

    /// Non-empty path segments, split on `.` and `/`.
    pub fn segments(&self) -> impl Iterator<Item = &'static str> {
        self.category
            .split(['.', '/'])
            .filter(|segment| !segment.is_empty())
    }
}

impl Default for CategoryDescriptor {
    fn default() -> Self {
        Self::new(Self::UNCATEGORIZED)
    }
}

/// Compile-time sized node descriptor.
///
/// ```
/// use tether_node::{CategoryDescriptor, Descriptor, FieldDescriptor};
///
/// static ADD: Descriptor<2, 1, 0> = Descriptor::new(
///     [FieldDescriptor::with_default("float", "a", "0"), FieldDescriptor::with_default("float", "b", "0")],
///     [FieldDescriptor::typed("float", "sum")],
///     [],
///     CategoryDescriptor::new("math.basic"),
/// );
///
/// let view = ADD.view();
/// assert_eq!(view.inputs.len(), 2);
/// assert_eq!(view.category.segments().collect::<Vec<_>>(), ["math", "basic"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor<const I: usize, const O: usize, const A: usize> {
    /// Input sockets.
    pub inputs: [SocketDescriptor; I],
    /// Output sockets.
    pub outputs: [SocketDescriptor; O],
    /// Attributes.
    pub attribs: [AttribDescriptor; A],
    /// Category path.
    pub category: CategoryDescriptor,
}

impl<const I: usize, const O: usize, const A: usize> Descriptor<I, O, A> {
    /// Assemble a descriptor.
    pub const fn new(
        inputs: [SocketDescriptor; I],
        outputs: [SocketDescriptor; O],
        attribs: [AttribDescriptor; A],
        category: CategoryDescriptor,
    ) -> Self {
        Self {
            inputs,
            outputs,
            attribs,
            category,
        }
    }

    /// Flat projection, independent of the array sizes.
    pub const fn view(&self) -> NodeDescriptor<'_> {
        NodeDescriptor {
            inputs: &self.inputs,
            outputs: &self.outputs,
            attribs: &self.attribs,
            category: self.category,
        }
    }
}

/// Size-erased view of a [`Descriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeDescriptor<'a> {
    /// Input sockets.
    pub inputs: &'a [SocketDescriptor],
    /// Output sockets.
    pub outputs: &'a [SocketDescriptor],
    /// Attributes.
    pub attribs: &'a [AttribDescriptor],
    /// Category path.
    pub category: CategoryDescriptor,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("math.basic", &["math", "basic"])]
    #[case("io/files", &["io", "files"])]
    #[case("a..b//c", &["a", "b", "c"])]
    #[case("./", &[])]
    #[case("", &[])]
    #[case("uncategorized", &["uncategorized"])]
    fn category_segments(#[case] raw: &'static str, #[case] expected: &[&str]) {
        let segments: Vec<_> = CategoryDescriptor::new(raw).segments().collect();
        assert_eq!(segments, expected);
    }

    #[test]
    fn default_category() {
        assert_eq!(CategoryDescriptor::default().category, "uncategorized");
        assert_eq!(NodeDescriptor::default().category.category, "uncategorized");
    }

    #[test]
    fn field_constructors() {
        assert_eq!(
            FieldDescriptor::named("x"),
            FieldDescriptor {
                ty: "",
                name: "x",
                defl: "",
                doc: ""
            }
        );
        assert_eq!(FieldDescriptor::with_default("int", "x", "0").defl, "0");
    }

    #[test]
    fn view_borrows_the_arrays() {
        const EMPTY: Descriptor<0, 0, 0> = Descriptor::new([], [], [], CategoryDescriptor::new(""));
        let view = EMPTY.view();
        assert!(view.inputs.is_empty() && view.outputs.is_empty() && view.attribs.is_empty());
    }
}
