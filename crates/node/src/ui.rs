//! UI description of a node.
//!
//! [`NodeDescriptor`] maps to a fixed tree shape:
//!
//! ```text
//! { inputs:  [ {type, name, defl, doc}, ... ],
//!   outputs: [ ... ],
//!   attribs: [ ... ],
//!   category: [ segment, ... ] }
//! ```
//!
//! Empty strings are left out of the per-field maps. The same shape is
//! available as serde data ([`UiDescriptor`]), as JSON, and as a tree of
//! runtime dict/list/str objects for consumers living in the runtime.

use serde::{Deserialize, Serialize};
use tether_value::{DictRef, ListRef, ScopedLock, SharedRef};

use crate::descriptor::{FieldDescriptor, NodeDescriptor};

/// One socket or attribute in the UI shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiField {
    /// Type label.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub ty: String,
    /// Field name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Default value.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub defl: String,
    /// Documentation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

impl From<&FieldDescriptor> for UiField {
    fn from(field: &FieldDescriptor) -> Self {
        Self {
            ty: field.ty.to_owned(),
            name: field.name.to_owned(),
            defl: field.defl.to_owned(),
            doc: field.doc.to_owned(),
        }
    }
}

impl UiField {
    fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("type", self.ty.as_str()),
            ("name", self.name.as_str()),
            ("defl", self.defl.as_str()),
            ("doc", self.doc.as_str()),
        ]
        .into_iter()
        .filter(|(_, text)| !text.is_empty())
    }
}

/// Serializable UI description of a node type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiDescriptor {
    /// Input sockets.
    #[serde(default)]
    pub inputs: Vec<UiField>,
    /// Output sockets.
    #[serde(default)]
    pub outputs: Vec<UiField>,
    /// Attributes.
    #[serde(default)]
    pub attribs: Vec<UiField>,
    /// Category path segments.
    #[serde(default)]
    pub category: Vec<String>,
}

impl NodeDescriptor<'_> {
    /// The UI shape as plain data.
    pub fn to_ui(&self) -> UiDescriptor {
        UiDescriptor {
            inputs: self.inputs.iter().map(UiField::from).collect(),
            outputs: self.outputs.iter().map(UiField::from).collect(),
            attribs: self.attribs.iter().map(UiField::from).collect(),
            category: self.category.segments().map(str::to_owned).collect(),
        }
    }

    /// The UI shape as pretty-printed JSON.
    pub fn to_ui_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_ui())
    }

    /// The UI shape as a tree of runtime objects.
    pub fn to_ui_tree(&self, lock: &ScopedLock<'_>) -> SharedRef<'static> {
        self.to_ui().to_tree(lock)
    }
}

impl UiDescriptor {
    /// Build the runtime dict/list/str tree for this description.
    ///
    /// Children are inserted with the steal mutations. An insertion the
    /// runtime refuses is logged and its child released.
    pub fn to_tree(&self, lock: &ScopedLock<'_>) -> SharedRef<'static> {
        let root = lock.new_dict();
        {
            let dict = DictRef::new(lock, &root);
            for (key, fields) in [
                ("inputs", &self.inputs),
                ("outputs", &self.outputs),
                ("attribs", &self.attribs),
            ] {
                let list = lock.new_list();
                {
                    let items = ListRef::new(lock, &list);
                    for field in fields {
                        append(&items, field_tree(lock, field));
                    }
                }
                put(&dict, key, list);
            }

            let category = lock.new_list();
            {
                let segments = ListRef::new(lock, &category);
                for segment in &self.category {
                    append(&segments, lock.new_string(segment));
                }
            }
            put(&dict, "category", category);
        }
        root
    }
}

fn field_tree(lock: &ScopedLock<'_>, field: &UiField) -> SharedRef<'static> {
    let item = lock.new_dict();
    {
        let dict = DictRef::new(lock, &item);
        for (key, text) in field.entries() {
            put(&dict, key, lock.new_string(text));
        }
    }
    item
}

fn put(dict: &DictRef<'_>, key: &str, child: SharedRef<'_>) {
    if let Err(rejected) = dict.set_steal(key, child) {
        tracing::debug!(key, error = %rejected.error, "ui tree entry dropped");
    }
}

fn append(list: &ListRef<'_>, child: SharedRef<'_>) {
    if let Err(rejected) = list.append_steal(child) {
        tracing::debug!(error = %rejected.error, "ui tree item dropped");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::descriptor::{CategoryDescriptor, Descriptor};

    const SAMPLE: Descriptor<1, 1, 1> = Descriptor::new(
        [FieldDescriptor::with_default("int", "x", "0")],
        [FieldDescriptor::new("int", "y", "", "result")],
        [FieldDescriptor::named("mode")],
        CategoryDescriptor::new("math/basic"),
    );

    #[test]
    fn empty_strings_are_omitted_from_json() {
        let json: serde_json::Value = serde_json::from_str(&SAMPLE.view().to_ui_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "inputs": [{"type": "int", "name": "x", "defl": "0"}],
                "outputs": [{"type": "int", "name": "y", "doc": "result"}],
                "attribs": [{"name": "mode"}],
                "category": ["math", "basic"],
            })
        );
    }

    #[test]
    fn json_reads_back() {
        let ui = SAMPLE.view().to_ui();
        let json = serde_json::to_string(&ui).unwrap();
        let back: UiDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ui);
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let ui: UiDescriptor = serde_json::from_str(r#"{"category": ["x"]}"#).unwrap();
        assert!(ui.inputs.is_empty());
        assert_eq!(ui.category, ["x"]);
    }
}
