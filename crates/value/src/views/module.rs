use crate::error::{Rejected, ValueError};
use crate::handle::ObjectHandle;
use crate::shared::SharedRef;
use crate::tagged::{AsObject, TaggedValue};
use crate::views::{steal, with_object, DictRef};

typed_view! {
    /// View over a module object.
    ModuleRef => Module
}

impl<'s> ModuleRef<'s> {
    /// The module's name; `None` for none.
    pub fn name(&self) -> Option<String> {
        if self.is_none() {
            return None;
        }
        self.lock.drained(self.lock.runtime().module_name(self.handle))
    }

    /// The namespace dict, viewed under the same lock.
    ///
    /// Viewing a none module yields a none dict.
    pub fn dict(&self) -> DictRef<'s> {
        let runtime = self.lock.runtime();
        let handle = if self.is_none() {
            runtime.none()
        } else {
            self.lock
                .drained(runtime.module_dict(self.handle))
                .unwrap_or_else(|| runtime.none())
        };
        DictRef::from_handle(self.lock, handle)
    }

    /// Bind `name`; the module takes its own reference.
    pub fn add_object(&self, name: &str, item: &impl AsObject) -> Result<(), ValueError> {
        with_object(self.lock, item.as_tagged(), |child| self.bind(name, child))
    }

    /// Bind `name`, handing `item`'s reference to the module.
    pub fn add_object_steal<'a>(&self, name: &str, item: SharedRef<'a>) -> Result<(), Rejected<SharedRef<'a>>> {
        steal(self.lock, item, |child| self.bind(name, child))
    }

    /// Bind `name` to a new string object holding `value`.
    pub fn add_string_constant(&self, name: &str, value: &str) -> Result<(), ValueError> {
        self.add_object(name, &TaggedValue::Cstr(value))
    }

    fn bind(&self, name: &str, child: ObjectHandle) -> Result<(), ValueError> {
        self.lock
            .runtime()
            .module_add_object(self.handle, name, child)
            .map_err(|e| self.lock.fault(e))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bridge::Bridge;
    use crate::heap::HeapRuntime;
    use pretty_assertions::assert_eq;

    #[test]
    fn constants_land_in_the_namespace() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let module = lock.new_module("geometry");
        let view = ModuleRef::new(&lock, &module);
        view.add_string_constant("unit", "mm").unwrap();
        view.add_object("sides", &TaggedValue::I64(4)).unwrap();

        assert_eq!(view.name().as_deref(), Some("geometry"));
        let dict = view.dict();
        assert!(dict.contains("__name__"));
        let unit = dict.get("unit").unwrap();
        assert_eq!(lock.runtime().to_text(unit.object_handle().unwrap()).unwrap(), "mm");
        assert_eq!(dict.get("sides").unwrap().to_i64(&lock), 4);
    }

    #[test]
    fn none_module_has_none_dict() {
        let bridge = Bridge::new(Arc::new(HeapRuntime::new()));
        let lock = bridge.lock();
        let none = lock.none();
        let view = ModuleRef::new(&lock, &none);
        assert_eq!(view.name(), None);
        assert_eq!(view.dict().size(), -1);
        assert!(matches!(
            view.add_string_constant("x", "y"),
            Err(ValueError::Foreign(_))
        ));
    }
}
