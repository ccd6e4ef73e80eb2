/* Record storage hooks used by generated accessors */

use super::class::{ClassId, SlotId};
use super::value::Value;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

pub type ObjectRef = Arc<dyn Record>;

/// Internal access hook every participating record exposes.
///
/// Generated accessors address storage by slot index only, bypassing any
/// public API of the record, and perform no validation beyond what a direct
/// in-type access would. `store` takes `&self`: records carry their own
/// interior mutability so embedded objects can be shared by reference.
pub trait Record: Send + Sync + fmt::Debug {
    fn class(&self) -> ClassId;

    /* Slots that were never written read as `Value::Null` */
    fn load(&self, slot: SlotId) -> Value;

    fn store(&self, slot: SlotId, value: Value);
}

/// Builds empty instances without running any constructor logic, so value
/// objects with required constructor arguments are still reachable in empty form.
pub trait Instantiator: Send + Sync {
    fn instantiate(&self, class: ClassId) -> ObjectRef;
}

/* Default slot-vector record */
pub struct Object {
    class: ClassId,
    slots: RwLock<Vec<Value>>,
}

impl Object {
    pub fn empty(class: ClassId, width: usize) -> Self {
        Self {
            class,
            slots: RwLock::new(vec![Value::Null; width]),
        }
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.slots.read().clone()
    }
}

impl Record for Object {
    fn class(&self) -> ClassId {
        self.class
    }

    fn load(&self, slot: SlotId) -> Value {
        self.slots
            .read()
            .get(slot.index())
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn store(&self, slot: SlotId, value: Value) {
        let mut slots = self.slots.write();
        let idx = slot.index();
        if idx >= slots.len() {
            slots.resize(idx + 1, Value::Null);
        }
        slots[idx] = value;
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class)
            .field("slots", &*self.slots.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_slots_read_null() {
        let object = Object::empty(ClassId(0), 2);
        assert_eq!(object.load(SlotId(1)), Value::Null);
        assert_eq!(object.load(SlotId(7)), Value::Null);
    }

    #[test]
    fn store_grows_layout() {
        let object = Object::empty(ClassId(0), 1);
        object.store(SlotId(3), Value::Int(9));
        assert_eq!(object.load(SlotId(3)), Value::Int(9));
        assert_eq!(object.snapshot().len(), 4);
    }

    #[test]
    fn embedded_objects_are_shared() {
        let inner: ObjectRef = Arc::new(Object::empty(ClassId(1), 1));
        let outer = Object::empty(ClassId(0), 1);
        outer.store(SlotId(0), Value::Object(inner.clone()));
        inner.store(SlotId(0), Value::from("x"));

        let loaded = outer.load(SlotId(0)).into_object().unwrap();
        assert_eq!(loaded.load(SlotId(0)), Value::from("x"));
        assert_eq!(outer.load(SlotId(0)), Value::Object(inner));
    }
}
