use super::record::{Instantiator, Object, ObjectRef};
use accel_types::ClassDef;
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/* Index of a class inside one `ClassRegistry` */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/* Position of a property inside an object's slot layout */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl SlotId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub declaring: ClassId,
    pub name: String,
    /* Class of the value object held by this slot, for embedded properties */
    pub embedded: Option<ClassId>,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub id: ClassId,
    pub name: String,
    pub parent: Option<ClassId>,
    /* Full layout: inherited slots first, then the class's own properties */
    pub slots: Vec<SlotInfo>,
    own: BTreeMap<String, SlotId>,
}

impl ClassInfo {
    pub fn width(&self) -> usize {
        self.slots.len()
    }

    /* Slot of a property declared on this class (inherited ones are not visible here) */
    pub fn own_slot(&self, property: &str) -> Option<SlotId> {
        self.own.get(property).copied()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClassError {
    #[error("class '{0}' is declared more than once")]
    DuplicateClass(String),

    #[error("class '{class}' extends unknown class '{parent}'")]
    UnknownParent { class: String, parent: String },

    #[error("inheritance cycle detected: {}", .0.join(" -> "))]
    InheritanceCycle(Vec<String>),

    #[error("class '{class}' declares property '{property}' more than once")]
    DuplicateProperty { class: String, property: String },

    #[error("property '{class}::{property}' embeds unknown class '{embedded}'")]
    UnknownEmbeddedClass {
        class: String,
        property: String,
        embedded: String,
    },
}

/// Known classes, their single-inheritance hierarchy and slot layouts.
///
/// A derived class's layout always starts with its parent's layout, so a slot
/// index declared on an ancestor addresses the same property on every subtype
/// instance. Properties are keyed by `(declaring class, name)`: a subclass may
/// declare a property with an inherited name and gets a separate slot.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassInfo>,
    by_name: HashMap<String, ClassId>,
}

impl ClassRegistry {
    pub fn build(defs: &[ClassDef]) -> Result<Self, ClassError> {
        let mut defs_by_name: HashMap<&str, &ClassDef> = HashMap::new();
        for def in defs {
            if defs_by_name.insert(def.name.as_str(), def).is_some() {
                return Err(ClassError::DuplicateClass(def.name.clone()));
            }
        }

        /* Parents must be placed before children so layouts can be extended */
        let mut order: Vec<&ClassDef> = Vec::with_capacity(defs.len());
        let mut placed: HashSet<&str> = HashSet::new();
        for def in defs {
            let mut pending: Vec<&ClassDef> = Vec::new();
            let mut current = def;
            loop {
                if placed.contains(current.name.as_str()) {
                    break;
                }
                if let Some(pos) = pending.iter().position(|d| d.name == current.name) {
                    let mut cycle: Vec<String> =
                        pending[pos..].iter().map(|d| d.name.clone()).collect();
                    cycle.push(current.name.clone());
                    return Err(ClassError::InheritanceCycle(cycle));
                }
                pending.push(current);
                match &current.parent {
                    None => break,
                    Some(parent) => {
                        current = defs_by_name.get(parent.as_str()).copied().ok_or_else(|| {
                            ClassError::UnknownParent {
                                class: current.name.clone(),
                                parent: parent.clone(),
                            }
                        })?;
                    }
                }
            }
            for def in pending.into_iter().rev() {
                placed.insert(def.name.as_str());
                order.push(def);
            }
        }

        let by_name: HashMap<String, ClassId> = order
            .iter()
            .enumerate()
            .map(|(idx, def)| (def.name.clone(), ClassId(idx as u32)))
            .collect();

        let mut classes: Vec<ClassInfo> = Vec::with_capacity(order.len());
        for (idx, def) in order.iter().enumerate() {
            let id = ClassId(idx as u32);
            let parent = def.parent.as_ref().map(|p| by_name[p.as_str()]);
            let mut slots = match parent {
                Some(parent) => classes[parent.index()].slots.clone(),
                None => Vec::new(),
            };
            let mut own = BTreeMap::new();
            for property in &def.properties {
                let embedded = match &property.embedded {
                    None => None,
                    Some(embedded) => Some(*by_name.get(embedded).ok_or_else(|| {
                        ClassError::UnknownEmbeddedClass {
                            class: def.name.clone(),
                            property: property.name.clone(),
                            embedded: embedded.clone(),
                        }
                    })?),
                };
                let slot = SlotId(slots.len() as u32);
                if own.insert(property.name.clone(), slot).is_some() {
                    return Err(ClassError::DuplicateProperty {
                        class: def.name.clone(),
                        property: property.name.clone(),
                    });
                }
                slots.push(SlotInfo {
                    declaring: id,
                    name: property.name.clone(),
                    embedded,
                });
            }
            classes.push(ClassInfo {
                id,
                name: def.name.clone(),
                parent,
                slots,
                own,
            });
        }

        Ok(Self { classes, by_name })
    }

    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn info(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.index()]
    }

    pub fn name(&self, id: ClassId) -> &str {
        &self.info(id).name
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter()
    }

    /* Reflexive: every class is a subclass of itself */
    pub fn is_subclass_of(&self, class: ClassId, ancestor: ClassId) -> bool {
        let mut current = Some(class);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.info(id).parent;
        }
        false
    }

    /* The member of `classes` that is a subclass of every other member, if any */
    pub fn most_derived(&self, classes: &[ClassId]) -> Option<ClassId> {
        classes.iter().copied().find(|candidate| {
            classes
                .iter()
                .all(|other| self.is_subclass_of(*candidate, *other))
        })
    }

    /* Slot of `property` as declared on `owner` */
    pub fn slot_of(&self, owner: ClassId, property: &str) -> Option<SlotId> {
        self.info(owner).own_slot(property)
    }

    pub fn slot(&self, owner: ClassId, slot: SlotId) -> Option<&SlotInfo> {
        self.info(owner).slots.get(slot.index())
    }
}

impl Instantiator for ClassRegistry {
    fn instantiate(&self, class: ClassId) -> ObjectRef {
        let width = self.classes.get(class.index()).map_or(0, ClassInfo::width);
        Arc::new(Object::empty(class, width))
    }
}
