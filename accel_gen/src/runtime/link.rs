/* Linker: accessor program arena -> closures */

use super::{BatchGetter, BatchSetter, FieldSelection, FieldValues, Getter, Setter};
use crate::compiler::ir::{AccessorFn, AccessorProgram, BatchFn, FunctionId, GetFn, SetFn};
use crate::errors::LinkError;
use crate::model::{ClassId, Instantiator, ObjectRef, Record, SlotId, Value};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/* One linked arena entry */
#[derive(Clone)]
enum Linked {
    Get(Getter),
    Set(Setter),
    BatchGet(BatchGetter),
    BatchSet(BatchSetter),
}

/// The public accessors of one record type, ready to call.
#[derive(Clone)]
pub struct LinkedAccessors {
    pub getters: IndexMap<String, Getter>,
    pub setters: IndexMap<String, Setter>,
    pub batch_getter: BatchGetter,
    pub batch_setter: BatchSetter,
}

impl std::fmt::Debug for LinkedAccessors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedAccessors")
            .field("getters", &self.getters.keys().collect::<Vec<_>>())
            .field("setters", &self.setters.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Turns `program` into closures, in id order.
///
/// Each function may only call functions with a lower id, so every callee is
/// already linked when its caller is built. The instantiator is captured only
/// by functions that can allocate a missing intermediate.
pub fn link(
    program: &AccessorProgram,
    instantiator: Arc<dyn Instantiator>,
) -> Result<LinkedAccessors, LinkError> {
    let mut linked: Vec<Linked> = Vec::with_capacity(program.len());
    for (idx, function) in program.functions.iter().enumerate() {
        let id = FunctionId(idx);
        let entry = match function {
            AccessorFn::Get(f) => Linked::Get(link_getter(&linked, id, f)?),
            AccessorFn::Set(f) => Linked::Set(link_setter(&linked, id, f, &instantiator)?),
            AccessorFn::BatchGet(f) => Linked::BatchGet(link_batch_getter(&linked, id, f)?),
            AccessorFn::BatchSet(f) => {
                Linked::BatchSet(link_batch_setter(&linked, id, f, &instantiator)?)
            }
            AccessorFn::EmptyBatchGet { .. } => {
                Linked::BatchGet(Arc::new(|_: &dyn Record, _: &FieldSelection| FieldValues::new()))
            }
            AccessorFn::EmptyBatchSet { .. } => Linked::BatchSet(Arc::new(
                |_: &dyn Record, _: &FieldValues, _: Option<&FieldSelection>| {},
            )),
        };
        linked.push(entry);
    }

    let mut getters = IndexMap::with_capacity(program.getters.len());
    for (field, target) in &program.getters {
        getters.insert(field.clone(), public(&linked, field, *target, "getter", as_getter)?);
    }
    let mut setters = IndexMap::with_capacity(program.setters.len());
    for (field, target) in &program.setters {
        setters.insert(field.clone(), public(&linked, field, *target, "setter", as_setter)?);
    }
    let batch_getter = public(
        &linked,
        "<batch>",
        program.batch_getter,
        "batch getter",
        as_batch_getter,
    )?;
    let batch_setter = public(
        &linked,
        "<batch>",
        program.batch_setter,
        "batch setter",
        as_batch_setter,
    )?;

    debug!(record = %program.record_class, functions = linked.len(), "linked accessors");
    Ok(LinkedAccessors {
        getters,
        setters,
        batch_getter,
        batch_setter,
    })
}

fn as_getter(entry: &Linked) -> Option<Getter> {
    match entry {
        Linked::Get(f) => Some(f.clone()),
        _ => None,
    }
}

fn as_setter(entry: &Linked) -> Option<Setter> {
    match entry {
        Linked::Set(f) => Some(f.clone()),
        _ => None,
    }
}

fn as_batch_getter(entry: &Linked) -> Option<BatchGetter> {
    match entry {
        Linked::BatchGet(f) => Some(f.clone()),
        _ => None,
    }
}

fn as_batch_setter(entry: &Linked) -> Option<BatchSetter> {
    match entry {
        Linked::BatchSet(f) => Some(f.clone()),
        _ => None,
    }
}

/* Callee lookup from inside the arena: must point backwards and have the right kind */
fn callee<T>(
    linked: &[Linked],
    function: FunctionId,
    target: FunctionId,
    expected: &'static str,
    pick: fn(&Linked) -> Option<T>,
) -> Result<T, LinkError> {
    let entry = linked
        .get(target.index())
        .filter(|_| target < function)
        .ok_or(LinkError::ForwardReference { function, target })?;
    pick(entry).ok_or(LinkError::KindMismatch {
        function,
        target,
        expected,
    })
}

/* Lookup for the public maps */
fn public<T>(
    linked: &[Linked],
    field: &str,
    target: FunctionId,
    expected: &'static str,
    pick: fn(&Linked) -> Option<T>,
) -> Result<T, LinkError> {
    let entry = linked
        .get(target.index())
        .ok_or_else(|| LinkError::MissingFunction {
            field: field.to_string(),
            target,
        })?;
    pick(entry).ok_or(LinkError::KindMismatch {
        function: target,
        target,
        expected,
    })
}

fn link_getter(linked: &[Linked], id: FunctionId, f: &GetFn) -> Result<Getter, LinkError> {
    let slot = f.slot;
    let Some(previous) = f.previous else {
        return Ok(Arc::new(move |record: &dyn Record| record.load(slot)));
    };
    let previous = callee(linked, id, previous, "getter", as_getter)?;
    Ok(Arc::new(move |record: &dyn Record| match previous(record) {
        Value::Object(object) => object.load(slot),
        _ => Value::Null,
    }))
}

fn link_setter(
    linked: &[Linked],
    id: FunctionId,
    f: &SetFn,
    instantiator: &Arc<dyn Instantiator>,
) -> Result<Setter, LinkError> {
    let slot = f.slot;
    let Some(hop) = &f.previous else {
        return Ok(Arc::new(move |record: &dyn Record, value: Value| record.store(slot, value)));
    };
    let get = callee(linked, id, hop.getter, "getter", as_getter)?;
    let set = callee(linked, id, hop.setter, "setter", as_setter)?;
    let class = hop.class;
    let instantiator = Arc::clone(instantiator);
    Ok(Arc::new(move |record: &dyn Record, value: Value| {
        let target = match get(record).into_object() {
            Some(object) => object,
            None => {
                let object = instantiator.instantiate(class);
                set(record, Value::Object(Arc::clone(&object)));
                object
            }
        };
        target.store(slot, value);
    }))
}

/* Compound group resolved against the arena */
struct LinkedGroup<F> {
    slot: SlotId,
    class: ClassId,
    fields: Vec<String>,
    function: F,
}

impl<F> LinkedGroup<F> {
    fn selected(&self, selection: &FieldSelection) -> bool {
        self.fields.iter().any(|field| selection.contains(field))
    }
}

fn link_batch_getter(linked: &[Linked], id: FunctionId, f: &BatchFn) -> Result<BatchGetter, LinkError> {
    let self_group = f
        .self_group
        .map(|target| callee(linked, id, target, "batch getter", as_batch_getter))
        .transpose()?;
    let direct: Vec<(String, SlotId)> = f.direct.iter().map(|d| (d.field.clone(), d.slot)).collect();
    let groups = f
        .compound
        .iter()
        .map(|c| {
            Ok(LinkedGroup {
                slot: c.slot,
                class: c.class,
                fields: c.fields.clone(),
                function: callee(linked, id, c.function, "batch getter", as_batch_getter)?,
            })
        })
        .collect::<Result<Vec<_>, LinkError>>()?;

    Ok(Arc::new(move |record: &dyn Record, requested: &FieldSelection| {
        let mut values = match &self_group {
            Some(inherited) => inherited(record, requested),
            None => FieldValues::new(),
        };
        for (field, slot) in &direct {
            if requested.contains(field) {
                values.insert(field.clone(), record.load(*slot));
            }
        }
        for group in &groups {
            if !group.selected(requested) {
                continue;
            }
            match record.load(group.slot).into_object() {
                Some(object) => {
                    for (field, value) in (group.function)(&*object, requested) {
                        values.entry(field).or_insert(value);
                    }
                }
                None => {
                    for field in group.fields.iter().filter(|f| requested.contains(*f)) {
                        values.entry(field.clone()).or_insert(Value::Null);
                    }
                }
            }
        }
        values
    }))
}

fn link_batch_setter(
    linked: &[Linked],
    id: FunctionId,
    f: &BatchFn,
    instantiator: &Arc<dyn Instantiator>,
) -> Result<BatchSetter, LinkError> {
    let self_group = f
        .self_group
        .map(|target| callee(linked, id, target, "batch setter", as_batch_setter))
        .transpose()?;
    let direct: Vec<(String, SlotId)> = f.direct.iter().map(|d| (d.field.clone(), d.slot)).collect();
    let groups = f
        .compound
        .iter()
        .map(|c| {
            Ok(LinkedGroup {
                slot: c.slot,
                class: c.class,
                fields: c.fields.clone(),
                function: callee(linked, id, c.function, "batch setter", as_batch_setter)?,
            })
        })
        .collect::<Result<Vec<_>, LinkError>>()?;
    let instantiator = (!groups.is_empty()).then(|| Arc::clone(instantiator));

    Ok(Arc::new(
        move |record: &dyn Record, values: &FieldValues, defined: Option<&FieldSelection>| {
            let derived;
            let defined = match defined {
                Some(defined) => defined,
                None => {
                    derived = values.keys().cloned().collect::<FieldSelection>();
                    &derived
                }
            };

            if let Some(inherited) = &self_group {
                inherited(record, values, Some(defined));
            }
            for (field, slot) in &direct {
                if defined.contains(field) {
                    /* Selected but missing from `values` writes null */
                    record.store(*slot, values.get(field).cloned().unwrap_or_default());
                }
            }
            for group in &groups {
                if !group.selected(defined) {
                    continue;
                }
                let Some(target) = ensure_object(record, group, instantiator.as_deref()) else {
                    continue;
                };
                (group.function)(&*target, values, Some(defined));
            }
        },
    ))
}

/* Existing value object in the group's slot, or a fresh empty one written back */
fn ensure_object<F>(
    record: &dyn Record,
    group: &LinkedGroup<F>,
    instantiator: Option<&dyn Instantiator>,
) -> Option<ObjectRef> {
    if let Some(object) = record.load(group.slot).into_object() {
        return Some(object);
    }
    let object = instantiator?.instantiate(group.class);
    record.store(group.slot, Value::Object(Arc::clone(&object)));
    Some(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::{DirectField, PreviousHop};
    use crate::model::Object;

    struct Blank;

    impl Instantiator for Blank {
        fn instantiate(&self, class: ClassId) -> ObjectRef {
            Arc::new(Object::empty(class, 2))
        }
    }

    fn program(functions: Vec<AccessorFn>) -> AccessorProgram {
        AccessorProgram {
            record_class: "R".to_string(),
            record_class_id: ClassId(0),
            functions,
            getters: IndexMap::new(),
            setters: IndexMap::new(),
            batch_getter: FunctionId(0),
            batch_setter: FunctionId(1),
        }
    }

    fn empties() -> Vec<AccessorFn> {
        vec![
            AccessorFn::EmptyBatchGet {
                name: "bget0".to_string(),
            },
            AccessorFn::EmptyBatchSet {
                name: "bset1".to_string(),
            },
        ]
    }

    #[test]
    fn links_nested_setter() {
        let mut functions = empties();
        functions.extend([
            AccessorFn::Get(GetFn {
                name: "get2_b".to_string(),
                owner: ClassId(0),
                property: "b".to_string(),
                slot: SlotId(1),
                previous: None,
            }),
            AccessorFn::Set(SetFn {
                name: "set3_b".to_string(),
                owner: ClassId(0),
                property: "b".to_string(),
                slot: SlotId(1),
                previous: None,
            }),
            AccessorFn::Set(SetFn {
                name: "set4_b_c".to_string(),
                owner: ClassId(1),
                property: "c".to_string(),
                slot: SlotId(0),
                previous: Some(PreviousHop {
                    getter: FunctionId(2),
                    setter: FunctionId(3),
                    class: ClassId(1),
                }),
            }),
        ]);
        let mut program = program(functions);
        program.setters.insert("b.c".to_string(), FunctionId(4));

        let linked = link(&program, Arc::new(Blank)).unwrap();
        let record = Object::empty(ClassId(0), 2);
        (linked.setters["b.c"])(&record, Value::from(5));

        let embedded = record.load(SlotId(1)).into_object().unwrap();
        assert_eq!(embedded.class(), ClassId(1));
        assert_eq!(embedded.load(SlotId(0)), Value::Int(5));
    }

    #[test]
    fn forward_reference_is_rejected() {
        let mut functions = empties();
        functions.push(AccessorFn::Get(GetFn {
            name: "get2_c".to_string(),
            owner: ClassId(1),
            property: "c".to_string(),
            slot: SlotId(0),
            previous: Some(FunctionId(3)),
        }));
        let err = link(&program(functions), Arc::new(Blank)).unwrap_err();
        assert_eq!(
            err,
            LinkError::ForwardReference {
                function: FunctionId(2),
                target: FunctionId(3)
            }
        );
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let mut functions = empties();
        functions.push(AccessorFn::BatchGet(BatchFn {
            name: "bget2".to_string(),
            class: ClassId(0),
            self_group: Some(FunctionId(1)),
            direct: vec![DirectField {
                field: "a".to_string(),
                property: "a".to_string(),
                slot: SlotId(0),
            }],
            compound: Vec::new(),
        }));
        let err = link(&program(functions), Arc::new(Blank)).unwrap_err();
        assert!(matches!(err, LinkError::KindMismatch { expected: "batch getter", .. }));
    }

    #[test]
    fn missing_public_function_is_rejected() {
        let mut program = program(empties());
        program.getters.insert("a".to_string(), FunctionId(9));
        let err = link(&program, Arc::new(Blank)).unwrap_err();
        assert_eq!(
            err,
            LinkError::MissingFunction {
                field: "a".to_string(),
                target: FunctionId(9)
            }
        );
    }
}
