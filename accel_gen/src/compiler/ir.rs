/* Generated accessor program: an arena of functions referencing each other by id */

use crate::model::{ClassId, ClassRegistry, SlotId};
use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(pub usize);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/* Reads one slot, optionally off the object produced by a previous getter */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GetFn {
    pub name: String,
    pub owner: ClassId,
    pub property: String,
    pub slot: SlotId,
    pub previous: Option<FunctionId>,
}

/* Accessors for the chain prefix a setter writes through */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PreviousHop {
    pub getter: FunctionId,
    pub setter: FunctionId,
    /* Instantiated and written back when the prefix yields no object */
    pub class: ClassId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SetFn {
    pub name: String,
    pub owner: ClassId,
    pub property: String,
    pub slot: SlotId,
    pub previous: Option<PreviousHop>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DirectField {
    pub field: String,
    pub property: String,
    pub slot: SlotId,
}

/* A compound group: one embedded hop shared by `fields`, served by `function` */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompoundAccess {
    pub property: String,
    pub slot: SlotId,
    /* Declared class of the embedded property */
    pub class: ClassId,
    pub fields: Vec<String>,
    pub function: FunctionId,
}

/* Body shared by batch getters and batch setters */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchFn {
    pub name: String,
    /* Most-derived class of the group; the function takes an instance of it */
    pub class: ClassId,
    /* Ancestor-declared fields reached on the same object */
    pub self_group: Option<FunctionId>,
    pub direct: Vec<DirectField>,
    pub compound: Vec<CompoundAccess>,
}

impl BatchFn {
    pub fn references(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.self_group
            .into_iter()
            .chain(self.compound.iter().map(|c| c.function))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum AccessorFn {
    Get(GetFn),
    Set(SetFn),
    BatchGet(BatchFn),
    BatchSet(BatchFn),
    EmptyBatchGet { name: String },
    EmptyBatchSet { name: String },
}

impl AccessorFn {
    pub fn name(&self) -> &str {
        match self {
            AccessorFn::Get(f) => &f.name,
            AccessorFn::Set(f) => &f.name,
            AccessorFn::BatchGet(f) | AccessorFn::BatchSet(f) => &f.name,
            AccessorFn::EmptyBatchGet { name } | AccessorFn::EmptyBatchSet { name } => name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AccessorFn::Get(_) => "getter",
            AccessorFn::Set(_) => "setter",
            AccessorFn::BatchGet(_) | AccessorFn::EmptyBatchGet { .. } => "batch getter",
            AccessorFn::BatchSet(_) | AccessorFn::EmptyBatchSet { .. } => "batch setter",
        }
    }

    /* Functions this one calls */
    pub fn references(&self) -> Vec<FunctionId> {
        match self {
            AccessorFn::Get(f) => f.previous.into_iter().collect(),
            AccessorFn::Set(f) => f
                .previous
                .as_ref()
                .map(|p| vec![p.getter, p.setter])
                .unwrap_or_default(),
            AccessorFn::BatchGet(f) | AccessorFn::BatchSet(f) => f.references().collect(),
            AccessorFn::EmptyBatchGet { .. } | AccessorFn::EmptyBatchSet { .. } => Vec::new(),
        }
    }
}

/// Everything compiled for one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AccessorProgram {
    pub record_class: String,
    pub record_class_id: ClassId,
    /* Emission order: every function only references lower ids */
    pub functions: Vec<AccessorFn>,
    pub getters: IndexMap<String, FunctionId>,
    pub setters: IndexMap<String, FunctionId>,
    pub batch_getter: FunctionId,
    pub batch_setter: FunctionId,
}

impl AccessorProgram {
    pub fn function(&self, id: FunctionId) -> Option<&AccessorFn> {
        self.functions.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.getters.keys().map(String::as_str)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    fn function_label(&self, id: FunctionId) -> &str {
        self.function(id).map_or("?", AccessorFn::name)
    }

    /* Pseudo-code listing of the generated functions */
    pub fn listing(&self, classes: &ClassRegistry) -> String {
        let mut out = String::new();
        writeln!(out, "/* accessors for {} */", self.record_class).unwrap();
        writeln!(out).unwrap();
        for function in &self.functions {
            match function {
                AccessorFn::Get(f) => {
                    let line = match f.previous {
                        None => format!(
                            "fn {}(object: {}) = object.{}",
                            f.name,
                            class_label(classes, f.owner),
                            f.property
                        ),
                        Some(previous) => format!(
                            "fn {}(object) = {}(object)?.{}",
                            f.name,
                            self.function_label(previous),
                            f.property
                        ),
                    };
                    writeln!(out, "{}", line).unwrap();
                }
                AccessorFn::Set(f) => {
                    let line = match &f.previous {
                        None => format!(
                            "fn {}(object: {}, value) {{ object.{} = value }}",
                            f.name,
                            class_label(classes, f.owner),
                            f.property
                        ),
                        Some(previous) => format!(
                            "fn {}(object, value) {{ ({}(object) ?: {}(object, new {})).{} = value }}",
                            f.name,
                            self.function_label(previous.getter),
                            self.function_label(previous.setter),
                            class_label(classes, previous.class),
                            f.property
                        ),
                    };
                    writeln!(out, "{}", line).unwrap();
                }
                AccessorFn::BatchGet(f) => self.write_batch(&mut out, classes, f, true),
                AccessorFn::BatchSet(f) => self.write_batch(&mut out, classes, f, false),
                AccessorFn::EmptyBatchGet { name } => {
                    writeln!(out, "fn {}(object, fields) = {{}}", name).unwrap();
                }
                AccessorFn::EmptyBatchSet { name } => {
                    writeln!(out, "fn {}(object, values, defined) {{}}", name).unwrap();
                }
            }
        }
        out
    }

    fn write_batch(&self, out: &mut String, classes: &ClassRegistry, f: &BatchFn, is_get: bool) {
        let args = if is_get { "fields" } else { "values, defined" };
        writeln!(out, "fn {}(object: {}, {}) {{", f.name, class_label(classes, f.class), args).unwrap();
        if let Some(self_group) = f.self_group {
            writeln!(out, "    {}(object, {})", self.function_label(self_group), args).unwrap();
        }
        for direct in &f.direct {
            if is_get {
                writeln!(out, "    {} <- object.{}", direct.field, direct.property).unwrap();
            } else {
                writeln!(out, "    object.{} <- {}", direct.property, direct.field).unwrap();
            }
        }
        for compound in &f.compound {
            if is_get {
                writeln!(
                    out,
                    "    [{}] <- {}(object.{})",
                    compound.fields.join(", "),
                    self.function_label(compound.function),
                    compound.property
                )
                .unwrap();
            } else {
                writeln!(
                    out,
                    "    [{}] -> {}(object.{} ?: new {})",
                    compound.fields.join(", "),
                    self.function_label(compound.function),
                    compound.property,
                    class_label(classes, compound.class)
                )
                .unwrap();
            }
        }
        writeln!(out, "}}").unwrap();
    }
}

fn class_label(classes: &ClassRegistry, id: ClassId) -> &str {
    if id.index() < classes.len() {
        classes.name(id)
    } else {
        "?"
    }
}
