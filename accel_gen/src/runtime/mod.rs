/* Callable accessors: linking compiled programs and publishing them once */

pub mod accessors;
pub mod link;

use crate::model::{Record, Value};
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

pub use accessors::FastAccessors;
pub use link::{link, LinkedAccessors};

/* Field names passed to batch accessors */
pub type FieldSelection = IndexSet<String>;

/* Field name -> value, for batch reads and writes */
pub type FieldValues = IndexMap<String, Value>;

pub type Getter = Arc<dyn Fn(&dyn Record) -> Value + Send + Sync>;

pub type Setter = Arc<dyn Fn(&dyn Record, Value) + Send + Sync>;

/// Reads the requested fields off a record. The result has exactly one entry
/// per requested field; fields behind an absent intermediate read as null.
pub type BatchGetter = Arc<dyn Fn(&dyn Record, &FieldSelection) -> FieldValues + Send + Sync>;

/// Writes fields onto a record. Without an explicit selection every key of the
/// values map is written.
pub type BatchSetter =
    Arc<dyn Fn(&dyn Record, &FieldValues, Option<&FieldSelection>) + Send + Sync>;
