//! Fast accessor compiler.
//!
//! Compiles per-record field mappings (including fields stored inside
//! embedded value objects) into flat getter, setter and batch accessor
//! functions that address record storage by slot index.

pub mod artifact;
pub mod compiler;
pub mod errors;
pub mod model;
pub mod runtime;
pub mod schema;

pub use artifact::{ArtifactSink, DirectorySink, MemorySink};
pub use compiler::{AccessorCompiler, AccessorProgram, CompileOptions, MetadataProvider};
pub use errors::{CompileError, CompileResult, LinkError};
pub use model::{ClassId, ClassRegistry, Instantiator, Object, ObjectRef, Record, SlotId, Value};
pub use runtime::{FastAccessors, FieldSelection, FieldValues};
pub use schema::{Schema, SchemaError};
