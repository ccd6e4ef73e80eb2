/* Accessor compiler: metadata -> field chains -> accessor program */

pub mod batch;
pub mod chain;
pub mod driver;
pub mod emitter;
pub mod ir;
pub mod planner;
pub mod registry;
pub mod scalar;

pub use chain::{ChainResolver, FieldChain, FieldSet, Hop, Step};
pub use driver::{AccessorCompiler, CompileOptions, MetadataProvider};
pub use emitter::Emitter;
pub use ir::{AccessorFn, AccessorProgram, FunctionId};
pub use planner::{extract_compound_chains, mark_parent_chains, plan_group, CompoundGroup, GroupPlan};
pub use registry::{ChainRegistry, MemoKey, OpKind};
