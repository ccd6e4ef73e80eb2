use super::chain::Step;
use super::ir::{AccessorFn, FunctionId};
use super::registry::{ChainRegistry, MemoKey, OpKind};
use crate::model::ClassRegistry;
use tracing::trace;

/// Per-pass emission state: the memo table plus the function arena.
///
/// Created empty for one record type and consumed when the pass ends.
pub struct Emitter<'a> {
    pub(super) classes: &'a ClassRegistry,
    registry: ChainRegistry,
    functions: Vec<AccessorFn>,
}

impl<'a> Emitter<'a> {
    pub fn new(classes: &'a ClassRegistry) -> Self {
        Self {
            classes,
            registry: ChainRegistry::new(),
            functions: Vec::new(),
        }
    }

    pub fn lookup(&self, kind: OpKind, chain: &[Step]) -> Option<FunctionId> {
        self.registry.get(&MemoKey::new(kind, chain))
    }

    /* Function name in the style `get3_address_city`, numbered by memo table size */
    pub(super) fn function_name(&self, kind: OpKind, chain: &[Step]) -> String {
        let mut name = format!("{}{}", kind.prefix(), self.registry.len());
        for step in chain {
            if !step.is_wildcard() {
                name.push('_');
                name.push_str(step.name());
            }
        }
        name
    }

    pub(super) fn push(&mut self, kind: OpKind, chain: &[Step], function: AccessorFn) -> FunctionId {
        let id = FunctionId(self.functions.len());
        trace!(id = id.index(), name = function.name(), kind = function.kind_name(), "emitted accessor");
        self.functions.push(function);
        self.registry.put(MemoKey::new(kind, chain), id);
        id
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn into_functions(self) -> Vec<AccessorFn> {
        self.functions
    }
}
