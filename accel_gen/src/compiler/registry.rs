use super::chain::Step;
use super::ir::FunctionId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Get,
    Set,
    BatchGet,
    BatchSet,
}

impl OpKind {
    pub fn prefix(self) -> &'static str {
        match self {
            OpKind::Get => "get",
            OpKind::Set => "set",
            OpKind::BatchGet => "bget",
            OpKind::BatchSet => "bset",
        }
    }
}

/* Keys hold the steps themselves, so distinct chains can never collide */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    pub kind: OpKind,
    pub chain: Vec<Step>,
}

impl MemoKey {
    pub fn new(kind: OpKind, chain: &[Step]) -> Self {
        Self {
            kind,
            chain: chain.to_vec(),
        }
    }
}

/// Memo table of already-emitted functions for one compilation pass.
///
/// Emitters check it before generating anything, so every distinct
/// `(kind, chain)` pair is emitted at most once and longer chains reuse the
/// function of their shared prefix.
#[derive(Debug, Default)]
pub struct ChainRegistry {
    lookup: HashMap<MemoKey, FunctionId>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &MemoKey) -> Option<FunctionId> {
        self.lookup.get(key).copied()
    }

    pub fn put(&mut self, key: MemoKey, id: FunctionId) {
        self.lookup.insert(key, id);
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}
