use super::link::{link, LinkedAccessors};
use super::{BatchGetter, BatchSetter, Getter, Setter};
use crate::compiler::ir::AccessorProgram;
use crate::errors::LinkError;
use crate::model::Instantiator;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Compiled accessors for one record type, published on first `initialize`.
///
/// Until then every accessor reads as `None`. Later calls to `initialize`
/// return immediately without linking again.
pub struct FastAccessors {
    program: AccessorProgram,
    instantiator: Arc<dyn Instantiator>,
    init_lock: Mutex<()>,
    linked: OnceLock<LinkedAccessors>,
}

impl FastAccessors {
    pub fn new(program: AccessorProgram, instantiator: Arc<dyn Instantiator>) -> Self {
        Self {
            program,
            instantiator,
            init_lock: Mutex::new(()),
            linked: OnceLock::new(),
        }
    }

    pub fn initialize(&self) -> Result<(), LinkError> {
        if self.linked.get().is_some() {
            return Ok(());
        }
        let _guard = self.init_lock.lock();
        /* Another caller may have finished while we waited for the lock */
        if self.linked.get().is_some() {
            return Ok(());
        }
        let linked = link(&self.program, Arc::clone(&self.instantiator))?;
        let _ = self.linked.set(linked);
        debug!(record = %self.program.record_class, "initialized fast accessors");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.linked.get().is_some()
    }

    pub fn program(&self) -> &AccessorProgram {
        &self.program
    }

    pub fn fast_getters(&self) -> Option<&IndexMap<String, Getter>> {
        self.linked.get().map(|linked| &linked.getters)
    }

    pub fn fast_setters(&self) -> Option<&IndexMap<String, Setter>> {
        self.linked.get().map(|linked| &linked.setters)
    }

    pub fn fast_batch_getter(&self) -> Option<&BatchGetter> {
        self.linked.get().map(|linked| &linked.batch_getter)
    }

    pub fn fast_batch_setter(&self) -> Option<&BatchSetter> {
        self.linked.get().map(|linked| &linked.batch_setter)
    }
}

impl std::fmt::Debug for FastAccessors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastAccessors")
            .field("record", &self.program.record_class)
            .field("functions", &self.program.len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
