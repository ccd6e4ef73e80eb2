/* Single-field getter and setter emission */

use super::chain::{describe_chain, Hop, Step};
use super::emitter::Emitter;
use super::ir::{AccessorFn, FunctionId, GetFn, PreviousHop, SetFn};
use super::registry::OpKind;
use crate::errors::{CompileError, CompileResult};
use crate::model::SlotId;

impl Emitter<'_> {
    /// Emits (or reuses) the getter for `chain`.
    ///
    /// The getter for `chain[..n-1]` is emitted first and called to reach the
    /// intermediate object; an absent intermediate short-circuits to null.
    pub fn emit_getter(&mut self, chain: &[Step]) -> CompileResult<FunctionId> {
        if let Some(id) = self.lookup(OpKind::Get, chain) {
            return Ok(id);
        }
        let (last, prefix) = self.split_chain(chain)?;
        let previous = if prefix.is_empty() {
            None
        } else {
            Some(self.emit_getter(prefix)?)
        };
        let (property, slot) = self.leaf_slot(chain, last)?;

        let function = AccessorFn::Get(GetFn {
            name: self.function_name(OpKind::Get, chain),
            owner: last.owner,
            property,
            slot,
            previous,
        });
        Ok(self.push(OpKind::Get, chain, function))
    }

    /// Emits (or reuses) the setter for `chain`.
    ///
    /// Setters with a prefix reuse both the prefix getter and the prefix
    /// setter: a missing intermediate is instantiated empty and written back
    /// through the prefix setter before the leaf is stored.
    pub fn emit_setter(&mut self, chain: &[Step]) -> CompileResult<FunctionId> {
        if let Some(id) = self.lookup(OpKind::Set, chain) {
            return Ok(id);
        }
        let (last, prefix) = self.split_chain(chain)?;
        let previous = match prefix.last() {
            None => None,
            Some(hop) => {
                let getter = self.emit_getter(prefix)?;
                let setter = self.emit_setter(prefix)?;
                let class = hop.embedded().ok_or_else(|| CompileError::InvalidChain {
                    chain: describe_chain(self.classes, chain),
                    reason: "intermediate hop is not an embedded property",
                })?;
                Some(PreviousHop {
                    getter,
                    setter,
                    class,
                })
            }
        };
        let (property, slot) = self.leaf_slot(chain, last)?;

        let function = AccessorFn::Set(SetFn {
            name: self.function_name(OpKind::Set, chain),
            owner: last.owner,
            property,
            slot,
            previous,
        });
        Ok(self.push(OpKind::Set, chain, function))
    }

    fn split_chain<'c>(&self, chain: &'c [Step]) -> CompileResult<(&'c Step, &'c [Step])> {
        chain.split_last().ok_or_else(|| CompileError::InvalidChain {
            chain: describe_chain(self.classes, chain),
            reason: "empty chain",
        })
    }

    fn leaf_slot(&self, chain: &[Step], step: &Step) -> CompileResult<(String, SlotId)> {
        match &step.hop {
            Hop::Slot { name, slot, .. } => Ok((name.clone(), *slot)),
            Hop::Wildcard => Err(CompileError::InvalidChain {
                chain: describe_chain(self.classes, chain),
                reason: "wildcard steps cannot be read or written directly",
            }),
        }
    }
}
