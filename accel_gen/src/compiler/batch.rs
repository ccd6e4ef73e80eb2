/* Batch getter and setter emission over the group tree */

use super::chain::{describe_chain, FieldSet, Hop, Step};
use super::emitter::Emitter;
use super::ir::{AccessorFn, BatchFn, CompoundAccess, DirectField, FunctionId};
use super::planner::{plan_group, CompoundGroup, GroupPlan};
use super::registry::OpKind;
use crate::errors::{CompileError, CompileResult};

impl Emitter<'_> {
    /// Emits (or reuses) the batch getter for the fields below `prefix`.
    ///
    /// `fields` holds the chains relative to `prefix`. Every compound group is
    /// compiled into its own batch getter first, keyed by `prefix` plus the
    /// group's step, and called from the function emitted here.
    pub fn emit_batch_getter(&mut self, prefix: &[Step], fields: FieldSet) -> CompileResult<FunctionId> {
        self.emit_batch(OpKind::BatchGet, prefix, fields)
    }

    /// Emits (or reuses) the batch setter for the fields below `prefix`.
    pub fn emit_batch_setter(&mut self, prefix: &[Step], fields: FieldSet) -> CompileResult<FunctionId> {
        self.emit_batch(OpKind::BatchSet, prefix, fields)
    }

    fn emit_batch(&mut self, kind: OpKind, prefix: &[Step], fields: FieldSet) -> CompileResult<FunctionId> {
        if let Some(id) = self.lookup(kind, prefix) {
            return Ok(id);
        }

        if fields.is_empty() {
            let name = self.function_name(kind, prefix);
            let function = match kind {
                OpKind::BatchSet => AccessorFn::EmptyBatchSet { name },
                _ => AccessorFn::EmptyBatchGet { name },
            };
            return Ok(self.push(kind, prefix, function));
        }

        let GroupPlan {
            class,
            direct,
            self_group,
            compound,
        } = plan_group(self.classes, prefix, fields)?;

        let self_group = match self_group {
            Some(group) => Some(self.emit_group(kind, prefix, group)?),
            None => None,
        };

        let mut accesses = Vec::with_capacity(compound.len());
        for group in compound {
            let step = group.step.clone();
            let members: Vec<String> = group.fields.keys().cloned().collect();
            let function = self.emit_group(kind, prefix, group)?;
            let (property, slot, embedded) = match step.hop {
                Hop::Slot {
                    name,
                    slot,
                    embedded: Some(embedded),
                } => (name, slot, embedded),
                _ => {
                    return Err(CompileError::InvalidChain {
                        chain: describe_chain(self.classes, &extend(prefix, &step)),
                        reason: "compound group must start with an embedded property",
                    });
                }
            };
            accesses.push(CompoundAccess {
                property,
                slot,
                class: embedded,
                fields: members,
                function,
            });
        }

        let mut directs = Vec::with_capacity(direct.len());
        for (field, step) in direct {
            match step.hop {
                Hop::Slot { name, slot, .. } => directs.push(DirectField {
                    field,
                    property: name,
                    slot,
                }),
                Hop::Wildcard => {
                    return Err(CompileError::InvalidChain {
                        chain: field,
                        reason: "wildcard step cannot end a chain",
                    });
                }
            }
        }

        let body = BatchFn {
            name: self.function_name(kind, prefix),
            class,
            self_group,
            direct: directs,
            compound: accesses,
        };
        let function = match kind {
            OpKind::BatchSet => AccessorFn::BatchSet(body),
            _ => AccessorFn::BatchGet(body),
        };
        Ok(self.push(kind, prefix, function))
    }

    fn emit_group(
        &mut self,
        kind: OpKind,
        prefix: &[Step],
        group: CompoundGroup,
    ) -> CompileResult<FunctionId> {
        let nested = extend(prefix, &group.step);
        self.emit_batch(kind, &nested, group.fields)
    }
}

fn extend(prefix: &[Step], step: &Step) -> Vec<Step> {
    let mut chain = Vec::with_capacity(prefix.len() + 1);
    chain.extend_from_slice(prefix);
    chain.push(step.clone());
    chain
}
