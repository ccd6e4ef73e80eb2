/* Group planning for batch accessors: hierarchy normalization and factoring
 * of field sets by their first hop */

use super::chain::{describe_chain, FieldSet, Step};
use crate::errors::{CompileError, CompileResult};
use crate::model::{ClassId, ClassRegistry};
use indexmap::IndexMap;

/* Fields sharing a first hop, with that hop stripped off their chains */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundGroup {
    pub step: Step,
    pub fields: FieldSet,
}

/// One level of the group tree, ready to be compiled into a batch function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    /* Class the batch function is parameterized over */
    pub class: ClassId,
    /* Single-step fields: field name -> its only step */
    pub direct: IndexMap<String, Step>,
    /* Wildcard group for ancestor-declared fields on the same object */
    pub self_group: Option<CompoundGroup>,
    /* Embedded groups, in order of first appearance */
    pub compound: Vec<CompoundGroup>,
}

/// Routes a mixed-ancestry field set through its most-derived owner class.
///
/// When the chains start on more than one class, every chain whose first
/// owner is not the most-derived one gets a wildcard step for that class
/// prepended. Returns the class the whole set can now be compiled against.
pub fn mark_parent_chains(
    classes: &ClassRegistry,
    prefix: &[Step],
    fields: &mut FieldSet,
) -> CompileResult<Option<ClassId>> {
    let mut owners: Vec<ClassId> = Vec::new();
    for chain in fields.values() {
        if let Some(first) = chain.first() {
            if !owners.contains(&first.owner) {
                owners.push(first.owner);
            }
        }
    }
    match owners.len() {
        0 => return Ok(None),
        1 => return Ok(Some(owners[0])),
        _ => {}
    }

    let childmost = classes.most_derived(&owners).ok_or_else(|| {
        CompileError::AmbiguousHierarchy {
            prefix: describe_chain(classes, prefix),
            classes: owners.iter().map(|id| classes.name(*id).to_string()).collect(),
        }
    })?;

    for chain in fields.values_mut() {
        if chain.first().is_some_and(|first| first.owner != childmost) {
            chain.insert(0, Step::wildcard(childmost));
        }
    }
    Ok(Some(childmost))
}

/// Removes every multi-step chain from `fields` and groups them by first step.
///
/// Single-step chains stay in `fields`. Each group holds its members' chains
/// with the shared first step stripped off.
pub fn extract_compound_chains(fields: &mut FieldSet) -> IndexMap<Step, CompoundGroup> {
    let mut groups: IndexMap<Step, CompoundGroup> = IndexMap::new();
    let compound: Vec<String> = fields
        .iter()
        .filter(|(_, chain)| chain.len() > 1)
        .map(|(field, _)| field.clone())
        .collect();

    for field in compound {
        let Some(mut chain) = fields.shift_remove(&field) else {
            continue;
        };
        let first = chain.remove(0);
        groups
            .entry(first.clone())
            .or_insert_with(|| CompoundGroup {
                step: first,
                fields: FieldSet::new(),
            })
            .fields
            .insert(field, chain);
    }
    groups
}

/// Normalizes and partitions one field set. `fields` must not be empty.
pub fn plan_group(
    classes: &ClassRegistry,
    prefix: &[Step],
    mut fields: FieldSet,
) -> CompileResult<GroupPlan> {
    let class = mark_parent_chains(classes, prefix, &mut fields)?.ok_or_else(|| {
        CompileError::InvalidChain {
            chain: describe_chain(classes, prefix),
            reason: "cannot plan an empty field set",
        }
    })?;
    let groups = extract_compound_chains(&mut fields);

    let mut direct = IndexMap::with_capacity(fields.len());
    for (field, mut chain) in fields {
        match chain.pop() {
            Some(step) if chain.is_empty() => {
                direct.insert(field, step);
            }
            _ => {
                return Err(CompileError::InvalidChain {
                    chain: field,
                    reason: "direct field must have exactly one step",
                });
            }
        }
    }

    let mut self_group = None;
    let mut compound = Vec::with_capacity(groups.len());
    for (step, group) in groups {
        if step.is_wildcard() && step.owner == class {
            self_group = Some(group);
        } else {
            compound.push(group);
        }
    }

    Ok(GroupPlan {
        class,
        direct,
        self_group,
        compound,
    })
}
