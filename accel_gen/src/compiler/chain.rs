/* Field chains: flattened storage paths from a record down to a leaf slot */

use crate::errors::{CompileError, CompileResult};
use crate::model::{ClassId, ClassRegistry, SlotId};
use accel_types::{PropertyDescriptor, RecordMapping};
use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};

/* What a step does once it is on an instance of its owner */
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "hop", rename_all = "kebab-case")]
pub enum Hop {
    /* Read or write one slot declared on the owner */
    Slot {
        name: String,
        slot: SlotId,
        embedded: Option<ClassId>,
    },

    /* Stay on the same object, viewed as the owner class */
    Wildcard,
}

/// One hop of a chain: a property on a specific owner class.
///
/// The owner is part of the identity: two classes in one hierarchy may declare
/// properties with the same name that live in different slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    pub owner: ClassId,
    #[serde(flatten)]
    pub hop: Hop,
}

impl Step {
    pub fn slot(owner: ClassId, name: impl Into<String>, slot: SlotId, embedded: Option<ClassId>) -> Self {
        Self {
            owner,
            hop: Hop::Slot {
                name: name.into(),
                slot,
                embedded,
            },
        }
    }

    pub fn wildcard(owner: ClassId) -> Self {
        Self {
            owner,
            hop: Hop::Wildcard,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.hop, Hop::Wildcard)
    }

    pub fn name(&self) -> &str {
        match &self.hop {
            Hop::Slot { name, .. } => name,
            Hop::Wildcard => "*",
        }
    }

    pub fn slot_id(&self) -> Option<SlotId> {
        match &self.hop {
            Hop::Slot { slot, .. } => Some(*slot),
            Hop::Wildcard => None,
        }
    }

    pub fn embedded(&self) -> Option<ClassId> {
        match &self.hop {
            Hop::Slot { embedded, .. } => *embedded,
            Hop::Wildcard => None,
        }
    }
}

/* Non-empty by construction: the resolver never yields an empty chain and the
 * planner only strips the first step off chains with more than one step. */
pub type FieldChain = Vec<Step>;

/* Field name -> chain, in mapping order */
pub type FieldSet = IndexMap<String, FieldChain>;

/* Human-readable chain rendering for logs, errors and listings */
pub fn describe_chain(classes: &ClassRegistry, chain: &[Step]) -> String {
    if chain.is_empty() {
        return "<root>".to_string();
    }
    chain
        .iter()
        .map(|step| format!("{}::{}", classes.name(step.owner), step.name()))
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Expands the descriptors of one record mapping into field chains.
pub struct ChainResolver<'a> {
    classes: &'a ClassRegistry,
    mapping: &'a RecordMapping,
}

impl<'a> ChainResolver<'a> {
    pub fn new(classes: &'a ClassRegistry, mapping: &'a RecordMapping) -> Self {
        Self { classes, mapping }
    }

    /* Resolve and validate every mapped field */
    pub fn resolve_all(&self) -> CompileResult<FieldSet> {
        let record = self
            .classes
            .lookup(&self.mapping.class)
            .ok_or_else(|| CompileError::UnknownRecordClass {
                class: self.mapping.class.clone(),
            })?;

        let mut fields = FieldSet::with_capacity(self.mapping.fields.len());
        for field in self.mapping.fields.keys() {
            let chain = self.resolve_field(field)?;
            self.validate(field, record, &chain)?;
            fields.insert(field.clone(), chain);
        }
        Ok(fields)
    }

    pub fn resolve_field(&self, field: &str) -> CompileResult<FieldChain> {
        let id = self
            .mapping
            .fields
            .get(field)
            .ok_or_else(|| CompileError::DanglingProperty {
                field: field.to_string(),
                id: field.to_string(),
            })?;
        let mut chain = Vec::new();
        let mut visiting = Vec::new();
        self.expand(field, id, &mut visiting, &mut chain)?;
        Ok(chain)
    }

    fn expand(
        &self,
        field: &str,
        id: &str,
        visiting: &mut Vec<String>,
        chain: &mut FieldChain,
    ) -> CompileResult<()> {
        if let Some(pos) = visiting.iter().position(|v| v == id) {
            let mut cycle = visiting[pos..].to_vec();
            cycle.push(id.to_string());
            return Err(CompileError::CyclicEmbedding {
                field: field.to_string(),
                cycle,
            });
        }
        let descriptor =
            self.mapping
                .descriptor(id)
                .ok_or_else(|| CompileError::DanglingProperty {
                    field: field.to_string(),
                    id: id.to_string(),
                })?;

        match descriptor {
            PropertyDescriptor::Direct { class, property } => {
                chain.push(self.direct_step(field, class, property)?);
            }
            PropertyDescriptor::Embedded { parent, child } => {
                visiting.push(id.to_string());
                self.expand(field, parent, visiting, chain)?;
                self.expand(field, child, visiting, chain)?;
                visiting.pop();
            }
        }
        Ok(())
    }

    fn direct_step(&self, field: &str, class: &str, property: &str) -> CompileResult<Step> {
        let owner = self
            .classes
            .lookup(class)
            .ok_or_else(|| CompileError::UnknownClass {
                field: field.to_string(),
                class: class.to_string(),
            })?;
        let slot = self
            .classes
            .slot_of(owner, property)
            .ok_or_else(|| CompileError::UnknownProperty {
                field: field.to_string(),
                class: class.to_string(),
                property: property.to_string(),
            })?;
        let embedded = self.classes.slot(owner, slot).and_then(|info| info.embedded);
        Ok(Step::slot(owner, property, slot, embedded))
    }

    /* Every hop must be reachable from the one before it: the record (or the
     * value object reached so far) has to be the step's owner or a subclass of it */
    fn validate(&self, field: &str, record: ClassId, chain: &[Step]) -> CompileResult<()> {
        let mut current = record;
        let last = chain.len().saturating_sub(1);
        for (idx, step) in chain.iter().enumerate() {
            if !self.classes.is_subclass_of(current, step.owner) {
                return Err(CompileError::BrokenChain {
                    field: field.to_string(),
                    expected: self.classes.name(step.owner).to_string(),
                    found: self.classes.name(current).to_string(),
                });
            }
            if idx == last {
                break;
            }
            current = step.embedded().ok_or_else(|| CompileError::NotEmbedded {
                field: field.to_string(),
                class: self.classes.name(step.owner).to_string(),
                property: step.name().to_string(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_types::{ClassDef, PropertyDef};

    fn classes() -> ClassRegistry {
        ClassRegistry::build(&[
            ClassDef::new("Order")
                .with_property(PropertyDef::scalar("id"))
                .with_property(PropertyDef::embedded("shipping", "Address")),
            ClassDef::new("Address")
                .with_property(PropertyDef::scalar("city"))
                .with_property(PropertyDef::embedded("geo", "Point")),
            ClassDef::new("Point")
                .with_property(PropertyDef::scalar("lat"))
                .with_property(PropertyDef::scalar("lng")),
            ClassDef::new("Invoice").with_property(PropertyDef::scalar("total")),
        ])
        .unwrap()
    }

    fn mapping() -> RecordMapping {
        RecordMapping::new("Order")
            .with_direct_field("id", "Order", "id")
            .with_property("Order.shipping", PropertyDescriptor::direct("Order", "shipping"))
            .with_property("Address.geo", PropertyDescriptor::direct("Address", "geo"))
            .with_property("Point.lat", PropertyDescriptor::direct("Point", "lat"))
            .with_property("geo.lat", PropertyDescriptor::embedded("Address.geo", "Point.lat"))
            .with_property(
                "shipping.geo.lat",
                PropertyDescriptor::embedded("Order.shipping", "geo.lat"),
            )
            .with_field("shipping.geo.lat", "shipping.geo.lat")
    }

    #[test]
    fn direct_field_is_single_step() {
        let classes = classes();
        let mapping = mapping();
        let resolver = ChainResolver::new(&classes, &mapping);
        let chain = resolver.resolve_field("id").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].owner, classes.lookup("Order").unwrap());
        assert_eq!(chain[0].name(), "id");
    }

    #[test]
    fn embedded_field_flattens_recursively() {
        let classes = classes();
        let mapping = mapping();
        let resolver = ChainResolver::new(&classes, &mapping);
        let chain = resolver.resolve_field("shipping.geo.lat").unwrap();
        assert_eq!(
            describe_chain(&classes, &chain),
            "Order::shipping / Address::geo / Point::lat"
        );
        assert_eq!(chain[0].embedded(), classes.lookup("Address"));

        let fields = resolver.resolve_all().unwrap();
        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec!["id", "shipping.geo.lat"]
        );
    }

    #[test]
    fn left_nested_embedding_flattens_the_same_way() {
        let classes = classes();
        let mapping = RecordMapping::new("Order")
            .with_property("Order.shipping", PropertyDescriptor::direct("Order", "shipping"))
            .with_property("Address.geo", PropertyDescriptor::direct("Address", "geo"))
            .with_property("Point.lat", PropertyDescriptor::direct("Point", "lat"))
            .with_property(
                "shipping.geo",
                PropertyDescriptor::embedded("Order.shipping", "Address.geo"),
            )
            .with_property("lat", PropertyDescriptor::embedded("shipping.geo", "Point.lat"))
            .with_field("shipping.geo.lat", "lat");
        let chain = ChainResolver::new(&classes, &mapping)
            .resolve_field("shipping.geo.lat")
            .unwrap();
        assert_eq!(
            describe_chain(&classes, &chain),
            "Order::shipping / Address::geo / Point::lat"
        );
    }

    #[test]
    fn cyclic_embedding_names_field() {
        let classes = classes();
        let mapping = RecordMapping::new("Order")
            .with_property("a", PropertyDescriptor::embedded("b", "Order.id"))
            .with_property("b", PropertyDescriptor::embedded("a", "Order.id"))
            .with_field("loop", "a");
        let err = ChainResolver::new(&classes, &mapping)
            .resolve_all()
            .unwrap_err();
        match err {
            CompileError::CyclicEmbedding { field, cycle } => {
                assert_eq!(field, "loop");
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dangling_reference_is_malformed() {
        let classes = classes();
        let mapping = RecordMapping::new("Order")
            .with_property("x", PropertyDescriptor::embedded("Order.shipping", "missing"))
            .with_field("x", "x");
        let err = ChainResolver::new(&classes, &mapping)
            .resolve_all()
            .unwrap_err();
        assert!(err.is_malformed_metadata());
        assert!(matches!(err, CompileError::DanglingProperty { ref id, .. } if id == "Order.shipping"));
    }

    #[test]
    fn rejects_navigation_through_scalar() {
        let classes = classes();
        let mapping = RecordMapping::new("Order")
            .with_property("Order.id", PropertyDescriptor::direct("Order", "id"))
            .with_property("Address.city", PropertyDescriptor::direct("Address", "city"))
            .with_property("bad", PropertyDescriptor::embedded("Order.id", "Address.city"))
            .with_field("bad", "bad");
        let err = ChainResolver::new(&classes, &mapping)
            .resolve_all()
            .unwrap_err();
        assert!(matches!(err, CompileError::NotEmbedded { ref property, .. } if property == "id"));
    }

    #[test]
    fn rejects_step_on_unrelated_class() {
        let classes = classes();
        let mapping = RecordMapping::new("Order").with_direct_field("total", "Invoice", "total");
        let err = ChainResolver::new(&classes, &mapping)
            .resolve_all()
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::BrokenChain { ref expected, ref found, .. }
                if expected == "Invoice" && found == "Order"
        ));
    }

    #[test]
    fn unknown_class_and_property() {
        let classes = classes();
        let mapping = RecordMapping::new("Order").with_direct_field("x", "Nope", "x");
        assert!(matches!(
            ChainResolver::new(&classes, &mapping).resolve_all(),
            Err(CompileError::UnknownClass { .. })
        ));

        let mapping = RecordMapping::new("Order").with_direct_field("x", "Order", "nope");
        assert!(matches!(
            ChainResolver::new(&classes, &mapping).resolve_all(),
            Err(CompileError::UnknownProperty { .. })
        ));

        let mapping = RecordMapping::new("Ghost");
        assert!(matches!(
            ChainResolver::new(&classes, &mapping).resolve_all(),
            Err(CompileError::UnknownRecordClass { .. })
        ));
    }
}
