use crate::types::ClassDef;
use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};

/* ============================================================================
   Property Descriptors
   ============================================================================ */

/* Where a mapped field is stored.
 *
 * Embedded descriptors refer to other descriptors by id rather than nesting
 * them, the same way a mapping layer shares one property object between every
 * field that goes through it. */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PropertyDescriptor {
    /* A slot declared on `class` */
    Direct { class: String, property: String },

    /* Navigate through the `parent` property, then continue with `child` */
    Embedded { parent: String, child: String },
}

impl PropertyDescriptor {
    pub fn direct(class: impl Into<String>, property: impl Into<String>) -> Self {
        PropertyDescriptor::Direct {
            class: class.into(),
            property: property.into(),
        }
    }

    pub fn embedded(parent: impl Into<String>, child: impl Into<String>) -> Self {
        PropertyDescriptor::Embedded {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

/* ============================================================================
   Record Mappings
   ============================================================================ */

/* Field mapping for one record class */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct RecordMapping {
    /* Record class the fields belong to */
    pub class: String,

    /* Property descriptors keyed by id */
    #[serde(default)]
    pub properties: IndexMap<String, PropertyDescriptor>,

    /* Field name -> id of the descriptor that stores it */
    #[serde(default)]
    pub fields: IndexMap<String, String>,
}

impl RecordMapping {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: IndexMap::new(),
            fields: IndexMap::new(),
        }
    }

    /* Register a descriptor under `id` */
    pub fn with_property(mut self, id: impl Into<String>, descriptor: PropertyDescriptor) -> Self {
        self.properties.insert(id.into(), descriptor);
        self
    }

    /* Map `field` to the descriptor registered under `id` */
    pub fn with_field(mut self, field: impl Into<String>, id: impl Into<String>) -> Self {
        self.fields.insert(field.into(), id.into());
        self
    }

    /* Shorthand for a field stored directly on `class`, using the field name as descriptor id */
    pub fn with_direct_field(
        self,
        field: impl Into<String>,
        class: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        let field = field.into();
        self.with_property(field.clone(), PropertyDescriptor::direct(class, property))
            .with_field(field.clone(), field)
    }

    pub fn descriptor(&self, id: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(id)
    }
}

/* ============================================================================
   Schema File
   ============================================================================ */

/* Complete schema file: class declarations plus record mappings */
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct SchemaFile {
    #[serde(default)]
    pub classes: Vec<ClassDef>,

    #[serde(default)]
    pub records: Vec<RecordMapping>,
}

impl SchemaFile {
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(content)
    }

    pub fn record(&self, class: &str) -> Option<&RecordMapping> {
        self.records.iter().find(|r| r.class == class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
classes:
  - name: Order
    properties:
      - name: id
      - name: shipping
        embedded: Address
  - name: Address
    properties:
      - name: city
records:
  - class: Order
    properties:
      id: { kind: direct, class: Order, property: id }
      Order.shipping: { kind: direct, class: Order, property: shipping }
      Address.city: { kind: direct, class: Address, property: city }
      shipping.city: { kind: embedded, parent: Order.shipping, child: Address.city }
    fields:
      id: id
      shipping.city: shipping.city
"#;

    #[test]
    fn parses_schema_yaml() {
        let schema = SchemaFile::from_yaml_str(SCHEMA).unwrap();
        assert_eq!(schema.classes.len(), 2);
        assert_eq!(
            schema.classes[0].property("shipping").unwrap().embedded.as_deref(),
            Some("Address")
        );

        let record = schema.record("Order").unwrap();
        assert_eq!(
            record.fields.keys().collect::<Vec<_>>(),
            vec!["id", "shipping.city"]
        );
        assert_eq!(
            record.descriptor("shipping.city"),
            Some(&PropertyDescriptor::embedded("Order.shipping", "Address.city"))
        );
    }

    #[test]
    fn builder_matches_parsed_mapping() {
        let built = RecordMapping::new("Order")
            .with_direct_field("id", "Order", "id")
            .with_property("Order.shipping", PropertyDescriptor::direct("Order", "shipping"))
            .with_property("Address.city", PropertyDescriptor::direct("Address", "city"))
            .with_property(
                "shipping.city",
                PropertyDescriptor::embedded("Order.shipping", "Address.city"),
            )
            .with_field("shipping.city", "shipping.city");

        let schema = SchemaFile::from_yaml_str(SCHEMA).unwrap();
        assert_eq!(schema.record("Order"), Some(&built));
    }

    #[test]
    fn missing_record_is_none() {
        let schema = SchemaFile::from_yaml_str(SCHEMA).unwrap();
        assert!(schema.record("Invoice").is_none());
    }
}
