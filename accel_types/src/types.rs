use serde_derive::{Deserialize, Serialize};

/* A property declared directly on a class */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct PropertyDef {
    pub name: String,
    /* Class of the value object stored in this property, if it is an embedded one */
    #[serde(default)]
    pub embedded: Option<String>,
}

impl PropertyDef {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            embedded: None,
        }
    }

    pub fn embedded(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            embedded: Some(class.into()),
        }
    }
}

/* A class declaration: its own properties plus an optional single parent */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ClassDef {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /* Properties declared on this class only; inherited ones live on the parent */
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            properties: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }
}
