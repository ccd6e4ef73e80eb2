/* Schema loading: YAML class declarations and record mappings */

use crate::compiler::driver::MetadataProvider;
use crate::model::{ClassError, ClassRegistry};
use accel_types::{ClassDef, RecordMapping, SchemaFile};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema '{location}': {message}")]
    Parse { location: String, message: String },

    #[error("record class '{0}' is mapped more than once")]
    DuplicateRecord(String),

    #[error(transparent)]
    Class(#[from] ClassError),
}

/// Merged metadata from one or more schema files.
#[derive(Debug)]
pub struct Schema {
    classes: Arc<ClassRegistry>,
    records: IndexMap<String, RecordMapping>,
}

impl Schema {
    pub fn from_parts(classes: &[ClassDef], records: Vec<RecordMapping>) -> Result<Self, SchemaError> {
        let registry = ClassRegistry::build(classes)?;
        let mut by_class = IndexMap::with_capacity(records.len());
        for record in records {
            if by_class.contains_key(&record.class) {
                return Err(SchemaError::DuplicateRecord(record.class));
            }
            by_class.insert(record.class.clone(), record);
        }
        Ok(Self {
            classes: Arc::new(registry),
            records: by_class,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        let file = parse(content, "<inline>")?;
        Self::from_parts(&file.classes, file.records)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        Self::from_files(&[path.to_path_buf()])
    }

    /// Loads and merges several schema files.
    ///
    /// Classes and records from every file share one namespace; a file listed
    /// twice (after canonicalization) is only read once.
    pub fn from_files(paths: &[PathBuf]) -> Result<Self, SchemaError> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut classes = Vec::new();
        let mut records = Vec::new();
        for path in paths {
            let canonical = path.canonicalize().map_err(|source| SchemaError::Io {
                path: path.clone(),
                source,
            })?;
            if !seen.insert(canonical) {
                debug!(path = %path.display(), "skipping already loaded schema file");
                continue;
            }
            let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
                path: path.clone(),
                source,
            })?;
            let file = parse(&content, &path.display().to_string())?;
            debug!(
                path = %path.display(),
                classes = file.classes.len(),
                records = file.records.len(),
                "loaded schema file"
            );
            classes.extend(file.classes);
            records.extend(file.records);
        }
        Self::from_parts(&classes, records)
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /* Shared handle, usable as the instantiator for linked accessors */
    pub fn class_registry(&self) -> Arc<ClassRegistry> {
        Arc::clone(&self.classes)
    }

    pub fn record_names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn record(&self, class: &str) -> Option<&RecordMapping> {
        self.records.get(class)
    }
}

impl MetadataProvider for Schema {
    fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    fn record_mapping(&self, class: &str) -> Option<&RecordMapping> {
        self.records.get(class)
    }
}

fn parse(content: &str, location: &str) -> Result<SchemaFile, SchemaError> {
    SchemaFile::from_yaml_str(content).map_err(|err| SchemaError::Parse {
        location: location.to_string(),
        message: err.to_string(),
    })
}
