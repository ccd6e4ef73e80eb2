/* Compilation driver: one pass per record type */

use super::chain::{ChainResolver, FieldSet};
use super::emitter::Emitter;
use super::ir::AccessorProgram;
use crate::artifact::ArtifactSink;
use crate::errors::{CompileError, CompileResult};
use crate::model::ClassRegistry;
use accel_types::RecordMapping;
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Source of class layouts and record mappings.
pub trait MetadataProvider {
    fn classes(&self) -> &ClassRegistry;

    /* None when the record class has no mapping */
    fn record_mapping(&self, class: &str) -> Option<&RecordMapping>;
}

/* Options for artifact generation */
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /* Also write a pseudo-code listing next to the JSON artifact */
    pub emit_listing: bool,
}

pub struct AccessorCompiler<'a, P: MetadataProvider + ?Sized> {
    provider: &'a P,
    options: CompileOptions,
}

impl<'a, P: MetadataProvider + ?Sized> AccessorCompiler<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(provider: &'a P, options: CompileOptions) -> Self {
        Self { provider, options }
    }

    /// Resolves the field chains of `record` without compiling anything.
    pub fn resolve_chains(&self, record: &str) -> CompileResult<Option<FieldSet>> {
        let Some(mapping) = self.provider.record_mapping(record) else {
            return Ok(None);
        };
        ChainResolver::new(self.provider.classes(), mapping)
            .resolve_all()
            .map(Some)
    }

    /// Compiles every accessor for `record`.
    ///
    /// Returns `Ok(None)` when the provider has no mapping for the record. Any
    /// error aborts the whole pass; nothing is returned for the fields that
    /// compiled before it.
    pub fn compile(&self, record: &str) -> CompileResult<Option<AccessorProgram>> {
        let Some(fields) = self.resolve_chains(record)? else {
            warn!(record, "no mapping for record class, skipping");
            return Ok(None);
        };
        let classes = self.provider.classes();
        let record_class_id = classes
            .lookup(record)
            .ok_or_else(|| CompileError::UnknownRecordClass {
                class: record.to_string(),
            })?;
        debug!(record, fields = fields.len(), "compiling accessors");

        let mut emitter = Emitter::new(classes);
        let mut getters = IndexMap::with_capacity(fields.len());
        let mut setters = IndexMap::with_capacity(fields.len());
        for (field, chain) in &fields {
            getters.insert(field.clone(), emitter.emit_getter(chain)?);
            setters.insert(field.clone(), emitter.emit_setter(chain)?);
        }
        let batch_getter = emitter.emit_batch_getter(&[], fields.clone())?;
        let batch_setter = emitter.emit_batch_setter(&[], fields)?;

        let program = AccessorProgram {
            record_class: record.to_string(),
            record_class_id,
            functions: emitter.into_functions(),
            getters,
            setters,
            batch_getter,
            batch_setter,
        };
        debug!(record, functions = program.len(), "compiled accessors");
        Ok(Some(program))
    }

    /// Compiles `record` and writes its artifacts to `sink`.
    ///
    /// Returns `false` when the record has no mapping and nothing was written.
    pub fn generate(&self, record: &str, sink: &mut dyn ArtifactSink) -> CompileResult<bool> {
        let Some(program) = self.compile(record)? else {
            return Ok(false);
        };
        let json = program.to_json().map_err(|source| CompileError::Serialize {
            record: record.to_string(),
            source,
        })?;

        let base = artifact_base_name(record);
        if self.options.emit_listing {
            let listing = program.listing(self.provider.classes());
            write(sink, &format!("{}.listing.txt", base), listing.as_bytes())?;
        }

        /* The program artifact goes last: it only exists once the whole pass succeeded */
        let artifact = format!("{}.accessors.json", base);
        write(sink, &artifact, json.as_bytes())?;
        debug!(record, artifact = %artifact, "wrote accessor artifact");
        Ok(true)
    }
}

fn write(sink: &mut dyn ArtifactSink, artifact: &str, contents: &[u8]) -> CompileResult<()> {
    sink.write_artifact(artifact, contents)
        .map_err(|source| CompileError::ArtifactWrite {
            artifact: artifact.to_string(),
            source,
        })
}

/* `App\Model\Order` -> `app_model_order` */
pub fn artifact_base_name(record: &str) -> String {
    let mut name = String::with_capacity(record.len());
    for ch in record.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch.to_ascii_lowercase());
        } else if !name.ends_with('_') && !name.is_empty() {
            name.push('_');
        }
    }
    while name.ends_with('_') {
        name.pop();
    }
    if name.is_empty() {
        name.push_str("record");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::MemorySink;
    use crate::compiler::ir::AccessorFn;
    use accel_types::{ClassDef, PropertyDef, PropertyDescriptor};
    use std::collections::HashMap;

    struct Provider {
        classes: ClassRegistry,
        records: HashMap<String, RecordMapping>,
    }

    impl MetadataProvider for Provider {
        fn classes(&self) -> &ClassRegistry {
            &self.classes
        }

        fn record_mapping(&self, class: &str) -> Option<&RecordMapping> {
            self.records.get(class)
        }
    }

    fn provider() -> Provider {
        let classes = ClassRegistry::build(&[
            ClassDef::new("Order")
                .with_property(PropertyDef::scalar("id"))
                .with_property(PropertyDef::embedded("shipping", "Address")),
            ClassDef::new("Address")
                .with_property(PropertyDef::scalar("city"))
                .with_property(PropertyDef::scalar("zip")),
            ClassDef::new("Unmapped"),
        ])
        .unwrap();
        let mapping = RecordMapping::new("Order")
            .with_direct_field("id", "Order", "id")
            .with_property("Order.shipping", PropertyDescriptor::direct("Order", "shipping"))
            .with_property("Address.city", PropertyDescriptor::direct("Address", "city"))
            .with_property("Address.zip", PropertyDescriptor::direct("Address", "zip"))
            .with_property(
                "city",
                PropertyDescriptor::embedded("Order.shipping", "Address.city"),
            )
            .with_property("zip", PropertyDescriptor::embedded("Order.shipping", "Address.zip"))
            .with_field("city", "city")
            .with_field("zip", "zip");
        let mut records = HashMap::new();
        records.insert("Order".to_string(), mapping);
        Provider { classes, records }
    }

    #[test]
    fn compiles_all_public_accessors() {
        let provider = provider();
        let program = AccessorCompiler::new(&provider).compile("Order").unwrap().unwrap();

        assert_eq!(program.record_class, "Order");
        assert_eq!(program.fields().collect::<Vec<_>>(), vec!["id", "city", "zip"]);
        assert_eq!(program.setters.len(), 3);
        assert!(matches!(
            program.function(program.batch_getter),
            Some(AccessorFn::BatchGet(_))
        ));
        assert!(matches!(
            program.function(program.batch_setter),
            Some(AccessorFn::BatchSet(_))
        ));
        /* Every function only calls functions emitted before it */
        for (idx, function) in program.functions.iter().enumerate() {
            assert!(function.references().iter().all(|r| r.index() < idx));
        }
    }

    #[test]
    fn shared_prefix_is_emitted_once() {
        let provider = provider();
        let program = AccessorCompiler::new(&provider).compile("Order").unwrap().unwrap();
        let shipping_getters = program
            .functions
            .iter()
            .filter(|f| matches!(f, AccessorFn::Get(g) if g.property == "shipping"))
            .count();
        assert_eq!(shipping_getters, 1);
    }

    #[test]
    fn unmapped_record_is_skipped() {
        let provider = provider();
        let compiler = AccessorCompiler::new(&provider);
        assert!(compiler.compile("Unmapped").unwrap().is_none());

        let mut sink = MemorySink::new();
        assert!(!compiler.generate("Unmapped", &mut sink).unwrap());
        assert!(sink.is_empty());
    }

    #[test]
    fn generate_writes_json_and_listing() {
        let provider = provider();
        let compiler = AccessorCompiler::with_options(&provider, CompileOptions { emit_listing: true });
        let mut sink = MemorySink::new();
        assert!(compiler.generate("Order", &mut sink).unwrap());
        assert_eq!(
            sink.names().collect::<Vec<_>>(),
            vec!["order.listing.txt", "order.accessors.json"]
        );

        let json = std::str::from_utf8(sink.get("order.accessors.json").unwrap()).unwrap();
        let program = AccessorProgram::from_json(json).unwrap();
        assert_eq!(program, compiler.compile("Order").unwrap().unwrap());
    }

    /* Accepts the first write, fails every later one */
    #[derive(Default)]
    struct FailAfterFirst {
        inner: MemorySink,
    }

    impl ArtifactSink for FailAfterFirst {
        fn write_artifact(&mut self, name: &str, contents: &[u8]) -> std::io::Result<()> {
            if !self.inner.is_empty() {
                return Err(std::io::Error::other("disk full"));
            }
            self.inner.write_artifact(name, contents)
        }
    }

    #[test]
    fn failed_write_leaves_no_program_artifact() {
        let provider = provider();
        let compiler = AccessorCompiler::with_options(&provider, CompileOptions { emit_listing: true });
        let mut sink = FailAfterFirst::default();

        let err = compiler.generate("Order", &mut sink).unwrap_err();
        match &err {
            CompileError::ArtifactWrite { artifact, .. } => assert_eq!(artifact, "order.accessors.json"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(sink.inner.get("order.accessors.json").is_none());
    }

    #[test]
    fn malformed_mapping_aborts_pass() {
        let mut provider = provider();
        provider.records.insert(
            "Order".to_string(),
            RecordMapping::new("Order").with_field("ghost", "missing"),
        );
        let err = AccessorCompiler::new(&provider).compile("Order").unwrap_err();
        assert!(err.is_malformed_metadata());
    }

    #[test]
    fn artifact_names_are_sanitized() {
        assert_eq!(artifact_base_name("Order"), "order");
        assert_eq!(artifact_base_name("App\\Model\\Order"), "app_model_order");
        assert_eq!(artifact_base_name("::"), "record");
    }
}
