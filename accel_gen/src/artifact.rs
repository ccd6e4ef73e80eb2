/* Artifact sinks: where compiled accessor programs are written */

use indexmap::IndexMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Destination for generated artifacts.
///
/// A failed write must not leave anything behind under `name` that could be
/// mistaken for a complete artifact.
pub trait ArtifactSink {
    fn write_artifact(&mut self, name: &str, contents: &[u8]) -> io::Result<()>;
}

/// Writes artifacts as files under one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /* Paths written so far, in write order */
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ArtifactSink for DirectorySink {
    fn write_artifact(&mut self, name: &str, contents: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let target = self.root.join(name);
        let staging = self.root.join(format!(".{}.tmp", name));

        /* Stage next to the target so the rename stays on one filesystem */
        if let Err(err) = fs::write(&staging, contents).and_then(|_| fs::rename(&staging, &target)) {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }
        self.written.push(target);
        Ok(())
    }
}

/// Keeps artifacts in memory, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    artifacts: IndexMap<String, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.artifacts.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn write_artifact(&mut self, name: &str, contents: &[u8]) -> io::Result<()> {
        self.artifacts.insert(name.to_string(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn directory_sink_creates_root_and_writes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("out");
        let mut sink = DirectorySink::new(&root);
        sink.write_artifact("order.accessors.json", b"{}").unwrap();

        let path = root.join("order.accessors.json");
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(sink.written(), &[path]);
        /* No staging file left behind */
        assert_eq!(fs::read_dir(&root).unwrap().count(), 1);
    }

    #[test]
    fn directory_sink_overwrites_existing_artifact() {
        let temp = TempDir::new().unwrap();
        let mut sink = DirectorySink::new(temp.path());
        sink.write_artifact("a.json", b"old").unwrap();
        sink.write_artifact("a.json", b"new").unwrap();
        assert_eq!(fs::read_to_string(temp.path().join("a.json")).unwrap(), "new");
    }

    #[test]
    fn directory_sink_failure_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        /* A regular file where the output directory should go */
        let blocker = temp.path().join("blocked");
        fs::write(&blocker, b"").unwrap();

        let mut sink = DirectorySink::new(&blocker);
        assert!(sink.write_artifact("a.json", b"{}").is_err());
        assert!(sink.written().is_empty());
        assert!(!blocker.join("a.json").exists());
    }

    #[test]
    fn memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.write_artifact("b", b"2").unwrap();
        sink.write_artifact("a", b"1").unwrap();
        assert_eq!(sink.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(sink.get("a"), Some(&b"1"[..]));
        assert_eq!(sink.len(), 2);
    }
}
