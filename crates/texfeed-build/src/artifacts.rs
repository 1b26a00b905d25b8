use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// A file produced by the engine, identified by its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArtifact {
    pub path: PathBuf,
    pub fingerprint: String,
}

impl FileArtifact {
    /// Snapshot of `path`, or `None` when it does not exist.
    pub fn probe(path: &Path) -> Option<Self> {
        let bytes = fs::read(path).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            fingerprint: fingerprint(&bytes),
        })
    }

    /// Whether this artifact differs from an earlier snapshot of the same file.
    pub fn changed_since(&self, earlier: Option<&FileArtifact>) -> bool {
        earlier.is_none_or(|earlier| earlier.fingerprint != self.fingerprint)
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
