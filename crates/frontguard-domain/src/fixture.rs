//! Fixture definition and identity.

use crate::directive::{expand, parse_directives, Directives, Substitutions};
use crate::error::Result;
use crate::outcome::Outcome;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A source fragment plus the outcome the front-end must produce for it.
///
/// Immutable once loaded; discarded after its verdict is recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fixture {
    /// Path relative to the corpus root, `/`-separated.
    pub id: String,

    /// Location on disk.
    pub path: PathBuf,

    /// Exact file contents, handed to the front-end unchanged.
    pub bytes: Vec<u8>,

    /// Lossy UTF-8 decoding of `bytes`, used for directive parsing.
    pub source: String,

    /// Parsed directives.
    pub directives: Directives,

    /// SHA-256 of the raw bytes.
    pub source_digest: String,
}

impl Fixture {
    /// Build a fixture from its source text, parsing directives.
    pub fn from_source(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        source: impl Into<String>,
    ) -> Result<Self> {
        Self::from_bytes(id, path, source.into().into_bytes())
    }

    /// Build a fixture from raw file contents.
    ///
    /// Invalid UTF-8 is kept as-is in `bytes`; only directive parsing sees
    /// the lossy decoding.
    pub fn from_bytes(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        let source = String::from_utf8_lossy(&bytes).into_owned();
        let directives = parse_directives(&source)?;
        let source_digest = compute_source_digest(&bytes);
        Ok(Self {
            id: id.into(),
            path: path.into(),
            bytes,
            source,
            directives,
            source_digest,
        })
    }

    /// Check that every substitution in the RUN line resolves against `frontends`.
    pub fn check_substitutions(&self, frontends: &BTreeMap<String, Vec<String>>) -> Result<()> {
        let subs = Substitutions {
            source_path: "",
            temp_dir: "",
            frontends,
        };
        expand(&self.directives.run.command, &subs).map(|_| ())
    }

    pub fn expected(&self) -> Outcome {
        self.directives.expected_outcome()
    }

    pub fn expected_diagnostic(&self) -> Option<&str> {
        self.directives.expected_diagnostic.as_deref()
    }

    pub fn is_flaky(&self) -> bool {
        self.directives.flaky.is_some()
    }

    /// File name used for the copy placed in the temporary workspace.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "fixture".to_string())
    }

    /// Short digest (first 12 chars)
    pub fn short_digest(&self) -> &str {
        &self.source_digest[..12.min(self.source_digest.len())]
    }
}

/// Compute SHA-256 hex digest of fixture contents.
pub fn compute_source_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
