//! Corpus discovery and fixture loading.

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use frontguard_domain::Fixture;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Find every fixture under `root` whose extension is in `extensions`.
///
/// Sorted by path so scheduling is deterministic.
pub fn discover(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(HarnessError::CorpusNotFound(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|wanted| wanted == ext))
            .unwrap_or(false);
        if matches {
            paths.push(entry.into_path());
        }
    }

    paths.sort();
    debug!(root = %root.display(), count = paths.len(), "Discovered fixtures");
    Ok(paths)
}

/// Stable identifier: path relative to the corpus root, `/`-separated.
pub fn fixture_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Read a fixture file and parse its directives.
pub fn load_fixture(root: &Path, path: &Path) -> Result<Fixture> {
    let id = fixture_id(root, path);
    let bytes = std::fs::read(path).map_err(|source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Fixture::from_bytes(id.clone(), path, bytes)
        .map_err(|source| HarnessError::Fixture { fixture: id, source })
}

/// Load a fixture and check its RUN line against the configured front-ends.
pub fn load_checked(root: &Path, path: &Path, config: &HarnessConfig) -> Result<Fixture> {
    let fixture = load_fixture(root, path)?;
    fixture
        .check_substitutions(&config.frontend_commands())
        .map_err(|source| HarnessError::Fixture {
            fixture: fixture.id.clone(),
            source,
        })?;
    Ok(fixture)
}
