//! Include resolution and section provenance.
//!
//! Walks a root config file and everything it includes, depth first, and
//! records for every section name the files that declare it.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ini;
use crate::paths::absolute_path;

/// Section name → files that declared it, in discovery order.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProvenanceMap {
    sections: BTreeMap<String, Vec<PathBuf>>,
}

impl ProvenanceMap {
    /// Append `file` to the sources of `section`.
    pub fn record(&mut self, section: &str, file: &Path) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .push(file.to_path_buf());
    }

    pub fn get(&self, section: &str) -> Option<&[PathBuf]> {
        self.sections.get(section).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.sections
            .iter()
            .map(|(name, files)| (name.as_str(), files.as_slice()))
    }
}

/// Build the provenance map for `root` and all files it transitively includes.
///
/// Within each entry, a file's own headers come before anything it
/// includes, includes are followed in statement order and each pattern's
/// matches in sorted order. A file already on the active include path is
/// skipped; the same file reached again through a sibling include is
/// walked again.
pub fn resolve(root: &Path) -> Result<ProvenanceMap> {
    let root = absolute_path(root).map_err(|source| Error::Read {
        path: root.to_path_buf(),
        source,
    })?;

    let mut active = HashSet::new();
    let mut provenance = ProvenanceMap::default();
    visit(&root, &mut active, &mut provenance)?;

    debug!(
        root = %root.display(),
        sections = provenance.len(),
        "resolved config provenance"
    );
    Ok(provenance)
}

fn visit(
    path: &Path,
    active: &mut HashSet<PathBuf>,
    provenance: &mut ProvenanceMap,
) -> Result<()> {
    active.insert(path.to_path_buf());
    let result = visit_file(path, active, provenance);
    active.remove(path);
    result
}

fn visit_file(
    path: &Path,
    active: &mut HashSet<PathBuf>,
    provenance: &mut ProvenanceMap,
) -> Result<()> {
    let content = read_config(path)?;

    let doc = ini::parse(&content);
    for name in doc.section_names() {
        provenance.record(name, path);
    }
    if !doc.malformed.is_empty() {
        debug!(
            file = %path.display(),
            lines = ?doc.malformed,
            "skipped malformed lines"
        );
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("/"));
    for pattern in ini::include_directives(&content) {
        for included in expand_include(base_dir, pattern)? {
            if active.contains(&included) {
                debug!(
                    file = %included.display(),
                    from = %path.display(),
                    "skipping recursive include"
                );
                continue;
            }
            visit(&included, active, provenance)?;
        }
    }

    Ok(())
}

/// Read a config file fully, mapping failures to [`Error::Read`].
pub fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Expand an include pattern relative to `base_dir`.
///
/// Returns the matching regular files, normalized and sorted. `**` matches
/// across directories; `*` does not cross a separator and names starting
/// with `.` must be matched literally. No match is not an error.
pub fn expand_include(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        let base = Pattern::escape(&base_dir.to_string_lossy());
        Path::new(&base).join(pattern).to_string_lossy().into_owned()
    };

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let entries = glob::glob_with(&full, options).map_err(|source| Error::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?;
        if path.is_file() {
            let path = absolute_path(&path).map_err(|source| Error::Read {
                path: path.clone(),
                source,
            })?;
            files.push(path);
        }
    }
    files.sort();
    files.dedup();

    Ok(files)
}
