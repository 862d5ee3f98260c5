//! Loads a config tree into a [`ConfigStore`] the way the firmware does:
//! files merge in textual order with includes expanded in place, then the
//! persisted SAVE_CONFIG block is applied last.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::autosave;
use super::store::{ConfigStore, MergedConfig};
use crate::error::{Error, Result};
use crate::ini::{self, Segment};
use crate::paths::absolute_path;
use crate::resolver::{expand_include, read_config};

/// The merged configuration together with the file it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    config_file: PathBuf,
    store: ConfigStore,
    overlay_sections: Vec<String>,
}

impl LoadedConfig {
    /// Absolute path of the root config file
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Directory holding the root config file
    pub fn config_dir(&self) -> &Path {
        self.config_file.parent().unwrap_or_else(|| Path::new("/"))
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Sections named in the persisted block, in block order
    pub fn overlay_sections(&self) -> &[String] {
        &self.overlay_sections
    }
}

impl MergedConfig for LoadedConfig {
    fn sections(&self) -> Vec<&str> {
        self.store.sections()
    }

    fn options(&self, section: &str) -> Vec<(&str, &str)> {
        self.store.options(section)
    }
}

/// Load `root` and everything it includes.
pub fn load_config(root: &Path) -> Result<LoadedConfig> {
    let config_file = absolute_path(root).map_err(|source| Error::Read {
        path: root.to_path_buf(),
        source,
    })?;
    let content = read_config(&config_file)?;
    let split = autosave::split(&content);

    let mut store = ConfigStore::new();
    let mut active = HashSet::new();
    merge_file(&config_file, split.regular, &mut active, &mut store)?;

    let overlay = ini::parse(&split.overlay);
    let overlay_sections = overlay
        .section_names()
        .map(str::to_string)
        .collect::<Vec<_>>();
    store.merge_document(&overlay);

    debug!(
        file = %config_file.display(),
        sections = store.len(),
        persisted = overlay_sections.len(),
        "loaded config"
    );

    Ok(LoadedConfig {
        config_file,
        store,
        overlay_sections,
    })
}

fn merge_file(
    path: &Path,
    content: &str,
    active: &mut HashSet<PathBuf>,
    store: &mut ConfigStore,
) -> Result<()> {
    active.insert(path.to_path_buf());
    let result = merge_segments(path, content, active, store);
    active.remove(path);
    result
}

fn merge_segments(
    path: &Path,
    content: &str,
    active: &mut HashSet<PathBuf>,
    store: &mut ConfigStore,
) -> Result<()> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("/"));

    for segment in ini::split_includes(content) {
        match segment {
            Segment::Lines(lines) => {
                let doc = ini::parse_lines(lines);
                for line in &doc.malformed {
                    warn!(file = %path.display(), line, "skipping unparsable config line");
                }
                store.merge_document(&doc);
            }
            Segment::Include { line, pattern } => {
                let matches = expand_include(base_dir, pattern)?;
                if matches.is_empty() && !has_glob_magic(pattern) {
                    warn!(
                        file = %path.display(),
                        line,
                        pattern,
                        "include file does not exist"
                    );
                }
                for included in matches {
                    if active.contains(&included) {
                        warn!(
                            file = %included.display(),
                            from = %path.display(),
                            "recursive include skipped"
                        );
                        continue;
                    }
                    let text = read_config(&included)?;
                    merge_file(&included, &text, active, store)?;
                }
            }
        }
    }

    Ok(())
}

fn has_glob_magic(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}
