//! The `[allconfig]` extension: on connect, resolve provenance, render the
//! merged config and write it out.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::host::{Event, LoadedConfig, MergedConfig, Printer};
use crate::render::{render, write_output};
use crate::resolver::{resolve, ProvenanceMap};

/// Config section the extension reads its options from
pub const SECTION: &str = "allconfig";

/// File name used when no `output` is configured
pub const DEFAULT_OUTPUT: &str = "allconfig.cfg";

/// Rendered text and the provenance it was annotated with
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub text: String,
    pub provenance: ProvenanceMap,
}

#[derive(Debug, Clone)]
pub struct AllConfig {
    config_file: PathBuf,
    output_path: PathBuf,
}

impl AllConfig {
    /// Set up from the host config, reading `[allconfig] output`.
    pub fn new(config: &LoadedConfig) -> Self {
        let configured = config.get(SECTION, "output");
        Self {
            config_file: config.config_file().to_path_buf(),
            output_path: resolve_output_path(None, configured, config.config_dir()),
        }
    }

    /// Replace the destination, e.g. from a command-line flag.
    pub fn with_output(mut self, output: Option<&Path>) -> Self {
        if output.is_some() {
            self.output_path = resolve_output_path(output, None, self.cfg_root());
        }
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn cfg_root(&self) -> &Path {
        self.config_file.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// Resolve provenance from disk and render `merged` without writing.
    pub fn generate(&self, merged: &dyn MergedConfig) -> Result<Generated> {
        let provenance = resolve(&self.config_file)?;
        let text = render(merged, &provenance, self.cfg_root());
        Ok(Generated { text, provenance })
    }

    /// Generate and write the flattened config in one write.
    pub fn handle_connect(&self, merged: &dyn MergedConfig) -> Result<Generated> {
        let generated = self.generate(merged)?;
        if generated
            .provenance
            .iter()
            .any(|(_, files)| files.contains(&self.output_path))
        {
            warn!(
                output = %self.output_path.display(),
                "output file is itself included by the config; it will be read back as config"
            );
        }
        write_output(&self.output_path, &generated.text)?;
        info!(
            output = %self.output_path.display(),
            sections = merged.sections().len(),
            "wrote flattened config"
        );
        Ok(generated)
    }

    /// Subscribe [`AllConfig::handle_connect`] to the host's connect event.
    pub fn register(self, printer: &mut Printer) {
        printer.register_event_handler(Event::Connect, move |config| {
            self.handle_connect(config).map(|_| ())
        });
    }
}

/// Pick the destination file.
///
/// Priority: explicit override > configured `output` > default file next to
/// the root config. Relative paths resolve against `cfg_root` and a leading
/// `~/` against the home directory.
pub fn resolve_output_path(
    explicit: Option<&Path>,
    configured: Option<&str>,
    cfg_root: &Path,
) -> PathBuf {
    let chosen = explicit
        .map(Path::to_path_buf)
        .or_else(|| {
            configured
                .filter(|value| !value.trim().is_empty())
                .map(|value| expand_home(value.trim()))
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    if chosen.is_absolute() {
        chosen
    } else {
        cfg_root.join(chosen)
    }
}

fn expand_home(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), home::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::load_config;
    use crate::render::HEADER;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    // ===========================================
    // Output path
    // ===========================================

    #[test]
    fn test_default_output_next_to_config() {
        let path = resolve_output_path(None, None, Path::new("/cfg"));
        assert_eq!(path, PathBuf::from("/cfg/allconfig.cfg"));
    }

    #[test]
    fn test_configured_output() {
        let path = resolve_output_path(None, Some("/tmp/flat.cfg"), Path::new("/cfg"));
        assert_eq!(path, PathBuf::from("/tmp/flat.cfg"));

        let path = resolve_output_path(None, Some("debug/flat.cfg"), Path::new("/cfg"));
        assert_eq!(path, PathBuf::from("/cfg/debug/flat.cfg"));
    }

    #[test]
    fn test_blank_configured_output_uses_default() {
        let path = resolve_output_path(None, Some("  "), Path::new("/cfg"));
        assert_eq!(path, PathBuf::from("/cfg/allconfig.cfg"));
    }

    #[test]
    fn test_explicit_output_wins() {
        let path = resolve_output_path(
            Some(Path::new("/out/x.cfg")),
            Some("/tmp/flat.cfg"),
            Path::new("/cfg"),
        );
        assert_eq!(path, PathBuf::from("/out/x.cfg"));
    }

    #[test]
    fn test_home_expansion() {
        if let Some(home) = home::home_dir() {
            let path = resolve_output_path(None, Some("~/flat.cfg"), Path::new("/cfg"));
            assert_eq!(path, home.join("flat.cfg"));
        }
    }

    // ===========================================
    // Generation
    // ===========================================

    #[test]
    fn test_output_option_read_from_section() {
        let dir = TempDir::new().unwrap();
        let root = write(
            dir.path(),
            "printer.cfg",
            "[allconfig]\noutput: debug/everything.cfg\n",
        );

        let config = load_config(&root).unwrap();
        let allconfig = AllConfig::new(&config);
        assert_eq!(allconfig.output_path(), dir.path().join("debug/everything.cfg"));

        let allconfig = allconfig.with_output(Some(Path::new("other.cfg")));
        assert_eq!(allconfig.output_path(), dir.path().join("other.cfg"));
    }

    #[test]
    fn test_handle_connect_writes_flattened_config() {
        let dir = TempDir::new().unwrap();
        let root = write(
            dir.path(),
            "printer.cfg",
            "[extruder]\nrotation_distance: 40\n[include hw/override.cfg]\n\
             #*# <---------------------- SAVE_CONFIG ---------------------->\n\
             #*# DO NOT EDIT THIS BLOCK OR BELOW. The contents are auto-generated.\n\
             #*#\n\
             #*# [extruder]\n\
             #*# pid_kp = 21.432\n\
             #*#\n\
             #*# [bed_mesh default]\n\
             #*# version = 1\n",
        );
        write(
            dir.path(),
            "hw/override.cfg",
            "[extruder]\nrotation_distance: 32\n[gcode_macro START]\ngcode:\n  G28\n  G1 Z10\n",
        );

        let config = load_config(&root).unwrap();
        let allconfig = AllConfig::new(&config);
        let generated = allconfig.handle_connect(&config).unwrap();

        let written = fs::read_to_string(dir.path().join("allconfig.cfg")).unwrap();
        assert_eq!(written, generated.text);
        assert_eq!(
            written.strip_prefix(HEADER).unwrap(),
            "[extruder]  # printer.cfg, hw/override.cfg\n\
             rotation_distance: 32\n\
             pid_kp: 21.432\n\
             \n\
             [gcode_macro START]  # hw/override.cfg\n\
             gcode:\n    G28\n    G1 Z10\n\
             \n\
             [bed_mesh default]\n\
             version: 1\n\
             \n"
        );
    }

    #[test]
    fn test_generate_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sub/a.cfg", "[probe]\npin: PA1\n");
        write(dir.path(), "sub/b.cfg", "[fan]\npin: PA8\n");
        let root = write(dir.path(), "printer.cfg", "[printer]\n[include sub/*.cfg]\n");

        let config = load_config(&root).unwrap();
        let allconfig = AllConfig::new(&config);

        let first = allconfig.handle_connect(&config).unwrap();
        let first_bytes = fs::read(allconfig.output_path()).unwrap();
        let second = allconfig.handle_connect(&config).unwrap();
        let second_bytes = fs::read(allconfig.output_path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn test_generate_records_provenance() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "printer.cfg", "[printer]\n");

        let config = load_config(&root).unwrap();
        let generated = AllConfig::new(&config).generate(&config).unwrap();
        assert_eq!(generated.provenance.get("printer"), Some(&[root][..]));
        assert!(!dir.path().join("allconfig.cfg").exists());
    }

    #[test]
    fn test_registered_handler_runs_on_connect() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "printer.cfg", "[printer]\nkinematics: none\n");

        let config = load_config(&root).unwrap();
        let allconfig = AllConfig::new(&config);
        let output = allconfig.output_path().to_path_buf();

        let mut printer = Printer::new(config);
        allconfig.register(&mut printer);
        assert!(!output.exists());

        assert_eq!(printer.send_event(Event::Connect), 0);
        assert!(fs::read_to_string(&output)
            .unwrap()
            .contains("[printer]  # printer.cfg\nkinematics: none\n"));
    }

    #[test]
    fn test_write_failure_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let root = write(dir.path(), "printer.cfg", "[printer]\n");

        let config = load_config(&root).unwrap();
        let output = dir.path().join("no/such/dir/out.cfg");
        let allconfig = AllConfig::new(&config).with_output(Some(output.as_path()));

        let mut printer = Printer::new(config);
        allconfig.register(&mut printer);
        assert_eq!(printer.send_event(Event::Connect), 1);
    }
}
