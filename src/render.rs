//! Renders the merged configuration as one flattened, annotated file

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::host::MergedConfig;
use crate::paths::display_relative;
use crate::resolver::ProvenanceMap;

const INDENT: &str = "    ";

/// Static comment block at the top of every generated file
pub const HEADER: &str = "\
# This is the configuration the firmware actually applies, flattened
# into a single file. It can differ from printer.cfg because a section
# may be declared in several files, each later declaration overriding
# the options of the earlier ones.
#
# For example, with one file declaring
#
# [extruder]
# step_pin: PA1
# dir_pin: PA2
# rotation_distance: 40
#
# and a file included after it declaring
#
# [extruder]
# rotation_distance: 32
#
# the firmware applies the last value of every option:
#
# [extruder]
# step_pin: PA1
# dir_pin: PA2
# rotation_distance: 32
#
# Values stored by SAVE_CONFIG are applied after everything else. With
# the sections above and a saved block such as
#
# #*# <---------------------- SAVE_CONFIG ---------------------->
# #*# DO NOT EDIT THIS BLOCK OR BELOW. The contents are auto-generated.
# #*#
# #*# [extruder]
# #*# pid_kp = 21.432
# #*# pid_ki = 1.856
#
# the firmware applies
#
# [extruder]
# step_pin: PA1
# dir_pin: PA2
# rotation_distance: 32
# pid_kp: 21.432
# pid_ki: 1.856
#
# Each section header lists the files that declared it, in load order.

";

/// Render every section of `merged`, annotated with its source files.
///
/// Source files beneath `cfg_root` are shown relative to it.
pub fn render(merged: &dyn MergedConfig, provenance: &ProvenanceMap, cfg_root: &Path) -> String {
    let mut out = String::from(HEADER);

    for section in merged.sections() {
        out.push('[');
        out.push_str(section);
        out.push(']');
        if let Some(files) = provenance.get(section).filter(|f| !f.is_empty()) {
            let sources: Vec<String> = files
                .iter()
                .map(|file| display_relative(file, cfg_root))
                .collect();
            out.push_str("  # ");
            out.push_str(&sources.join(", "));
        }
        out.push('\n');

        for (option, value) in merged.options(section) {
            render_option(&mut out, option, value);
        }
        out.push('\n');
    }

    out
}

/// Append one `option: value` entry.
///
/// A value spanning several lines is trimmed and moved below `option:`,
/// each line indented by four spaces.
pub fn render_option(out: &mut String, option: &str, value: &str) {
    if !value.contains(['\n', '\r']) {
        out.push_str(option);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
        return;
    }

    out.push_str(option);
    out.push_str(":\n");
    for line in value.trim().lines() {
        if !line.trim().is_empty() {
            out.push_str(INDENT);
            out.push_str(line);
        }
        out.push('\n');
    }
}

/// Write the complete rendered text in a single create/truncate write.
pub fn write_output(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}
