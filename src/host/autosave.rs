//! Persisted SAVE_CONFIG block at the end of the root config file.
//!
//! ```text
//! #*# <---------------------- SAVE_CONFIG ---------------------->
//! #*# DO NOT EDIT THIS BLOCK OR BELOW. The contents are auto-generated.
//! #*#
//! #*# [extruder]
//! #*# pid_kp = 21.432
//! ```

use tracing::warn;

const PREFIX: &str = "#*#";
const MARKER: &str = "SAVE_CONFIG";
const NOTICE: &str = "DO NOT EDIT";

/// Root file content split into regular text and the de-prefixed overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Split<'a> {
    pub regular: &'a str,
    /// Overlay text with `#*# ` prefixes removed; empty when there is none
    pub overlay: String,
}

fn is_marker(line: &str) -> bool {
    line.starts_with(PREFIX) && line.contains(MARKER) && line.contains("<-")
}

/// Split off the persisted block, if present.
pub fn split(content: &str) -> Split<'_> {
    let mut offset = 0;
    let mut marker_at = None;
    for line in content.split_inclusive('\n') {
        if is_marker(line.trim_end()) {
            marker_at = Some(offset);
            break;
        }
        offset += line.len();
    }

    let Some(start) = marker_at else {
        return Split {
            regular: content,
            overlay: String::new(),
        };
    };

    let regular = &content[..start];
    let mut overlay = Vec::new();
    for (idx, line) in content[start..].lines().enumerate().skip(1) {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let Some(rest) = line.strip_prefix(PREFIX) else {
            warn!(
                line = idx + 1,
                "line without '#*#' prefix after SAVE_CONFIG marker; ignoring persisted block"
            );
            return Split {
                regular: content,
                overlay: String::new(),
            };
        };
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        if overlay.is_empty() && rest.starts_with(NOTICE) {
            continue;
        }
        overlay.push(rest);
    }

    Split {
        regular,
        overlay: overlay.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "\
[extruder]
rotation_distance: 32

#*# <---------------------- SAVE_CONFIG ---------------------->
#*# DO NOT EDIT THIS BLOCK OR BELOW. The contents are auto-generated.
#*#
#*# [extruder]
#*# pid_kp = 21.432
#*# pid_ki = 1.856
#*#
#*# [bed_mesh default]
#*# points =
#*# 	0.1, 0.2
#*# 	0.3, 0.4
";

    #[test]
    fn test_split_without_block() {
        let content = "[printer]\nkinematics: none\n";
        let split = split(content);
        assert_eq!(split.regular, content);
        assert!(split.overlay.is_empty());
    }

    #[test]
    fn test_split_regular_part() {
        let split = split(BLOCK);
        assert_eq!(split.regular, "[extruder]\nrotation_distance: 32\n\n");
    }

    #[test]
    fn test_overlay_loses_prefix_and_notice() {
        let split = split(BLOCK);
        assert_eq!(
            split.overlay,
            "\n[extruder]\npid_kp = 21.432\npid_ki = 1.856\n\n[bed_mesh default]\npoints =\n\t0.1, 0.2\n\t0.3, 0.4"
        );
    }

    #[test]
    fn test_overlay_parses_as_sections() {
        let doc = crate::ini::parse(&split(BLOCK).overlay);
        assert_eq!(
            doc.section_names().collect::<Vec<_>>(),
            ["extruder", "bed_mesh default"]
        );
        assert_eq!(
            doc.sections[1].options,
            vec![("points".to_string(), "\n0.1, 0.2\n0.3, 0.4".to_string())]
        );
        assert!(doc.malformed.is_empty());
    }

    #[test]
    fn test_unprefixed_line_discards_block() {
        let content = "[fan]\npin: PA7\n#*# <---------------------- SAVE_CONFIG ---------------------->\n#*# [fan]\nnot prefixed\n#*# pin = PA8\n";
        let split = split(content);
        assert_eq!(split.regular, content);
        assert!(split.overlay.is_empty());

        let doc = crate::ini::parse(split.regular);
        assert_eq!(doc.section_names().collect::<Vec<_>>(), ["fan"]);
        assert_eq!(
            doc.sections[0].options,
            vec![("pin".to_string(), "PA7".to_string())]
        );
    }
}
