//! Tolerant line-oriented scanner for printer config files.
//!
//! Recognizes `[section]` headers, `key: value` / `key = value` options,
//! indented continuation lines and `[include <pattern>]` directives. Lines
//! that fit none of these are recorded and skipped instead of failing the
//! whole file.

use std::sync::OnceLock;

use regex::Regex;

/// One occurrence of a section header together with the options that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct IniSection {
    pub name: String,
    /// 1-based line of the header
    pub line: usize,
    pub options: Vec<(String, String)>,
}

/// Result of scanning one chunk of config text
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IniDocument {
    /// Header occurrences in file order; a repeated header appears twice
    pub sections: Vec<IniSection>,
    /// 1-based lines that could not be understood and were skipped
    pub malformed: Vec<usize>,
}

impl IniDocument {
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }
}

/// A piece of a config file, split at include directives.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    /// Numbered lines between include directives
    Lines(Vec<(usize, &'a str)>),
    Include { line: usize, pattern: &'a str },
}

fn include_regex() -> &'static Regex {
    static INCLUDE: OnceLock<Regex> = OnceLock::new();
    INCLUDE.get_or_init(|| Regex::new(r"^\[\s*include\s+(.+?)\s*\]\s*$").unwrap())
}

/// Cut a line at its comment.
///
/// `#` always starts a comment; `;` only at the start of the line or after
/// whitespace.
pub fn strip_comment(line: &str) -> &str {
    let mut after_space = true;
    for (idx, ch) in line.char_indices() {
        match ch {
            '#' => return &line[..idx],
            ';' if after_space => return &line[..idx],
            _ => {}
        }
        after_space = ch.is_whitespace();
    }
    line
}

/// Return the glob pattern if `line` is an `[include <pattern>]` header.
///
/// Like any header the `[` must sit in the first column; an indented
/// `[include ...]` is a continuation line of the open value.
pub fn include_pattern(line: &str) -> Option<&str> {
    include_regex()
        .captures(strip_comment(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// All include patterns of a file, in statement order.
pub fn include_directives(content: &str) -> Vec<&str> {
    content.lines().filter_map(include_pattern).collect()
}

/// Split file content into runs of ordinary lines and include directives.
pub fn split_includes(content: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut pending = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        match include_pattern(line) {
            Some(pattern) => {
                if !pending.is_empty() {
                    segments.push(Segment::Lines(std::mem::take(&mut pending)));
                }
                segments.push(Segment::Include {
                    line: idx + 1,
                    pattern,
                });
            }
            None => pending.push((idx + 1, line)),
        }
    }

    if !pending.is_empty() {
        segments.push(Segment::Lines(pending));
    }

    segments
}

/// Scan a whole file.
pub fn parse(content: &str) -> IniDocument {
    parse_lines(content.lines().enumerate().map(|(idx, line)| (idx + 1, line)))
}

/// Scan pre-numbered lines, e.g. one [`Segment::Lines`] run.
pub fn parse_lines<'a, I>(lines: I) -> IniDocument
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let mut doc = IniDocument::default();
    // Index of the option currently accepting continuation lines
    let mut open_option: Option<usize> = None;
    let mut pending_blanks = 0usize;
    let mut in_section = false;

    for (line_no, raw) in lines {
        if raw.trim().is_empty() {
            if open_option.is_some() {
                pending_blanks += 1;
            }
            continue;
        }

        let text = strip_comment(raw);
        if text.trim().is_empty() {
            continue;
        }

        if raw.starts_with(char::is_whitespace) {
            let section = doc.sections.last_mut().filter(|_| in_section);
            match (section, open_option) {
                (Some(section), Some(idx)) => {
                    let value = &mut section.options[idx].1;
                    for _ in 0..pending_blanks {
                        value.push('\n');
                    }
                    value.push('\n');
                    value.push_str(text.trim());
                }
                _ => doc.malformed.push(line_no),
            }
            pending_blanks = 0;
            continue;
        }

        pending_blanks = 0;
        open_option = None;
        let text = text.trim_end();

        if text.starts_with('[') {
            in_section = false;
            if include_pattern(text).is_some() {
                continue;
            }
            match text
                .strip_prefix('[')
                .and_then(|t| t.strip_suffix(']'))
                .map(str::trim)
            {
                Some(name) if !name.is_empty() => {
                    doc.sections.push(IniSection {
                        name: name.to_string(),
                        line: line_no,
                        options: Vec::new(),
                    });
                    in_section = true;
                }
                _ => doc.malformed.push(line_no),
            }
            continue;
        }

        let section = match doc.sections.last_mut() {
            Some(section) if in_section => section,
            _ => {
                doc.malformed.push(line_no);
                continue;
            }
        };

        match split_option(text) {
            Some((key, value)) => {
                let idx = match section.options.iter().position(|(k, _)| *k == key) {
                    Some(idx) => {
                        section.options[idx].1 = value.to_string();
                        idx
                    }
                    None => {
                        section.options.push((key, value.to_string()));
                        section.options.len() - 1
                    }
                };
                open_option = Some(idx);
            }
            None => doc.malformed.push(line_no),
        }
    }

    doc
}

/// Split `key: value` or `key = value` at whichever delimiter comes first.
fn split_option(text: &str) -> Option<(String, &str)> {
    let pos = text.find([':', '='])?;
    let key = text[..pos].trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_lowercase(), text[pos + 1..].trim()))
}
