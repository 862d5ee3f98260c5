use crate::colors::{Colors, Tone};
use crate::paths::display_relative;
use crate::resolver::ProvenanceMap;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Normal,
    Quiet,
    Diff,
    /// Print the rendered file instead of writing it
    Stdout,
    /// Print the provenance map as JSON instead of writing
    Json,
}

pub struct Config {
    pub check_only: bool,
    pub output_mode: OutputMode,
    /// Destination override; beats `[allconfig] output`
    pub output: Option<PathBuf>,
}

pub struct OutputContext {
    pub mode: OutputMode,
    pub colors: Colors,
    pub verbose: bool,
}

impl OutputContext {
    pub fn new(mode: OutputMode, use_colors: bool, verbose: bool) -> Self {
        Self {
            mode,
            colors: Colors::new(use_colors),
            verbose,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Sections in the merged config
    pub sections: usize,
    /// Destination differs (check) or was changed (write) by this run
    pub changed: bool,
    /// Connect handlers that reported an error
    pub failed_handlers: usize,
}

impl RunResult {
    pub fn has_problems(&self, check_only: bool) -> bool {
        self.failed_handlers > 0 || (check_only && self.changed)
    }
}

pub fn print_write_result(
    path: &Path,
    previous: Option<&str>,
    current: &str,
    result: &RunResult,
    ctx: &OutputContext,
) {
    match ctx.mode {
        OutputMode::Quiet => {
            if result.changed {
                println!("{}", path.display());
            }
        }
        OutputMode::Diff => {
            print_diff(&path.display().to_string(), previous.unwrap_or(""), current)
        }
        _ => {
            if result.changed {
                println!(
                    "{} {} ({} sections)",
                    ctx.colors.paint(Tone::Success, "Wrote:"),
                    path.display(),
                    result.sections
                );
            } else {
                println!(
                    "{} {}",
                    ctx.colors.paint(Tone::Info, "Unchanged:"),
                    path.display()
                );
            }
        }
    }
}

pub fn print_check_result(
    path: &Path,
    previous: Option<&str>,
    generated: &str,
    ctx: &OutputContext,
) {
    let up_to_date = previous == Some(generated);

    if up_to_date {
        if ctx.verbose && ctx.mode != OutputMode::Quiet {
            println!(
                "{} {}",
                ctx.colors.paint(Tone::Info, "Up to date:"),
                path.display()
            );
        }
        return;
    }

    match ctx.mode {
        OutputMode::Quiet => println!("{}", path.display()),
        OutputMode::Diff => {
            print_diff(&path.display().to_string(), previous.unwrap_or(""), generated)
        }
        _ => {
            println!(
                "{} {}",
                ctx.colors.paint(Tone::Error, "Stale:"),
                path.display()
            );
            match previous {
                None => println!("  - file does not exist"),
                Some(previous) => {
                    let diff = TextDiff::from_lines(previous, generated);
                    let changed = diff
                        .iter_all_changes()
                        .filter(|c| c.tag() != ChangeTag::Equal)
                        .count();
                    println!("  - {changed} line(s) differ");
                }
            }
        }
    }
}

pub fn print_rendered(text: &str) {
    print!("{text}");
}

pub fn print_provenance_json(json: &str) {
    println!("{json}");
}

pub fn print_error(message: &str, ctx: &OutputContext) {
    eprintln!("{} {message}", ctx.colors.paint(Tone::Error, "Error:"));
}

pub fn print_diff(label: &str, original: &str, content: &str) {
    let diff = TextDiff::from_lines(original, content);

    println!("--- {label}");
    println!("+++ {label}");

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            println!();
        }

        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                print!("{sign}{change}");
            }
        }
    }
}

/// Pretty JSON of the provenance map, paths shown as in the rendered header
/// comments (relative to `cfg_root` when beneath it)
pub fn provenance_json(
    provenance: &ProvenanceMap,
    cfg_root: &Path,
) -> serde_json::Result<String> {
    let shown: BTreeMap<&str, Vec<String>> = provenance
        .iter()
        .map(|(section, files)| {
            let files = files
                .iter()
                .map(|file| display_relative(file, cfg_root))
                .collect();
            (section, files)
        })
        .collect();
    serde_json::to_string_pretty(&shown)
}
