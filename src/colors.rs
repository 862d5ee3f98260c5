use std::io::{self, IsTerminal};

const RESET: &str = "\x1b[0m";

/// Kind of status line being printed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tone {
    Error,
    Warning,
    Success,
    Info,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Tone::Error => "\x1b[31m",   // Red
            Tone::Warning => "\x1b[33m", // Yellow
            Tone::Success => "\x1b[32m", // Green
            Tone::Info => "\x1b[36m",    // Cyan
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Colors {
    enabled: bool,
}

impl Colors {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Wrap `text` in the escape codes for `tone` when colors are on.
    pub fn paint(&self, tone: Tone, text: &str) -> String {
        if self.enabled {
            format!("{}{text}{RESET}", tone.code())
        } else {
            text.to_string()
        }
    }
}

pub fn should_use_colors(force_color: bool, no_color: bool) -> bool {
    // Priority: --no-color > --color > NO_COLOR env > TTY detection
    if no_color {
        return false;
    }
    if force_color {
        return true;
    }
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    io::stdout().is_terminal()
}
