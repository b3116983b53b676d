//! User-facing diagnostics printed to standard error.
//!
//! These are for the person at the terminal. Diagnostics aimed at whoever is
//! debugging the program go through `tracing` instead.

use std::fmt;

use nu_ansi_term::{AnsiGenericString, Style};

use crate::color::{self, MaybePaint};

pub const DEFAULT_EXIT_CODE: i32 = 1;

fn fmt_labeled(f: &mut fmt::Formatter<'_>, label: &str, style: Style, text: &str) -> fmt::Result {
    let label: AnsiGenericString<'_, str> = style.maybe_paint(label);
    let text: AnsiGenericString<'_, str> = color::DIAGNOSTIC_TEXT.maybe_paint(text);

    write!(f, "{} {}", label, text)
}

pub(crate) fn fmt_error(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    fmt_labeled(f, "error:", *color::ERROR_INDICATOR, text)
}

pub(crate) fn fmt_warn(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    fmt_labeled(f, "warning:", *color::WARNING_INDICATOR, text)
}

pub(crate) fn fmt_note(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    fmt_labeled(f, "note:", *color::NOTE_INDICATOR, text)
}

/// A diagnostic line, formatted according to its severity
pub(crate) enum Diagnostic<'a> {
    Error(&'a str),
    Warn(&'a str),
    Note(&'a str),
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Error(text) => fmt_error(f, text),
            Diagnostic::Warn(text) => fmt_warn(f, text),
            Diagnostic::Note(text) => fmt_note(f, text),
        }
    }
}

pub(crate) fn error_internal(text: &str) {
    eprintln!("{}", Diagnostic::Error(text));
}

pub(crate) fn warn_internal(text: &str) {
    eprintln!("{}", Diagnostic::Warn(text));
}

pub(crate) fn note_internal(text: &str) {
    eprintln!("{}", Diagnostic::Note(text));
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::warn_internal(&formatted);
    })
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
    })
}

#[macro_export]
macro_rules! note {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::note_internal(&formatted);
    })
}

#[macro_export]
macro_rules! die {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
        ::std::process::exit($crate::utils::errors::DEFAULT_EXIT_CODE);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ColorMode;

    #[test]
    fn test_plain_diagnostics() {
        color::configure_color(ColorMode::Off);

        assert_eq!(Diagnostic::Error("boom").to_string(), "error: boom");
        assert_eq!(Diagnostic::Warn("careful").to_string(), "warning: careful");
        assert_eq!(Diagnostic::Note("fyi").to_string(), "note: fyi");
    }
}
