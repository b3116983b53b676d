use nu_ansi_term::Style;

use crate::cli::ColorMode;
use crate::color;

/// Styles user input; REPL commands stand out from chat text.
#[derive(Default)]
pub(crate) struct Highlighter;

impl reedline::Highlighter for Highlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> reedline::StyledText {
        let style = match color::color_mode() {
            ColorMode::Off => Style::default(),
            ColorMode::On if line.starts_with('/') => *color::COMMAND_TEXT,
            ColorMode::On => *color::USER_TEXT,
        };

        reedline::StyledText {
            buffer: vec![(style, line.to_string())],
        }
    }
}
