use std::io::{self, IsTerminal};

use crate::RequestedColorMode;

pub(crate) mod chat;
pub(crate) mod list;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub(crate) enum ColorMode {
    On,
    Off,
}

impl ColorMode {
    /// Returns whether ANSI color should be used
    /// An explicit preference on the command line wins. Otherwise color is
    /// disabled when "NO_COLOR" is set or the output is not a terminal.
    pub(crate) fn resolve_auto(cm: RequestedColorMode) -> ColorMode {
        match cm {
            RequestedColorMode::Auto => {
                let disable_color =
                    std::env::var_os("NO_COLOR").is_some() || !io::stdout().is_terminal();

                if disable_color {
                    ColorMode::Off
                } else {
                    ColorMode::On
                }
            }
            RequestedColorMode::On => ColorMode::On,
            RequestedColorMode::Off => ColorMode::Off,
        }
    }
}
