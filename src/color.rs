use crate::cli::ColorMode;
use lazy_static::lazy_static;
use nu_ansi_term::{AnsiGenericString, Color, Style};
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

lazy_static! {
    pub(crate) static ref USER_PROMPT: Style = Color::Blue.bold();
    pub(crate) static ref ASSISTANT_PROMPT: Style = Color::Green.bold();
    pub(crate) static ref USER_TEXT: Style = Color::Default.bold();
    pub(crate) static ref COMMAND_TEXT: Style = Color::Blue.normal();
    pub(crate) static ref ERROR_INDICATOR: Style = Color::Red.bold();
    pub(crate) static ref WARNING_INDICATOR: Style = Color::Yellow.bold();
    pub(crate) static ref NOTE_INDICATOR: Style = Color::Cyan.bold();
    pub(crate) static ref DIAGNOSTIC_TEXT: Style = Color::Default.bold();
}

static USE_COLOR: AtomicBool = AtomicBool::new(true);

pub(crate) fn configure_color(cmode: ColorMode) {
    USE_COLOR.store(matches!(cmode, ColorMode::On), Ordering::Relaxed);
}

pub(crate) fn color_mode() -> ColorMode {
    match USE_COLOR.load(Ordering::Relaxed) {
        true => ColorMode::On,
        false => ColorMode::Off,
    }
}

/// Paints only when color output is enabled
pub(crate) trait MaybePaint {
    #[must_use]
    fn maybe_paint<'a, I, S: 'a + ToOwned + ?Sized>(self, input: I) -> AnsiGenericString<'a, S>
    where
        I: Into<Cow<'a, S>>,
        <S as ToOwned>::Owned: fmt::Debug;
}

impl MaybePaint for Style {
    fn maybe_paint<'a, I, S: 'a + ToOwned + ?Sized>(self, input: I) -> AnsiGenericString<'a, S>
    where
        I: Into<Cow<'a, S>>,
        <S as ToOwned>::Owned: fmt::Debug,
    {
        match color_mode() {
            ColorMode::On => self.paint(input),
            ColorMode::Off => {
                let cow: Cow<'a, S> = input.into();

                cow.into()
            }
        }
    }
}
