use nu_ansi_term::AnsiGenericString;
use reedline::{self, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, PromptViMode};
use std::borrow::Cow;

use crate::color::{self, MaybePaint};

const USER_PROMPT: &str = "[#] ";
const USER_VI_NORMAL_PROMPT: &str = "[=] ";
const COMPLETION_MARKER: &str = "[/] ";
const USER_MULTILINE_PROMPT: &str = "::: ";

/// The prefix printed before an assistant turn, e.g. `[mistralai/mistral-7b-instruct:free] `
pub(crate) fn assistant_prompt(name: &str) -> String {
    let prompt_text = format!("[{}] ", name);

    let painted: AnsiGenericString<'_, str> = color::ASSISTANT_PROMPT.maybe_paint(prompt_text);

    painted.to_string()
}

pub(crate) fn user_prompt() -> AnsiGenericString<'static, str> {
    color::USER_PROMPT.maybe_paint(USER_PROMPT)
}

fn user_vi_normal_prompt() -> AnsiGenericString<'static, str> {
    color::USER_PROMPT.maybe_paint(USER_VI_NORMAL_PROMPT)
}

pub(crate) fn completion_marker() -> AnsiGenericString<'static, str> {
    color::USER_PROMPT.maybe_paint(COMPLETION_MARKER)
}

fn multiline_prompt() -> AnsiGenericString<'static, str> {
    color::USER_PROMPT.maybe_paint(USER_MULTILINE_PROMPT)
}

/// The REPL prompt. The indicators are rendered once, when the REPL starts.
pub(crate) struct Prompt {
    user_prompt: String,
    user_vi_normal_prompt: String,
    user_multiline_prompt: String,
}

impl Default for Prompt {
    fn default() -> Self {
        Prompt {
            user_prompt: user_prompt().to_string(),
            user_vi_normal_prompt: user_vi_normal_prompt().to_string(),
            user_multiline_prompt: multiline_prompt().to_string(),
        }
    }
}

impl reedline::Prompt for Prompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, prompt_mode: PromptEditMode) -> Cow<'_, str> {
        match prompt_mode {
            PromptEditMode::Vi(PromptViMode::Normal) => Cow::Borrowed(&self.user_vi_normal_prompt),
            _ => Cow::Borrowed(&self.user_prompt),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.user_multiline_prompt)
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };

        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}
