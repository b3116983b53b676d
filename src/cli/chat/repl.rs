use std::io;
use std::path::PathBuf;
use std::process::Command;

use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, default_vi_insert_keybindings, default_vi_normal_keybindings,
    ColumnarMenu, DefaultCompleter, EditCommand, EditMode, Emacs, KeyCode, KeyModifiers,
    MenuBuilder, Reedline, ReedlineEvent, ReedlineMenu, Signal, Vi,
};

use crate::config;
use crate::models::MODELS;

use super::editor::{self, Scratch};
use super::highlighter::Highlighter;
use super::history::RedactingHistory;
use super::prompt::{completion_marker, Prompt};

pub(super) const KEY_COMMAND: &str = "/key";

const COMMANDS: [&str; 7] = [
    "/edit",
    "/exit",
    "/clear",
    "/model",
    "/models",
    "/history",
    KEY_COMMAND,
];

/// What the user asked for at the prompt
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Input {
    /// Text to send to the model
    Message(String),
    /// Discard the conversation and start over
    Clear,
    /// Show the selected model, or select another one
    Model(Option<String>),
    /// List the models that can be selected
    Models,
    /// Print the conversation so far
    History,
    /// Report whether an API key is set, or set one for this run
    Key(Option<String>),
    Exit,
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Input(Input),
    Edit,
    Blank,
}

fn parse_line(line: &str) -> Line {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Line::Blank;
    }

    let (command, argument) = match trimmed.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, Some(argument.trim())),
        None => (trimmed, None),
    };

    match (command, argument) {
        ("/exit", None) => Line::Input(Input::Exit),
        ("/clear", None) => Line::Input(Input::Clear),
        ("/edit", None) => Line::Edit,
        ("/models", None) => Line::Input(Input::Models),
        ("/history", None) => Line::Input(Input::History),
        ("/model", argument) => Line::Input(Input::Model(argument.map(str::to_string))),
        (KEY_COMMAND, argument) => Line::Input(Input::Key(argument.map(str::to_string))),
        // Anything else, including unknown slash commands, is chat text.
        _ => Line::Input(Input::Message(line.to_string())),
    }
}

/// Whether `line` sets an API key, and so must not be kept in the history
pub(super) fn holds_secret(line: &str) -> bool {
    matches!(parse_line(line), Line::Input(Input::Key(Some(_))))
}

fn completion_menu_event() -> ReedlineEvent {
    ReedlineEvent::UntilFound(vec![
        ReedlineEvent::Menu("completion_menu".to_string()),
        ReedlineEvent::MenuNext,
    ])
}

fn edit_mode(keybindings: config::Keybindings) -> Box<dyn EditMode> {
    match keybindings {
        config::Keybindings::Vi => {
            let mut insert_bindings = default_vi_insert_keybindings();

            insert_bindings.add_binding(KeyModifiers::NONE, KeyCode::Tab, completion_menu_event());

            Box::new(Vi::new(insert_bindings, default_vi_normal_keybindings()))
        }
        config::Keybindings::Emacs => {
            let mut keybindings = default_emacs_keybindings();

            keybindings.add_binding(KeyModifiers::NONE, KeyCode::Tab, completion_menu_event());

            keybindings.add_binding(
                KeyModifiers::CONTROL,
                KeyCode::Char('e'),
                ReedlineEvent::OpenEditor,
            );

            keybindings.add_binding(
                KeyModifiers::CONTROL,
                KeyCode::Char('j'),
                ReedlineEvent::Edit(vec![EditCommand::InsertNewline]),
            );

            Box::new(Emacs::new(keybindings))
        }
    }
}

pub(crate) struct Repl {
    line_editor: Reedline,
    prompt: Prompt,
    scratch: Scratch,
    editor: Option<PathBuf>,
}

impl Repl {
    pub(crate) fn new(
        editor: Option<PathBuf>,
        keybindings: config::Keybindings,
    ) -> io::Result<Repl> {
        let scratch = Scratch::new()?;

        // Model ids contain ':', '.', and '-' and should complete as one word
        let mut completer = Box::new(DefaultCompleter::with_inclusions(&['/', ':', '.', '-']));

        completer.insert(COMMANDS.iter().map(|c| c.to_string()).collect());
        completer.insert(MODELS.iter().map(|m| m.id.to_string()).collect());

        let completion_menu = Box::new(
            ColumnarMenu::default()
                .with_name("completion_menu")
                .with_marker(&completion_marker().to_string())
                .with_text_style(Style::new().fg(Color::Default))
                .with_selected_text_style(Style::new().fg(Color::Blue).on(Color::DarkGray))
                .with_selected_match_text_style(
                    Style::new().fg(Color::Blue).bold().on(Color::DarkGray),
                ),
        );

        let editor = editor.or_else(editor::resolve_fallback_editor);

        let line_editor = Reedline::create()
            .with_history(Box::new(RedactingHistory::default()))
            .with_completer(completer)
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_edit_mode(edit_mode(keybindings))
            .with_highlighter(Box::new(Highlighter));

        let line_editor = match &editor {
            Some(editor) => {
                line_editor.with_buffer_editor(Command::new(editor), scratch.path().to_path_buf())
            }
            None => line_editor,
        };

        Ok(Repl {
            line_editor,
            prompt: Prompt::default(),
            scratch,
            editor,
        })
    }

    /// Reads lines until the user enters something actionable. Blank lines and
    /// Ctrl-C at the prompt are ignored; Ctrl-D exits.
    pub(crate) fn read(&mut self) -> Input {
        loop {
            let line = match self.line_editor.read_line(&self.prompt) {
                Ok(Signal::Success(line)) => line,
                Ok(Signal::CtrlC) => continue,
                // Ctrl-D
                Ok(_) => return Input::Exit,
                Err(err) => {
                    tracing::error!("failed to read from the terminal: {}", err);
                    return Input::Exit;
                }
            };

            match parse_line(&line) {
                Line::Input(input) => return input,
                Line::Blank => continue,
                Line::Edit => {
                    if let Some(message) = self.compose() {
                        return Input::Message(message);
                    }
                }
            }
        }
    }

    fn compose(&self) -> Option<String> {
        let editor = match self.editor.as_ref() {
            Some(editor) => editor,
            None => {
                crate::warn!("no editor specified, set \"editor\" in the config or EDITOR");
                return None;
            }
        };

        match editor::compose(editor, &self.scratch) {
            Ok(message) if message.trim().is_empty() => None,
            Ok(message) => {
                println!("{}", message);
                Some(message)
            }
            Err(err) => {
                crate::warn!("{}", err);
                None
            }
        }
    }
}
