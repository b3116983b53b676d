mod editor;
mod highlighter;
mod history;
mod prompt;
mod repl;

use std::error::Error as StdError;
use std::fmt;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;

use indicatif::ProgressBar;
use tokio::{select, signal};

use self::prompt::{assistant_prompt, user_prompt};
use self::repl::{Input, Repl};
use crate::chat::{Role, Turn};
use crate::completion::{self, CompletionClient};
use crate::config::{self, API_KEY_ENV_VAR};
use crate::models::{self, Model, MODELS};
use crate::session::Session;
use crate::{die, error, note, warn, ChatArgs};

/// Settings for a chat that come from the configuration rather than the
/// command line
pub(crate) struct ChatOptions {
    pub editor: Option<PathBuf>,
    pub keybindings: config::Keybindings,
    pub credential: Option<String>,
    pub default_model: Option<String>,
}

/// A turn as it is printed in the terminal
pub(crate) struct Rendered<'a> {
    turn: &'a Turn,
    /// The name shown in front of assistant turns
    assistant: &'a str,
}

impl<'a> Rendered<'a> {
    pub(crate) fn new(turn: &'a Turn, assistant: &'a str) -> Rendered<'a> {
        Rendered { turn, assistant }
    }
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.turn.role() {
            Role::User => write!(f, "{}{}", user_prompt(), self.turn.content()),
            Role::Assistant => write!(
                f,
                "{}{}",
                assistant_prompt(self.assistant),
                self.turn.content()
            ),
        }
    }
}

/// A failed exchange, ready to be shown to the user
#[derive(Debug)]
struct Failure {
    message: String,
    note: Option<String>,
}

fn innermost_source<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut err = err;

    while let Some(source) = err.source() {
        err = source;
    }

    err
}

fn describe_failure(err: &completion::Error, model: &Model) -> Failure {
    let message = format!("completion for {} failed: {}", model.id, err.diagnostic());

    let note = match err {
        completion::Error::MissingCredential => Some(format!(
            "set {} or \"api_key\" under [openrouter] in the config",
            API_KEY_ENV_VAR
        )),
        completion::Error::Remote { status, .. } => err
            .remote_status()
            .map(|hint| format!("HTTP {}: {}", status, hint.message())),
        completion::Error::Transport(transport) => transport
            .source()
            .map(|source| innermost_source(source).to_string()),
        completion::Error::MalformedResponse(_) => None,
    };

    Failure { message, note }
}

fn report_failure(err: &completion::Error, model: &Model) {
    tracing::info!(kind = ?err.kind(), model = model.id, "exchange failed");

    let failure = describe_failure(err, model);

    error!("{}", failure.message);

    if let Some(note) = failure.note {
        note!("{}", note);
    }
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();

    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner
}

fn print_models(selected: &Model) {
    for model in MODELS.iter() {
        let marker = if model == selected { "*" } else { " " };

        println!("{} {} ({})", marker, model.label, model.id);
    }
}

/// The interactive chat: a session plus the selections made through the REPL
struct Chat<'c> {
    client: &'c CompletionClient,
    session: Session<'c>,
    model: &'static Model,
    credential: Option<String>,
    spinner: bool,
}

impl<'c> Chat<'c> {
    fn new(
        client: &'c CompletionClient,
        model: &'static Model,
        credential: Option<String>,
        spinner: bool,
    ) -> Chat<'c> {
        Chat {
            client,
            session: Session::new(client),
            model,
            credential,
            spinner,
        }
    }

    /// Sends one message and prints the reply. Ctrl-C abandons the request; like
    /// any failure, that leaves the user turn without a reply.
    async fn exchange(&mut self, text: String) {
        self.session.submit_user_message(text);

        let spinner = self.spinner.then(thinking_spinner);

        // Once installed, the SIGINT handler stays for the rest of the process.
        // The prompt reads keys in raw mode, so Ctrl-C there arrives as
        // `Signal::CtrlC` and never depends on it.
        let outcome = select! {
            res = self.session.advance(self.model.id, self.credential.as_deref()) => {
                Some(res.map(|turn| turn.content().to_string()))
            }
            _ = signal::ctrl_c() => None,
        };

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        match outcome {
            Some(Ok(reply)) => {
                println!("{}\n", Rendered::new(&Turn::assistant(reply), self.model.id));
            }
            Some(Err(err)) => report_failure(&err, self.model),
            None => warn!("the request was interrupted, no reply was recorded"),
        }
    }

    fn clear(&mut self) {
        self.session = Session::new(self.client);

        note!("started a new conversation");
    }

    fn select_model(&mut self, spec: &str) {
        match models::resolve(Some(spec)) {
            Ok(model) => {
                self.model = model;

                note!("switched to {} ({})", model.label, model.id);
            }
            Err(err) => error!("{}", err),
        }
    }

    fn set_credential(&mut self, key: Option<String>) {
        match key {
            Some(key) => {
                self.credential = Some(key);

                note!("the API key was set for this run");
            }
            None if self.credential.is_some() => note!("an API key is set"),
            None => note!("no API key is set, provide one with \"/key <KEY>\""),
        }
    }

    fn print_history(&self) {
        let conversation = self.session.conversation();

        if conversation.is_empty() {
            note!("the conversation is empty");
        }

        for turn in conversation.turns() {
            println!("{}\n", Rendered::new(turn, "assistant"));
        }
    }
}

pub(crate) async fn chat_cmd(client: &CompletionClient, options: ChatOptions, args: &ChatArgs) {
    let in_terminal = io::stdin().is_terminal();
    let out_terminal = io::stdout().is_terminal();

    // Without an explicit prompt, run interactively only when attached to a terminal.
    let interactive = if args.prompt.is_some() {
        args.interactive
    } else {
        in_terminal && out_terminal
    };

    if args.prompt.is_some() && !in_terminal {
        die!("it appears that an initial prompt is being provided both through standard input and the prompt argument");
    }

    // Obtain the initial prompt, either from standard input or from a positional argument.
    let initial_prompt = if let Some(prompt) = &args.prompt {
        Some(prompt.clone())
    } else if !in_terminal {
        let mut buf = String::new();

        if let Err(err) = io::stdin().read_to_string(&mut buf) {
            die!("failed to read the prompt from standard input: {}", err);
        }

        Some(buf)
    } else {
        None
    };

    let spec = args.model.as_deref().or(options.default_model.as_deref());

    let model = match models::resolve(spec) {
        Ok(model) => model,
        Err(err) => die!("{}, see \"orchat list models\"", err),
    };

    tracing::info!(model = model.id, interactive, "starting chat");

    if interactive {
        chat_interactive(client, options, model, initial_prompt, out_terminal).await;
    } else {
        match initial_prompt {
            Some(prompt) if !prompt.trim().is_empty() => {
                chat_once(client, options.credential, model, prompt).await
            }
            _ => die!("no prompt was provided"),
        }
    }
}

/// A single exchange. The reply goes to standard output; a failure is fatal.
async fn chat_once(
    client: &CompletionClient,
    credential: Option<String>,
    model: &'static Model,
    prompt: String,
) {
    let mut session = Session::new(client);

    match session
        .on_user_submit(prompt, model.id, credential.as_deref())
        .await
    {
        Ok(conversation) => {
            if let Some(reply) = conversation.last() {
                println!("{}", reply.content());
            }
        }
        Err(err) => {
            report_failure(&err, model);

            std::process::exit(crate::utils::errors::DEFAULT_EXIT_CODE);
        }
    }
}

async fn chat_interactive(
    client: &CompletionClient,
    options: ChatOptions,
    model: &'static Model,
    initial_prompt: Option<String>,
    out_terminal: bool,
) {
    println!("{} version {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    if options.credential.is_none() {
        note!(
            "no API key found, set {} or \"api_key\" under [openrouter] in the config, or enter \"/key <KEY>\"",
            API_KEY_ENV_VAR
        );
    }

    let mut repl = match Repl::new(options.editor, options.keybindings) {
        Ok(repl) => repl,
        Err(err) => die!("failed to set up the prompt: {}", err),
    };

    let mut chat = Chat::new(client, model, options.credential, out_terminal);

    let mut pending = initial_prompt.filter(|p| !p.trim().is_empty());

    loop {
        let input = match pending.take() {
            Some(prompt) => {
                println!("{}{}", user_prompt(), prompt);
                Input::Message(prompt)
            }
            None => repl.read(),
        };

        match input {
            Input::Message(text) => chat.exchange(text).await,
            Input::Clear => chat.clear(),
            Input::Model(None) => println!("{} ({})", chat.model.label, chat.model.id),
            Input::Model(Some(spec)) => chat.select_model(&spec),
            Input::Models => print_models(chat.model),
            Input::History => chat.print_history(),
            Input::Key(key) => chat.set_credential(key),
            Input::Exit => break,
        }
    }

    tracing::debug!(
        turns = chat.session.conversation().len(),
        "chat session ended"
    );
}
