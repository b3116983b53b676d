mod chat;
mod cli;
mod color;
mod completion;
mod config;
mod models;
mod session;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use cli::{chat::chat_cmd, chat::ChatOptions, list::list_cmd, ColorMode};
use completion::transport::ReqwestTransport;
use completion::{CompletionClient, DEFAULT_API_BASE};
use tracing_subscriber::EnvFilter;

#[derive(
    Parser, Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "orchat")]
#[command(about = "Chat with OpenRouter-hosted models from the terminal", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[arg(long, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
    /// Read the configuration from this file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log more (repeat for debug output); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat
    Chat(ChatArgs),
    /// List available models
    List(ListArgs),
}

#[derive(Parser, Default)]
pub(crate) struct ChatArgs {
    /// The model id or label to chat with
    #[arg(short, long)]
    model: Option<String>,
    /// Stay in interactive mode after the initial prompt
    #[arg(short, long)]
    interactive: bool,
    /// Specify the initial prompt
    prompt: Option<String>,
}

/// Possible listings
#[derive(Subcommand)]
pub(crate) enum ListObject {
    /// Models that can be selected
    Models,
}

/// Output formats
#[derive(
    Parser, ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// List the specified object
    #[command(subcommand)]
    object: ListObject,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Replies go to stdout, so logs must stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    color::configure_color(ColorMode::resolve_auto(cli.color));

    init_logging(cli.verbose);

    config::load_env_file(None);

    let config = match config::read_config(cli.config) {
        Ok(config) => config,
        Err(err) => die!("{}", err),
    };

    match cli.command {
        Some(Commands::List(args)) => list_cmd(config.openrouter.default_model.as_deref(), &args),
        Some(Commands::Chat(args)) => chat(config, &args).await,
        None => chat(config, &ChatArgs::default()).await,
    }
}

async fn chat(config: config::Config, args: &ChatArgs) {
    let credential = match config.credential() {
        Ok(credential) => credential,
        Err(err) => die!("{}", err),
    };

    let api_base = config
        .openrouter
        .api_base
        .as_deref()
        .unwrap_or(DEFAULT_API_BASE);

    let client = match CompletionClient::new(Arc::new(ReqwestTransport::new()), api_base) {
        Ok(client) => client,
        Err(err) => die!("the API base \"{}\" failed to parse: {}", api_base, err),
    };

    tracing::debug!(endpoint = %client.endpoint(), "completion client ready");

    let options = ChatOptions {
        editor: config.editor,
        keybindings: config.keybindings,
        credential,
        default_model: config.openrouter.default_model,
    };

    chat_cmd(&client, options, args).await;
}
